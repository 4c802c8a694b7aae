//! Runs device shell commands with a timeout.

use std::time::Duration;
use tokio::process::Command;

use crate::error::ProviderError;

/// Runs `command` through `sh -c` and returns its stdout.
pub async fn run_shell(command: &str, timeout: Duration) -> Result<String, ProviderError> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(timeout, output)
        .await
        .map_err(|_| ProviderError::Timeout {
            command: command.to_string(),
        })?
        .map_err(|source| ProviderError::Spawn {
            command: command.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(ProviderError::ExitStatus {
            command: command.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Substitutes `{name}` placeholders. Values are single-quoted for the shell.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{}}}", name), &shell_quote(value))
    })
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_shell_captures_stdout() {
        let out = run_shell("echo hello", Duration::from_secs(5)).await.unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_shell_reports_exit_status() {
        let err = run_shell("echo oops >&2; exit 3", Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            ProviderError::ExitStatus { stderr, .. } => assert_eq!(stderr, "oops"),
            other => panic!("Expected ExitStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_shell_times_out() {
        let err = run_shell("sleep 5", Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { .. }));
    }

    #[test]
    fn test_render_template_quotes_values() {
        let cmd = render_template(
            "am start --es pkg {package} --es why {reason}",
            &[("package", "com.game"), ("reason", "it's late")],
        );
        assert_eq!(cmd, r"am start --es pkg 'com.game' --es why 'it'\''s late'");
    }
}
