//! Blocking screen shown over a disallowed app.

use async_trait::async_trait;
use domain::models::BlockReason;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::ProviderError;
use crate::shell::{render_template, run_shell};

#[async_trait]
pub trait BlockScreen: Send + Sync {
    async fn show(&self, package_name: &str, reason: &BlockReason) -> Result<(), ProviderError>;
}

/// Launches the blocking screen with a configured shell command.
pub struct CommandBlockScreen {
    template: String,
    timeout: Duration,
}

impl CommandBlockScreen {
    pub fn new(template: impl Into<String>, timeout: Duration) -> Self {
        Self {
            template: template.into(),
            timeout,
        }
    }

    pub fn command_for(&self, package_name: &str, reason: &BlockReason) -> String {
        render_template(
            &self.template,
            &[("package", package_name), ("reason", reason.label())],
        )
    }
}

#[async_trait]
impl BlockScreen for CommandBlockScreen {
    async fn show(&self, package_name: &str, reason: &BlockReason) -> Result<(), ProviderError> {
        let command = self.command_for(package_name, reason);
        run_shell(&command, self.timeout).await?;
        info!(package_name, reason = reason.label(), "Block screen launched");
        Ok(())
    }
}

/// Logs instead of launching anything. Used when no command is configured.
#[derive(Debug, Default)]
pub struct LoggingBlockScreen;

#[async_trait]
impl BlockScreen for LoggingBlockScreen {
    async fn show(&self, package_name: &str, reason: &BlockReason) -> Result<(), ProviderError> {
        warn!(package_name, reason = %reason, "App blocked (no block screen command configured)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_substitutes_package_and_reason() {
        let screen = CommandBlockScreen::new(
            "am start -n com.familyguard/.BlockActivity --es package {package} --es reason {reason}",
            Duration::from_secs(1),
        );
        let cmd = screen.command_for(
            "com.example.game",
            &BlockReason::Schedule {
                rule_name: "Bedtime".into(),
            },
        );
        assert_eq!(
            cmd,
            "am start -n com.familyguard/.BlockActivity --es package 'com.example.game' --es reason 'schedule'"
        );
    }

    #[tokio::test]
    async fn test_failing_command_is_reported() {
        let screen = CommandBlockScreen::new("exit 1", Duration::from_secs(5));
        let result = screen.show("com.example.game", &BlockReason::AdminBlock).await;
        assert!(matches!(result, Err(ProviderError::ExitStatus { .. })));
    }

    #[tokio::test]
    async fn test_logging_screen_never_fails() {
        assert!(LoggingBlockScreen
            .show("com.example.game", &BlockReason::AdminBlock)
            .await
            .is_ok());
    }
}
