//! Human-readable app names reported alongside package names.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

use crate::error::ProviderError;
use crate::shell::{render_template, run_shell};

const MAX_LABEL_CHARS: usize = 255;

#[async_trait]
pub trait AppLabelSource: Send + Sync {
    /// Returns the display name of an installed app, if one can be found.
    async fn label(&self, package_name: &str) -> Result<Option<String>, ProviderError>;
}

/// Reads the label from the output of a configured shell command.
pub struct CommandAppLabels {
    template: String,
    timeout: Duration,
}

impl CommandAppLabels {
    pub fn new(template: impl Into<String>, timeout: Duration) -> Self {
        Self {
            template: template.into(),
            timeout,
        }
    }
}

#[async_trait]
impl AppLabelSource for CommandAppLabels {
    async fn label(&self, package_name: &str) -> Result<Option<String>, ProviderError> {
        let command = render_template(&self.template, &[("package", package_name)]);
        let output = run_shell(&command, self.timeout).await?;
        Ok(parse_application_label(&output))
    }
}

/// Reports no labels. Used when no command is configured.
#[derive(Debug, Default)]
pub struct NoAppLabels;

#[async_trait]
impl AppLabelSource for NoAppLabels {
    async fn label(&self, _package_name: &str) -> Result<Option<String>, ProviderError> {
        Ok(None)
    }
}

/// Looks each package up once per run. Failed lookups are remembered as
/// unknown so a missing tool is not re-run on every tick.
pub struct AppLabels {
    source: Arc<dyn AppLabelSource>,
    cache: Mutex<HashMap<String, Option<String>>>,
}

impl AppLabels {
    pub fn new(source: Arc<dyn AppLabelSource>) -> Self {
        Self {
            source,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(NoAppLabels))
    }

    pub async fn get(&self, package_name: &str) -> Option<String> {
        if let Some(cached) = self.cached(package_name) {
            return cached;
        }

        let label = match self.source.label(package_name).await {
            Ok(label) => label,
            Err(e) => {
                debug!(package_name, error = %e, "App label lookup failed");
                None
            }
        };

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(package_name.to_string(), label.clone());
        }
        label
    }

    fn cached(&self, package_name: &str) -> Option<Option<String>> {
        self.cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(package_name).cloned())
    }
}

/// Extracts the value of the first `application-label:'...'` line.
pub fn parse_application_label(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let value = line.trim().strip_prefix("application-label:")?;
        let value = value.trim().trim_matches('\'').trim();
        if value.is_empty() {
            return None;
        }
        Some(value.chars().take(MAX_LABEL_CHARS).collect())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl AppLabelSource for CountingSource {
        async fn label(&self, package_name: &str) -> Result<Option<String>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ProviderError::Timeout {
                    command: "aapt".into(),
                });
            }
            Ok(Some(format!("Label of {}", package_name)))
        }
    }

    #[test]
    fn test_parse_application_label() {
        let output = "package: name='com.example.game' versionCode='3'\n\
                      application-label:'Space Game'\n\
                      application-label-de:'Weltraumspiel'\n";
        assert_eq!(parse_application_label(output), Some("Space Game".into()));
    }

    #[test]
    fn test_parse_application_label_missing_or_empty() {
        assert_eq!(parse_application_label("package: name='x'\n"), None);
        assert_eq!(parse_application_label("application-label:''\n"), None);
    }

    #[test]
    fn test_parse_application_label_truncates() {
        let output = format!("application-label:'{}'", "x".repeat(300));
        assert_eq!(
            parse_application_label(&output).map(|l| l.chars().count()),
            Some(MAX_LABEL_CHARS)
        );
    }

    #[tokio::test]
    async fn test_labels_are_looked_up_once() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let labels = AppLabels::new(source.clone());

        assert_eq!(
            labels.get("com.example.game").await.as_deref(),
            Some("Label of com.example.game")
        );
        assert_eq!(
            labels.get("com.example.game").await.as_deref(),
            Some("Label of com.example.game")
        );
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_lookup_is_cached_as_unknown() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let labels = AppLabels::new(source.clone());

        assert_eq!(labels.get("com.example.game").await, None);
        assert_eq!(labels.get("com.example.game").await, None);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_command_labels_substitute_package() {
        let labels = CommandAppLabels::new(
            "echo \"application-label:{package}\"",
            Duration::from_secs(5),
        );
        assert_eq!(
            labels.label("com.example.game").await.unwrap(),
            Some("com.example.game".into())
        );
    }

    #[tokio::test]
    async fn test_disabled_labels_report_nothing() {
        assert_eq!(AppLabels::disabled().get("com.example.game").await, None);
    }
}
