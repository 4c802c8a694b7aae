use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub loops: LoopConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout_ms")]
    pub timeout_ms: u64,
}

/// Timing of the two monitoring loops.
#[derive(Debug, Clone, Deserialize)]
pub struct LoopConfig {
    /// Foreground check period
    #[serde(default = "default_fast_interval_secs")]
    pub fast_interval_secs: u64,

    /// Trailing window searched for the most recent foreground app
    #[serde(default = "default_foreground_window_secs")]
    pub foreground_window_secs: u64,

    /// Usage aggregation and upload period
    #[serde(default = "default_slow_interval_secs")]
    pub slow_interval_secs: u64,

    /// Trailing window aggregated by the slow loop
    #[serde(default = "default_usage_lookback_hours")]
    pub usage_lookback_hours: u64,

    /// Forget the last-seen app every N fast ticks so parent changes apply
    /// to an app that stays in the foreground. 0 disables.
    #[serde(default = "default_reevaluate_every_ticks")]
    pub reevaluate_every_ticks: u64,
}

/// How the monitor talks to the device.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_binding_path")]
    pub binding_path: PathBuf,

    /// `usage_stats` or `focused_window`
    #[serde(default)]
    pub foreground_strategy: ForegroundStrategy,

    #[serde(default = "default_usage_stats_command")]
    pub usage_stats_command: String,

    #[serde(default = "default_focused_window_command")]
    pub focused_window_command: String,

    /// Launches the blocking screen. `{package}` and `{reason}` are
    /// substituted. When unset the block is only logged.
    #[serde(default)]
    pub block_screen_command: Option<String>,

    /// Prints the label of an installed app. `{package}` is substituted
    /// and an `application-label:'...'` line is read from the output. When
    /// unset, usage and block attempts are reported without app names.
    #[serde(default = "default_app_label_command")]
    pub app_label_command: Option<String>,

    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForegroundStrategy {
    #[default]
    UsageStats,
    FocusedWindow,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_fast_interval_secs() -> u64 {
    3
}

fn default_foreground_window_secs() -> u64 {
    10
}

fn default_slow_interval_secs() -> u64 {
    300
}

fn default_usage_lookback_hours() -> u64 {
    24
}

fn default_reevaluate_every_ticks() -> u64 {
    20
}

fn default_binding_path() -> PathBuf {
    PathBuf::from("/data/local/tmp/family-guard/binding.json")
}

fn default_usage_stats_command() -> String {
    "dumpsys usagestats".to_string()
}

fn default_focused_window_command() -> String {
    "dumpsys window windows".to_string()
}

fn default_app_label_command() -> Option<String> {
    Some(r#"aapt dump badging "$(pm path {package} | head -n 1 | cut -d: -f2)""#.to_string())
}

fn default_command_timeout_ms() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            fast_interval_secs: default_fast_interval_secs(),
            foreground_window_secs: default_foreground_window_secs(),
            slow_interval_secs: default_slow_interval_secs(),
            usage_lookback_hours: default_usage_lookback_hours(),
            reevaluate_every_ticks: default_reevaluate_every_ticks(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            binding_path: default_binding_path(),
            foreground_strategy: ForegroundStrategy::default(),
            usage_stats_command: default_usage_stats_command(),
            focused_window_command: default_focused_window_command(),
            block_screen_command: None,
            app_label_command: default_app_label_command(),
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoopConfig {
    pub fn fast_interval(&self) -> Duration {
        Duration::from_secs(self.fast_interval_secs)
    }

    pub fn slow_interval(&self) -> Duration {
        Duration::from_secs(self.slow_interval_secs)
    }

    pub fn foreground_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.foreground_window_secs as i64)
    }

    pub fn usage_lookback(&self) -> chrono::Duration {
        chrono::Duration::hours(self.usage_lookback_hours as i64)
    }
}

/// One week of history; older usage is never re-uploaded.
pub const MAX_USAGE_LOOKBACK_HOURS: u64 = 168;

#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl MonitorConfig {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. `path` (optional, defaults to config/monitor.toml)
    /// 2. Environment variables with FGM__ prefix
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let file = path.unwrap_or("config/monitor");
        let config = config::Config::builder()
            .add_source(config::File::with_name(file).required(path.is_some()))
            .add_source(config::Environment::with_prefix("FGM").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.loops.fast_interval_secs == 0 || self.loops.slow_interval_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "loop intervals must be at least one second".to_string(),
            ));
        }

        if self.loops.foreground_window_secs < self.loops.fast_interval_secs {
            return Err(ConfigValidationError::InvalidValue(
                "foreground_window_secs must cover at least one fast tick".to_string(),
            ));
        }

        if self.loops.usage_lookback_hours == 0
            || self.loops.usage_lookback_hours > MAX_USAGE_LOOKBACK_HOURS
        {
            return Err(ConfigValidationError::InvalidValue(format!(
                "usage_lookback_hours must be between 1 and {}",
                MAX_USAGE_LOOKBACK_HOURS
            )));
        }

        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(ConfigValidationError::InvalidValue(format!(
                "api.base_url must be an http(s) URL, got {}",
                self.api.base_url
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> MonitorConfig {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = from_toml("");
        assert_eq!(config.loops.fast_interval_secs, 3);
        assert_eq!(config.loops.foreground_window_secs, 10);
        assert_eq!(config.loops.slow_interval_secs, 300);
        assert_eq!(config.loops.usage_lookback_hours, 24);
        assert_eq!(config.device.foreground_strategy, ForegroundStrategy::UsageStats);
        assert!(config.device.block_screen_command.is_none());
        assert!(config.device.app_label_command.is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_strategy_and_overrides() {
        let config = from_toml(
            r#"
            [loops]
            fast_interval_secs = 5
            foreground_window_secs = 15

            [device]
            foreground_strategy = "focused_window"
            block_screen_command = "am start -n com.familyguard/.Block --es pkg {package}"
            "#,
        );
        assert_eq!(config.loops.fast_interval(), Duration::from_secs(5));
        assert_eq!(config.loops.foreground_window(), chrono::Duration::seconds(15));
        assert_eq!(
            config.device.foreground_strategy,
            ForegroundStrategy::FocusedWindow
        );
        assert!(config.device.block_screen_command.is_some());
    }

    #[test]
    fn test_window_shorter_than_tick_rejected() {
        let mut config = from_toml("");
        config.loops.foreground_window_secs = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_url_must_be_http() {
        let mut config = from_toml("");
        config.api.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_usage_lookback_bounded() {
        let mut config = from_toml("");
        config.loops.usage_lookback_hours = u64::MAX;
        assert!(config.validate().is_err());

        config.loops.usage_lookback_hours = MAX_USAGE_LOOKBACK_HOURS + 1;
        assert!(config.validate().is_err());

        config.loops.usage_lookback_hours = MAX_USAGE_LOOKBACK_HOURS;
        assert!(config.validate().is_ok());
        assert_eq!(config.loops.usage_lookback(), chrono::Duration::days(7));
    }
}
