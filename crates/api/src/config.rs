use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    /// Parent access token configuration
    pub jwt: JwtAuthConfig,
    /// Outbound push function configuration
    #[serde(default)]
    pub push: PushConfig,
    /// Background job intervals
    #[serde(default)]
    pub jobs: JobsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn to_pool_config(&self) -> persistence::db::DatabaseConfig {
        persistence::db::DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_secs: self.connect_timeout_secs,
            idle_timeout_secs: self.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Link attempts allowed per client IP per minute. 0 disables the limit.
    #[serde(default = "default_pairing_link_rate_limit")]
    pub pairing_link_rate_limit_per_minute: u32,

    /// Send Strict-Transport-Security. Enable only behind TLS termination.
    #[serde(default)]
    pub hsts_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtAuthConfig {
    /// RSA private key in PEM format for signing tokens
    pub private_key: String,

    /// RSA public key in PEM format for verifying tokens
    pub public_key: String,

    /// Access token expiration in seconds (default: 30 days)
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: i64,

    /// Leeway in seconds for clock skew tolerance
    #[serde(default = "default_jwt_leeway")]
    pub leeway_secs: u64,
}

/// Push notification dispatch through a serverless function.
#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// When false, notifications are only logged
    #[serde(default)]
    pub enabled: bool,

    /// HTTPS endpoint of the push function
    #[serde(default)]
    pub function_url: String,

    /// Bearer key sent to the push function
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_push_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_push_max_retries")]
    pub max_retries: u32,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            function_url: String::new(),
            api_key: String::new(),
            timeout_ms: default_push_timeout_ms(),
            max_retries: default_push_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_pairing_cleanup_interval")]
    pub pairing_cleanup_interval_secs: u64,

    /// Linked pairing codes are kept this many days for audit
    #[serde(default = "default_linked_code_retention_days")]
    pub linked_code_retention_days: i32,

    #[serde(default = "default_pool_metrics_interval")]
    pub pool_metrics_interval_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            pairing_cleanup_interval_secs: default_pairing_cleanup_interval(),
            linked_code_retention_days: default_linked_code_retention_days(),
            pool_metrics_interval_secs: default_pool_metrics_interval(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_body_size() -> usize {
    1_048_576
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_pairing_link_rate_limit() -> u32 {
    10
}
fn default_access_token_expiry() -> i64 {
    2_592_000
}
fn default_jwt_leeway() -> u64 {
    30
}
fn default_push_timeout_ms() -> u64 {
    5000
}
/// Upper bound for `push.max_retries`; the backoff doubles per retry.
pub const MAX_PUSH_RETRIES: u32 = 10;

fn default_push_max_retries() -> u32 {
    2
}
fn default_pairing_cleanup_interval() -> u64 {
    600
}
fn default_linked_code_retention_days() -> i32 {
    30
}
fn default_pool_metrics_interval() -> u64 {
    15
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml
    /// 2. config/local.toml (optional, not in git)
    /// 3. Environment variables with FG__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("FG").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides, without config files.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30
            max_body_size = 1048576

            [database]
            url = ""
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []
            pairing_link_rate_limit_per_minute = 10
            hsts_enabled = false

            [jwt]
            private_key = "test-private-key"
            public_key = "test-public-key"
            access_token_expiry_secs = 2592000
            leeway_secs = 30

            [push]
            enabled = false

            [jobs]
            pairing_cleanup_interval_secs = 600
            linked_code_retention_days = 30
            pool_metrics_interval_secs = 15
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "FG__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.jwt.private_key.is_empty() || self.jwt.public_key.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "FG__JWT__PRIVATE_KEY and FG__JWT__PUBLIC_KEY must be set".to_string(),
            ));
        }

        if self.push.enabled && self.push.function_url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "push.function_url is required when push is enabled".to_string(),
            ));
        }

        if self.push.max_retries > MAX_PUSH_RETRIES {
            return Err(ConfigValidationError::InvalidValue(format!(
                "push.max_retries cannot exceed {}",
                MAX_PUSH_RETRIES
            )));
        }

        if self.jobs.linked_code_retention_days < 1 {
            return Err(ConfigValidationError::InvalidValue(
                "linked_code_retention_days must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
