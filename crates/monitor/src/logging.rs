//! Subscriber setup for the monitor binary.
//!
//! Logs go to stderr so subcommands can print results on stdout.

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

use crate::config::LoggingConfig;

/// `RUST_LOG` wins over the configured level; `verbose` forces debug.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<(), TryInitError> {
    let env_filter = if verbose {
        EnvFilter::new("family_guard_monitor=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
    };

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init(),
        "pretty" => subscriber
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
        _ => subscriber
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init(),
    }
}
