//! Error types shared by the device providers.

use thiserror::Error;

/// Failure reading state from the device.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    ExitStatus {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("`{command}` timed out")]
    Timeout { command: String },

    #[error("Unparseable output: {0}")]
    Parse(String),
}
