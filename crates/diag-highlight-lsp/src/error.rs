use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors produced by the language client.
pub enum ClientError {
    #[error("I/O error: {0}")]
    /// The connection to the server failed; the transport error is passed through unchanged.
    Io(#[from] io::Error),

    #[error("language client '{0}' is already running")]
    /// `start` was called on a running client.
    AlreadyRunning(String),

    #[error("language client '{0}' is not running")]
    /// An operation needing a live connection was called on a stopped client.
    NotRunning(String),

    #[error("invalid watch pattern '{pattern}': {message}")]
    /// A file-event glob failed to compile.
    InvalidWatchPattern {
        /// The glob pattern.
        pattern: String,
        /// The compiler error message.
        message: String,
    },

    #[error(transparent)]
    /// A command could not be registered or dispatched.
    Command(#[from] diag_highlight::CommandError),
}

#[derive(Debug, Error)]
/// Errors produced while loading configuration.
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    /// The config file could not be read.
    Read {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    #[error("TOML parse error: {0}")]
    /// The config file is not valid TOML for [`crate::config::HighlightConfig`].
    Toml(#[from] toml::de::Error),
}
