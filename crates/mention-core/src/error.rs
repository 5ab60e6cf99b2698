//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Trigger phrase is empty
    #[error("Trigger phrase must not be empty")]
    EmptyTrigger,

    /// Trigger phrase contains characters that can never start a mention
    #[error("Invalid trigger phrase {0:?}: must not contain whitespace or quotes")]
    InvalidTrigger(String),

    /// Primary mention name cannot be written as a mention token
    #[error("Invalid primary mention name {0:?}")]
    InvalidPrimaryMention(String),

    /// No document extensions configured
    #[error("At least one document extension is required")]
    NoExtensions,

    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be parsed
    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}
