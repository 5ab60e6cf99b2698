//! Indexer error types.

use mention_core::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during indexing operations.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Index store is unavailable or its persisted data is unusable
    #[error("Storage error: {0}")]
    Storage(String),

    /// File watcher error
    #[error("Watcher error: {0}")]
    Watcher(String),

    /// Path not found
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// A single document could not be read from the document store
    #[error("Failed to read document {path}: {message}")]
    Document { path: String, message: String },

    /// Rejected configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The engine has been shut down
    #[error("Index engine is shut down")]
    ShutDown,
}

impl IndexerError {
    /// Whether this error is scoped to one document rather than the whole store.
    pub fn is_document_error(&self) -> bool {
        matches!(self, IndexerError::Document { .. })
    }
}

impl From<serde_json::Error> for IndexerError {
    fn from(e: serde_json::Error) -> Self {
        IndexerError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for IndexerError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        IndexerError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for IndexerError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        IndexerError::Serialization(e.to_string())
    }
}
