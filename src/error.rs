//! Error types for the replay engine.

use crate::types::Category;
use thiserror::Error;

/// Main error type for replay operations.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A log line could not be turned into a record. Fatal to the replay.
    #[error("Malformed {category} record at line {line}: {reason}")]
    Decode {
        category: Category,
        line: usize,
        reason: String,
    },

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("{category} stream ended without an end-of-stream marker")]
    StreamAborted { category: Category },

    #[error("Output sink disconnected")]
    SinkDisconnected,

    #[error("Replay cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ReplayError {
    fn from(e: serde_json::Error) -> Self {
        ReplayError::Serialization(e.to_string())
    }
}

/// Result type for replay operations.
pub type Result<T> = std::result::Result<T, ReplayError>;
