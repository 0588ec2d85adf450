//! Runtime error types.

use std::path::PathBuf;

use mapstyle_model::ModelError;
use thiserror::Error;

/// Error raised by sessions, the renderer channel, or configuration loading.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The renderer did not answer in time.
    #[error("Renderer did not reply to request {request_id} within {timeout_ms} ms")]
    Timeout { request_id: u64, timeout_ms: u64 },

    /// The renderer side of the channel went away.
    #[error("Renderer channel closed")]
    ChannelClosed,

    /// The renderer answered with an error.
    #[error("Renderer rejected request {request_id}: {message}")]
    Renderer { request_id: u64, message: String },

    /// The renderer answered with the wrong kind of reply.
    #[error("Unexpected reply to renderer request {request_id}")]
    UnexpectedReply { request_id: u64 },

    /// The session task for a dataset has stopped.
    #[error("Session for dataset {dataset_id} has stopped")]
    SessionClosed { dataset_id: String },

    /// Metadata could not be fetched.
    #[error("Failed to fetch metadata for dataset {dataset_id}: {message}")]
    Metadata { dataset_id: String, message: String },

    /// File I/O error.
    #[error("Failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("Invalid configuration in {path}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl RuntimeError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Metadata { .. })
    }
}

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
