//! Error types for the watcher pipeline.

use thiserror::Error;

/// Errors that can occur while building or running the watcher.
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("RPC error: {0}")]
    Rpc(#[from] chainwatch_rpc::TransportError),

    #[error("invalid address record at index {index}: {value:?}")]
    InvalidAddress { index: usize, value: String },

    #[error("empty address at index {index}")]
    EmptyAddress { index: usize },

    #[error("checkpoint: {0}")]
    Checkpoint(String),

    #[error("publish: {0}")]
    Publish(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
