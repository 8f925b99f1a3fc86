//! Transport-level error types.

use thiserror::Error;

use crate::request::JsonRpcError;
use crate::types::ParseHexError;

/// Errors that can occur during an RPC transport operation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, timeout, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON-RPC protocol-level error returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// Response could not be deserialized.
    #[error("deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// A hex-encoded integer in the response could not be decoded.
    #[error(transparent)]
    InvalidHex(#[from] ParseHexError),
}
