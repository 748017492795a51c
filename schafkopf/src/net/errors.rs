//! Protocol error types for JSON message encoding and decoding.

use thiserror::Error;

/// Errors that can occur while encoding or decoding protocol messages
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Failed to encode an outbound message
    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// Failed to decode an inbound frame
    #[error("Failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
