//! Error types for the metronome client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server rejected the join (room missing, full, or bad client id)
    #[error("Join rejected by server: {0}")]
    JoinRejected(String),

    /// HTTP room API error
    #[error("Room API error: {0}")]
    ApiError(String),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),
}
