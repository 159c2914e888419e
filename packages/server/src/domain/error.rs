//! Error types at the domain ports.

use thiserror::Error;

/// Failures of the room state store.
///
/// Loss of the underlying store is not specially handled by the core; it
/// propagates to the caller as a generic failure and is never retried.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store serialization failed: {0}")]
    Serialization(String),

    #[error("store backend unavailable: {0}")]
    Unavailable(String),
}

/// Failures when pushing a message to a single connection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PushError {
    #[error("connection '{0}' not registered")]
    ConnectionNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),
}
