//! Error taxonomy of the coordinator operations.
//!
//! All failures are synchronous rejections surfaced verbatim to the protocol
//! layer; none are retried internally, and a failed operation on one room
//! never affects any other room or connection.

use thiserror::Error;

use crate::domain::StoreError;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Mutation or query target missing (or expired).
    #[error("room not found")]
    RoomNotFound,

    /// Capacity exceeded on a new-member join.
    #[error("room is full")]
    RoomFull,

    /// Instrument update for an unknown client.
    #[error("participant not found")]
    ParticipantNotFound,

    /// Explicit time-signature change request malformed. Creation-time
    /// fallback never produces this; only `change_time_signature` does.
    #[error("invalid time signature format")]
    InvalidTimeSignature,

    #[error(transparent)]
    Store(#[from] StoreError),
}
