//! Room state store port.
//!
//! The usecase layer depends on this trait; the concrete implementation
//! lives in the infrastructure layer (dependency inversion). The contract
//! mirrors a key-value store with TTL: room state keyed by room id, the
//! participant collection keyed by room id, and one clock-offset sample keyed
//! by (room id, client id). Saving the room refreshes the participant
//! collection's TTL as well; participant and offset writes refresh their own
//! keys.

use std::time::Duration;

use async_trait::async_trait;

use super::{ClientId, Participant, RoomId, RoomState, StoreError};

/// Persistence port for room state, participants, and clock-offset samples.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomStateStore: Send + Sync {
    /// Persist room state with the given TTL, refreshing the TTL of the
    /// room's participant collection too.
    async fn save_room(&self, state: &RoomState, ttl: Duration) -> Result<(), StoreError>;

    /// Fetch room state; `None` when absent or expired.
    async fn get_room(&self, room_id: &RoomId) -> Result<Option<RoomState>, StoreError>;

    /// Delete room state, its participant collection, and its clock-offset
    /// samples.
    async fn delete_room(&self, room_id: &RoomId) -> Result<(), StoreError>;

    /// All current participants of a room. Empty when the room is absent.
    async fn get_participants(&self, room_id: &RoomId) -> Result<Vec<Participant>, StoreError>;

    /// A single participant; `None` when absent.
    async fn get_participant(
        &self,
        room_id: &RoomId,
        client_id: &ClientId,
    ) -> Result<Option<Participant>, StoreError>;

    /// Insert or replace a participant, refreshing the collection TTL.
    async fn upsert_participant(
        &self,
        participant: &Participant,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Remove a participant. Removing an absent participant is a no-op.
    async fn remove_participant(
        &self,
        room_id: &RoomId,
        client_id: &ClientId,
    ) -> Result<(), StoreError>;

    /// Store the latest clock-offset sample for a client with TTL.
    async fn save_clock_offset(
        &self,
        room_id: &RoomId,
        client_id: &ClientId,
        offset_ms: f64,
        ttl: Duration,
    ) -> Result<(), StoreError>;
}
