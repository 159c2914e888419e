//! Usecase: the room state machine and all validated mutations.
//!
//! Every mutation is a read-modify-write cycle against the store: fetch the
//! current state, transform it, stamp `last_updated_at`, and save with the
//! room TTL. No compare-and-swap guards a room; two simultaneous mutations of
//! the same room resolve last-write-wins in the store.

use std::sync::Arc;

use pulseband_shared::time::Clock;

use crate::{
    config::{RoomOptions, SyncOptions},
    domain::{
        Capabilities, ClientId, MetronomeStatus, Participant, RoomDetails, RoomId, RoomIdFactory,
        RoomState, RoomStateStore, Tempo, TimeSignature, Timestamp,
    },
};

use super::error::CoordinatorError;

/// Request to create a room. All fields optional; missing values fall back
/// to the configured defaults.
#[derive(Debug, Clone, Default)]
pub struct CreateRoomRequest {
    pub tempo_bpm: Option<u32>,
    pub time_signature: Option<String>,
    pub requested_by: Option<String>,
}

/// Participant data supplied on join. `joined_at` is set by the coordinator
/// when absent.
#[derive(Debug, Clone)]
pub struct UpsertParticipant {
    pub client_id: ClientId,
    pub display_name: String,
    pub joined_at: Option<Timestamp>,
    pub capabilities: Capabilities,
}

/// Owns the room state machine. Sits directly on the store.
pub struct RoomCoordinator {
    /// Store (persistence port)
    store: Arc<dyn RoomStateStore>,
    clock: Arc<dyn Clock>,
    room_options: RoomOptions,
    sync_options: SyncOptions,
}

impl RoomCoordinator {
    pub fn new(
        store: Arc<dyn RoomStateStore>,
        clock: Arc<dyn Clock>,
        room_options: RoomOptions,
        sync_options: SyncOptions,
    ) -> Self {
        Self {
            store,
            clock,
            room_options,
            sync_options,
        }
    }

    /// Create a room with a fresh unique id.
    ///
    /// Tempo is defaulted then clamped into the playable range, never
    /// rejected. A supplied but malformed time signature is silently replaced
    /// by the configured default (contrast with [`Self::change_time_signature`],
    /// which rejects — both behaviors are deliberate).
    pub async fn create_room(
        &self,
        request: CreateRoomRequest,
    ) -> Result<RoomDetails, CoordinatorError> {
        let now = Timestamp::new(self.clock.now_utc_millis());
        let room_id = RoomIdFactory::generate();

        let tempo = Tempo::clamped(
            request
                .tempo_bpm
                .unwrap_or(self.room_options.default_tempo_bpm),
        );

        let time_signature = match request.time_signature.as_deref() {
            None => self.room_options.default_time_signature.clone(),
            Some(raw) if raw.trim().is_empty() => {
                self.room_options.default_time_signature.clone()
            }
            Some(raw) => match TimeSignature::parse(raw) {
                Ok(signature) => signature,
                Err(_) => {
                    tracing::warn!(
                        "Invalid time signature '{}' provided, falling back to default '{}'",
                        raw,
                        self.room_options.default_time_signature
                    );
                    self.room_options.default_time_signature.clone()
                }
            },
        };

        let state = RoomState {
            room_id,
            tempo_bpm: tempo,
            time_signature,
            status: MetronomeStatus::Stopped,
            created_at: now,
            last_updated_at: now,
            scheduled_start_at: None,
            last_server_beat_timestamp: None,
            created_by: request.requested_by,
        };

        tracing::info!(
            "Saving room {} with tempo {} signature {}",
            state.room_id,
            state.tempo_bpm.bpm(),
            state.time_signature
        );
        self.store.save_room(&state, self.room_options.ttl).await?;

        Ok(RoomDetails {
            state,
            participants: Vec::new(),
        })
    }

    /// Fetch a room with its current participant set.
    pub async fn get_room(&self, room_id: &RoomId) -> Result<RoomDetails, CoordinatorError> {
        let state = self
            .store
            .get_room(room_id)
            .await?
            .ok_or(CoordinatorError::RoomNotFound)?;
        let participants = self.store.get_participants(room_id).await?;
        Ok(RoomDetails {
            state,
            participants,
        })
    }

    /// Schedule a metronome start: status `Running`, start instant at
    /// now + the configured lead time.
    pub async fn schedule_start(&self, room_id: &RoomId) -> Result<RoomState, CoordinatorError> {
        let schedule_at =
            Timestamp::new(self.clock.now_utc_millis() + i64::from(self.sync_options.lead_time_ms));
        self.update_room(room_id, |state| RoomState {
            status: MetronomeStatus::Running,
            scheduled_start_at: Some(schedule_at),
            last_server_beat_timestamp: Some(schedule_at),
            ..state
        })
        .await
    }

    /// Stop the metronome: status `Stopped`, cleared start instant.
    pub async fn stop(&self, room_id: &RoomId) -> Result<RoomState, CoordinatorError> {
        self.update_room(room_id, |state| RoomState {
            status: MetronomeStatus::Stopped,
            scheduled_start_at: None,
            ..state
        })
        .await
    }

    /// Change tempo, clamping into the playable range — never rejects on
    /// range.
    pub async fn change_tempo(
        &self,
        room_id: &RoomId,
        tempo_bpm: u32,
    ) -> Result<RoomState, CoordinatorError> {
        let tempo = Tempo::clamped(tempo_bpm);
        self.update_room(room_id, |state| RoomState {
            tempo_bpm: tempo,
            ..state
        })
        .await
    }

    /// Change time signature. Rejects malformed input with
    /// `InvalidTimeSignature` and leaves room state untouched.
    pub async fn change_time_signature(
        &self,
        room_id: &RoomId,
        time_signature: &str,
    ) -> Result<RoomState, CoordinatorError> {
        let signature = TimeSignature::parse(time_signature)
            .map_err(|_| CoordinatorError::InvalidTimeSignature)?;
        self.update_room(room_id, |state| RoomState {
            time_signature: signature,
            ..state
        })
        .await
    }

    /// Insert or update a participant.
    ///
    /// Capacity is enforced only for new client ids: re-joining with an
    /// existing id never counts against it. A blank display name becomes
    /// "Guest".
    pub async fn upsert_participant(
        &self,
        room_id: &RoomId,
        request: UpsertParticipant,
    ) -> Result<Participant, CoordinatorError> {
        let room = self
            .store
            .get_room(room_id)
            .await?
            .ok_or(CoordinatorError::RoomNotFound)?;

        let participants = self.store.get_participants(room_id).await?;
        let is_new = participants
            .iter()
            .all(|p| p.client_id != request.client_id);
        if is_new && participants.len() >= self.room_options.max_participants {
            return Err(CoordinatorError::RoomFull);
        }

        let display_name = if request.display_name.trim().is_empty() {
            "Guest".to_string()
        } else {
            request.display_name
        };

        let participant = Participant {
            room_id: room.room_id,
            client_id: request.client_id,
            display_name,
            joined_at: request
                .joined_at
                .unwrap_or_else(|| Timestamp::new(self.clock.now_utc_millis())),
            capabilities: request.capabilities,
        };

        self.store
            .upsert_participant(&participant, self.room_options.ttl)
            .await?;
        Ok(participant)
    }

    /// Remove a participant. Idempotent.
    pub async fn remove_participant(
        &self,
        room_id: &RoomId,
        client_id: &ClientId,
    ) -> Result<(), CoordinatorError> {
        self.store.remove_participant(room_id, client_id).await?;
        Ok(())
    }

    /// Assign an instrument to a participant and update their display name.
    pub async fn update_instrument(
        &self,
        room_id: &RoomId,
        client_id: &ClientId,
        instrument_id: &str,
        display_name: &str,
    ) -> Result<Participant, CoordinatorError> {
        let participant = self
            .store
            .get_participant(room_id, client_id)
            .await?
            .ok_or(CoordinatorError::ParticipantNotFound)?;

        let updated = Participant {
            display_name: display_name.to_string(),
            capabilities: Capabilities {
                instrument: Some(instrument_id.to_string()),
            },
            ..participant
        };

        self.store
            .upsert_participant(&updated, self.room_options.ttl)
            .await?;
        Ok(updated)
    }

    /// Store the latest clock-offset sample for a client.
    pub async fn record_clock_offset(
        &self,
        room_id: &RoomId,
        client_id: &ClientId,
        offset_ms: f64,
    ) -> Result<(), CoordinatorError> {
        self.store
            .save_clock_offset(room_id, client_id, offset_ms, self.room_options.ttl)
            .await?;
        Ok(())
    }

    /// Delete a room with its participant set. Returns `None` without error
    /// when the room was already absent — idempotent.
    pub async fn close_room(
        &self,
        room_id: &RoomId,
    ) -> Result<Option<RoomState>, CoordinatorError> {
        let state = match self.store.get_room(room_id).await? {
            Some(state) => state,
            None => return Ok(None),
        };
        self.store.delete_room(room_id).await?;
        Ok(Some(state))
    }

    /// Shared read-modify-write cycle: fetch, transform, stamp
    /// `last_updated_at`, save with TTL.
    async fn update_room<F>(
        &self,
        room_id: &RoomId,
        update: F,
    ) -> Result<RoomState, CoordinatorError>
    where
        F: FnOnce(RoomState) -> RoomState,
    {
        let current = self
            .store
            .get_room(room_id)
            .await?
            .ok_or(CoordinatorError::RoomNotFound)?;

        let updated = RoomState {
            last_updated_at: Timestamp::new(self.clock.now_utc_millis()),
            ..update(current)
        };

        self.store
            .save_room(&updated, self.room_options.ttl)
            .await?;
        Ok(updated)
    }
}
