//! Usecase: synchronization payload generation.
//!
//! A payload is produced fresh on every start/stop/tempo/signature broadcast
//! and is never persisted.

use std::sync::Arc;

use pulseband_shared::time::Clock;

use crate::{
    config::SyncOptions,
    domain::{RoomState, SyncPayload, Timestamp},
};

/// Builds [`SyncPayload`]s from authoritative room state.
pub struct SyncPayloadFactory {
    clock: Arc<dyn Clock>,
    options: SyncOptions,
}

impl SyncPayloadFactory {
    pub fn new(clock: Arc<dyn Clock>, options: SyncOptions) -> Self {
        Self { clock, options }
    }

    /// Create a payload for the given room state.
    ///
    /// `start_at_utc` is the scheduled start when one exists; otherwise the
    /// payload schedules one lead time ahead of now so late receivers still
    /// get a future beat 1.
    pub fn create(&self, state: &RoomState) -> SyncPayload {
        let now = Timestamp::new(self.clock.now_utc_millis());
        let start_at = state.scheduled_start_at.unwrap_or_else(|| {
            Timestamp::new(now.value() + i64::from(self.options.lead_time_ms))
        });

        SyncPayload {
            room_id: state.room_id.clone(),
            tempo_bpm: state.tempo_bpm,
            beat_interval_ms: state.beat_interval_ms(),
            server_timestamp_utc: now,
            start_at_utc: start_at,
            time_signature: state.time_signature.clone(),
        }
    }
}
