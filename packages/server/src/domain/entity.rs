//! Domain entities: room state, participants, and the transient
//! synchronization payloads pushed to clients.

use serde::{Deserialize, Serialize};

use super::value_object::{ClientId, RoomId, Tempo, TimeSignature, Timestamp};

/// Metronome run status of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetronomeStatus {
    Stopped,
    Running,
}

/// Authoritative room state.
///
/// Invariant: `Running` implies `scheduled_start_at` is set, `Stopped`
/// implies it is absent. Mutations go through the coordinator only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomState {
    pub room_id: RoomId,
    pub tempo_bpm: Tempo,
    pub time_signature: TimeSignature,
    pub status: MetronomeStatus,
    pub created_at: Timestamp,
    pub last_updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_start_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_server_beat_timestamp: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl RoomState {
    /// Derived beat interval in milliseconds.
    pub fn beat_interval_ms(&self) -> f64 {
        self.tempo_bpm.beat_interval_ms()
    }
}

/// Client capabilities advertised on join.
///
/// A fixed-key structure with one reserved slot rather than a schema-less
/// metadata bag; `instrument` is the only capability the service models.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,
}

/// A participant of a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub room_id: RoomId,
    pub client_id: ClientId,
    pub display_name: String,
    pub joined_at: Timestamp,
    #[serde(default)]
    pub capabilities: Capabilities,
}

impl Participant {
    /// The participant's instrument, when one has been assigned.
    pub fn instrument(&self) -> Option<&str> {
        self.capabilities.instrument.as_deref()
    }
}

/// Room state together with its current participant set.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomDetails {
    pub state: RoomState,
    pub participants: Vec<Participant>,
}

/// Transient synchronization payload, produced fresh for every
/// start/stop/tempo/signature broadcast. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPayload {
    pub room_id: RoomId,
    pub tempo_bpm: Tempo,
    pub beat_interval_ms: f64,
    /// Generation instant on the server clock.
    pub server_timestamp_utc: Timestamp,
    /// Effective or scheduled start instant on the server clock.
    pub start_at_utc: Timestamp,
    pub time_signature: TimeSignature,
}

/// Response to a clock-sync ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSyncResponse {
    pub server_timestamp_utc: Timestamp,
    /// Advisory maximum acceptable drift; not enforced server-side.
    pub max_drift_ms: u32,
}
