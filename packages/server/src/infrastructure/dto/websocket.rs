//! WebSocket protocol DTOs.
//!
//! Inbound client commands are a `type`-tagged enum; outbound events carry a
//! `type` discriminant alongside their payload. Timestamps are unix epoch
//! milliseconds.

use serde::{Deserialize, Serialize};

/// Outbound event discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    RoomSnapshot,
    ParticipantJoined,
    ParticipantLeft,
    ParticipantUpdated,
    MetronomeStart,
    MetronomeStop,
    TempoChanged,
    TimeSignatureChanged,
    ClockSyncResponse,
    Error,
}

/// Capabilities a client advertises on join.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilitiesDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,
}

/// Commands a client may send over the websocket. The first command on a
/// fresh connection must be `join_room`; later commands resolve the room
/// through the connection's registry binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    JoinRoom {
        room_id: String,
        client_id: String,
        #[serde(default)]
        display_name: Option<String>,
        #[serde(default)]
        capabilities: Option<CapabilitiesDto>,
    },
    LeaveRoom,
    RequestMetronomeStart,
    RequestMetronomeStop,
    RequestTempoChange {
        tempo_bpm: u32,
    },
    RequestTimeSignatureChange {
        time_signature: String,
    },
    SetInstrument {
        instrument_id: String,
        display_name: String,
    },
    Ping {
        client_sent_timestamp_ms: i64,
    },
}

/// Room state as rendered on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomStateDto {
    pub room_id: String,
    pub tempo_bpm: u32,
    pub beat_interval_ms: f64,
    pub time_signature: String,
    pub status: String,
    pub created_at: i64,
    pub last_updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_start_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_server_beat_timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

/// Participant as rendered on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantDto {
    pub client_id: String,
    pub display_name: String,
    pub joined_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument_id: Option<String>,
}

/// Synchronization payload as rendered on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPayloadDto {
    pub room_id: String,
    pub tempo_bpm: u32,
    pub beat_interval_ms: f64,
    pub server_timestamp_utc: i64,
    pub start_at_utc: i64,
    pub time_signature: String,
}

/// Sent to the caller only, right after a successful join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshotMessage {
    pub r#type: MessageType,
    pub room: RoomStateDto,
    pub participants: Vec<ParticipantDto>,
    pub invite_url: String,
}

/// Sent to the other group members when a participant joins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantJoinedMessage {
    pub r#type: MessageType,
    pub participant: ParticipantDto,
}

/// Sent to the group when a participant leaves or disconnects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantLeftMessage {
    pub r#type: MessageType,
    pub client_id: String,
}

/// Sent to the group after an instrument assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantUpdatedMessage {
    pub r#type: MessageType,
    pub participant: ParticipantDto,
}

/// Sent to the group when the metronome is scheduled to start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetronomeStartMessage {
    pub r#type: MessageType,
    pub payload: SyncPayloadDto,
}

/// Sent to the group when the metronome stops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetronomeStopMessage {
    pub r#type: MessageType,
    pub room: RoomStateDto,
}

/// Sent to the group after a tempo change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempoChangedMessage {
    pub r#type: MessageType,
    pub room: RoomStateDto,
}

/// Sent to the group after a time-signature change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSignatureChangedMessage {
    pub r#type: MessageType,
    pub room: RoomStateDto,
}

/// Answer to a clock-sync ping, sent to the caller only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockSyncResponseMessage {
    pub r#type: MessageType,
    pub server_timestamp_utc: i64,
    pub max_drift_ms: u32,
}

/// Command rejection, sent to the caller only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub r#type: MessageType,
    pub message: String,
}
