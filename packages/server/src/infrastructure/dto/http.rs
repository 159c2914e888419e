//! HTTP API DTOs.

use serde::{Deserialize, Serialize};

use super::websocket::ParticipantDto;

/// Body of `POST /api/rooms`. All fields optional; missing values fall back
/// to the configured defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomCreateRequestDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo_bpm: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<String>,
}

/// Response of the room endpoints: room attributes plus invite URL and the
/// current participant list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomResponseDto {
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
    pub invite_url: String,
    pub participants: Vec<ParticipantDto>,
}
