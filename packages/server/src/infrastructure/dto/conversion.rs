//! Conversion logic between DTOs and domain entities.

use crate::domain::{
    Capabilities, MetronomeStatus, Participant, RoomDetails, RoomState, SyncPayload,
};

use super::{
    http::RoomResponseDto,
    websocket::{CapabilitiesDto, ParticipantDto, RoomStateDto, SyncPayloadDto},
};

// ========================================
// Domain entity -> DTO
// ========================================

fn status_label(status: MetronomeStatus) -> String {
    match status {
        MetronomeStatus::Stopped => "stopped".to_string(),
        MetronomeStatus::Running => "running".to_string(),
    }
}

impl From<&RoomState> for RoomStateDto {
    fn from(state: &RoomState) -> Self {
        Self {
            room_id: state.room_id.as_str().to_string(),
            tempo_bpm: state.tempo_bpm.bpm(),
            beat_interval_ms: state.beat_interval_ms(),
            time_signature: state.time_signature.to_string(),
            status: status_label(state.status),
            created_at: state.created_at.value(),
            last_updated_at: state.last_updated_at.value(),
            scheduled_start_at: state.scheduled_start_at.map(|t| t.value()),
            last_server_beat_timestamp: state.last_server_beat_timestamp.map(|t| t.value()),
            created_by: state.created_by.clone(),
        }
    }
}

impl From<&Participant> for ParticipantDto {
    fn from(participant: &Participant) -> Self {
        Self {
            client_id: participant.client_id.as_str().to_string(),
            display_name: participant.display_name.clone(),
            joined_at: participant.joined_at.value(),
            instrument_id: participant.instrument().map(str::to_string),
        }
    }
}

impl From<&SyncPayload> for SyncPayloadDto {
    fn from(payload: &SyncPayload) -> Self {
        Self {
            room_id: payload.room_id.as_str().to_string(),
            tempo_bpm: payload.tempo_bpm.bpm(),
            beat_interval_ms: payload.beat_interval_ms,
            server_timestamp_utc: payload.server_timestamp_utc.value(),
            start_at_utc: payload.start_at_utc.value(),
            time_signature: payload.time_signature.to_string(),
        }
    }
}

// ========================================
// DTO -> domain entity
// ========================================

impl From<CapabilitiesDto> for Capabilities {
    fn from(dto: CapabilitiesDto) -> Self {
        Self {
            instrument: dto.instrument,
        }
    }
}

/// Room response assembly for the HTTP surface.
pub fn room_response(details: &RoomDetails, invite_url: String) -> RoomResponseDto {
    let state = &details.state;
    RoomResponseDto {
        room_id: state.room_id.as_str().to_string(),
        tempo_bpm: state.tempo_bpm.bpm(),
        beat_interval_ms: state.beat_interval_ms(),
        time_signature: state.time_signature.to_string(),
        status: status_label(state.status),
        created_at: state.created_at.value(),
        last_updated_at: state.last_updated_at.value(),
        scheduled_start_at: state.scheduled_start_at.map(|t| t.value()),
        last_server_beat_timestamp: state.last_server_beat_timestamp.map(|t| t.value()),
        created_by: state.created_by.clone(),
        invite_url,
        participants: details.participants.iter().map(ParticipantDto::from).collect(),
    }
}
