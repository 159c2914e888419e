//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::RoomId,
    infrastructure::dto::{
        conversion::room_response,
        http::{RoomCreateRequestDto, RoomResponseDto},
    },
    ui::state::AppState,
    usecase::{CoordinatorError, CreateRoomRequest},
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Create a room
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RoomCreateRequestDto>,
) -> Result<(StatusCode, Json<RoomResponseDto>), StatusCode> {
    let details = state
        .coordinator
        .create_room(CreateRoomRequest {
            tempo_bpm: request.tempo_bpm,
            time_signature: request.time_signature,
            requested_by: request.requested_by,
        })
        .await
        .map_err(|e| {
            tracing::error!("Failed to create room: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let invite_url = state.link_builder.room_url(&details.state.room_id);
    tracing::info!("Created room '{}'", details.state.room_id);
    Ok((StatusCode::CREATED, Json(room_response(&details, invite_url))))
}

/// Get room detail by ID
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomResponseDto>, StatusCode> {
    let room_id = RoomId::new(room_id);
    match state.coordinator.get_room(&room_id).await {
        Ok(details) => {
            let invite_url = state.link_builder.room_url(&details.state.room_id);
            Ok(Json(room_response(&details, invite_url)))
        }
        Err(CoordinatorError::RoomNotFound) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to get room '{}': {}", room_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Close a room and drop its participant set
pub async fn delete_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let room_id = RoomId::new(room_id);
    match state.coordinator.close_room(&room_id).await {
        Ok(Some(_)) => {
            tracing::info!("Closed room '{}'", room_id);
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to close room '{}': {}", room_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
