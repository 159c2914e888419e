//! Room API access over HTTP.

use pulseband_server::infrastructure::dto::http::{RoomCreateRequestDto, RoomResponseDto};

use crate::error::ClientError;

/// Thin client for the room HTTP API.
pub struct RoomApi {
    base_url: String,
    http: reqwest::Client,
}

impl RoomApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Create a room. Omitted fields fall back to server defaults.
    pub async fn create_room(
        &self,
        tempo_bpm: Option<u32>,
        time_signature: Option<String>,
        requested_by: Option<String>,
    ) -> Result<RoomResponseDto, ClientError> {
        let response = self
            .http
            .post(format!("{}/api/rooms", self.base_url))
            .json(&RoomCreateRequestDto {
                tempo_bpm,
                time_signature,
                requested_by,
            })
            .send()
            .await
            .map_err(|e| ClientError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::ApiError(format!(
                "room creation failed with status {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| ClientError::ApiError(e.to_string()))
    }

    /// Fetch a room by id.
    pub async fn get_room(&self, room_id: &str) -> Result<RoomResponseDto, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/rooms/{}", self.base_url, room_id))
            .send()
            .await
            .map_err(|e| ClientError::ConnectionError(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::ApiError(format!("room '{room_id}' not found")));
        }
        if !response.status().is_success() {
            return Err(ClientError::ApiError(format!(
                "room lookup failed with status {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| ClientError::ApiError(e.to_string()))
    }
}
