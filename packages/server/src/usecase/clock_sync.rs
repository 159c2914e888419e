//! Usecase: clock-offset estimation from a single round-trip ping.
//!
//! The server computes `offset = server_now - client_sent_timestamp` for a
//! ping, records it, and returns its own current time with the configured
//! maximum acceptable drift. This is a single-sample estimate: it absorbs
//! one full one-way-plus-return network delay as error, and no NTP-style
//! multi-sample averaging is performed.

use std::sync::Arc;

use pulseband_shared::time::Clock;

use crate::{
    config::SyncOptions,
    domain::{ClientId, ClockSyncResponse, RoomId, Timestamp},
};

use super::{CoordinatorError, RoomCoordinator};

/// Computes and stores client/server clock offsets.
pub struct ClockSyncService {
    coordinator: Arc<RoomCoordinator>,
    clock: Arc<dyn Clock>,
    options: SyncOptions,
}

impl ClockSyncService {
    pub fn new(
        coordinator: Arc<RoomCoordinator>,
        clock: Arc<dyn Clock>,
        options: SyncOptions,
    ) -> Self {
        Self {
            coordinator,
            clock,
            options,
        }
    }

    /// Handle a clock-sync ping: record the offset sample and answer with
    /// the server's current time. `max_drift_ms` is advisory for the client,
    /// not enforced here.
    pub async fn ping(
        &self,
        room_id: &RoomId,
        client_id: &ClientId,
        client_sent_timestamp_ms: i64,
    ) -> Result<ClockSyncResponse, CoordinatorError> {
        let server_now = self.clock.now_utc_millis();
        let offset_ms = (server_now - client_sent_timestamp_ms) as f64;

        self.coordinator
            .record_clock_offset(room_id, client_id, offset_ms)
            .await?;

        Ok(ClockSyncResponse {
            server_timestamp_utc: Timestamp::new(server_now),
            max_drift_ms: self.options.max_drift_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::RoomOptions,
        infrastructure::store::InMemoryRoomStore,
        usecase::CreateRoomRequest,
    };
    use pulseband_shared::time::FixedClock;

    const NOW_MS: i64 = 1_700_000_000_000;

    fn create_service() -> (ClockSyncService, Arc<RoomCoordinator>, Arc<InMemoryRoomStore>) {
        let clock = Arc::new(FixedClock::new(NOW_MS));
        let store = Arc::new(InMemoryRoomStore::new(clock.clone()));
        let coordinator = Arc::new(RoomCoordinator::new(
            store.clone(),
            clock.clone(),
            RoomOptions::default(),
            SyncOptions::default(),
        ));
        let service = ClockSyncService::new(coordinator.clone(), clock, SyncOptions::default());
        (service, coordinator, store)
    }

    #[tokio::test]
    async fn test_ping_returns_server_time_and_max_drift() {
        // given:
        let (service, coordinator, _store) = create_service();
        let room = coordinator
            .create_room(CreateRoomRequest::default())
            .await
            .unwrap();
        let client_id = ClientId::new("alice".to_string()).unwrap();

        // when: client clock runs 250 ms behind the server
        let response = service
            .ping(&room.state.room_id, &client_id, NOW_MS - 250)
            .await
            .unwrap();

        // then:
        assert_eq!(response.server_timestamp_utc.value(), NOW_MS);
        assert_eq!(response.max_drift_ms, SyncOptions::default().max_drift_ms);
    }

    #[tokio::test]
    async fn test_ping_records_signed_offset() {
        // given:
        let (service, coordinator, store) = create_service();
        let room = coordinator
            .create_room(CreateRoomRequest::default())
            .await
            .unwrap();
        let client_id = ClientId::new("alice".to_string()).unwrap();

        // when: client clock runs 250 ms ahead of the server
        service
            .ping(&room.state.room_id, &client_id, NOW_MS + 250)
            .await
            .unwrap();

        // then: stored sample is server-minus-client, so negative
        let offset = store
            .get_clock_offset(&room.state.room_id, &client_id)
            .await;
        assert_eq!(offset, Some(-250.0));
    }
}
