//! In-memory room state store.
//!
//! Implements the `RoomStateStore` port over maps behind a mutex, keeping the
//! key discipline of an external key-value store with TTL: records are stored
//! as serialized JSON payloads with an explicit expiry deadline, and expired
//! records read as absent (lazy expiry against the injected clock). Saving a
//! room refreshes the TTL of its participant collection as well.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use pulseband_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{ClientId, Participant, RoomId, RoomState, RoomStateStore, StoreError};

struct Expiring<T> {
    value: T,
    expires_at: i64,
}

impl<T> Expiring<T> {
    fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }
}

#[derive(Default)]
struct Shelves {
    /// Room state keyed by room id, serialized.
    rooms: HashMap<String, Expiring<String>>,
    /// Participant collection keyed by room id: client id -> serialized
    /// participant.
    participants: HashMap<String, Expiring<HashMap<String, String>>>,
    /// Clock-offset sample keyed by (room id, client id).
    offsets: HashMap<(String, String), Expiring<f64>>,
}

/// In-memory `RoomStateStore` implementation.
pub struct InMemoryRoomStore {
    clock: Arc<dyn Clock>,
    shelves: Mutex<Shelves>,
}

impl InMemoryRoomStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            shelves: Mutex::new(Shelves::default()),
        }
    }

    fn deadline(&self, ttl: Duration) -> i64 {
        self.clock.now_utc_millis() + ttl.as_millis() as i64
    }

    /// Read the latest clock-offset sample for a client, if present and not
    /// expired.
    pub async fn get_clock_offset(&self, room_id: &RoomId, client_id: &ClientId) -> Option<f64> {
        let now = self.clock.now_utc_millis();
        let shelves = self.shelves.lock().await;
        let key = (room_id.as_str().to_string(), client_id.as_str().to_string());
        shelves
            .offsets
            .get(&key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value)
    }
}

#[async_trait]
impl RoomStateStore for InMemoryRoomStore {
    async fn save_room(&self, state: &RoomState, ttl: Duration) -> Result<(), StoreError> {
        let payload = serde_json::to_string(state)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let expires_at = self.deadline(ttl);

        let mut shelves = self.shelves.lock().await;
        shelves.rooms.insert(
            state.room_id.as_str().to_string(),
            Expiring {
                value: payload,
                expires_at,
            },
        );
        // Room writes refresh the participant collection's TTL too.
        if let Some(entry) = shelves.participants.get_mut(state.room_id.as_str()) {
            entry.expires_at = expires_at;
        }
        tracing::debug!(
            "Saved room {} with TTL {:?}",
            state.room_id,
            ttl
        );
        Ok(())
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<Option<RoomState>, StoreError> {
        let now = self.clock.now_utc_millis();
        let mut shelves = self.shelves.lock().await;
        match shelves.rooms.get(room_id.as_str()) {
            Some(entry) if !entry.is_expired(now) => {
                let state: RoomState = serde_json::from_str(&entry.value)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(state))
            }
            Some(_) => {
                shelves.rooms.remove(room_id.as_str());
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete_room(&self, room_id: &RoomId) -> Result<(), StoreError> {
        let mut shelves = self.shelves.lock().await;
        shelves.rooms.remove(room_id.as_str());
        shelves.participants.remove(room_id.as_str());
        shelves
            .offsets
            .retain(|(room, _), _| room != room_id.as_str());
        Ok(())
    }

    async fn get_participants(&self, room_id: &RoomId) -> Result<Vec<Participant>, StoreError> {
        let now = self.clock.now_utc_millis();
        let shelves = self.shelves.lock().await;
        let entry = match shelves.participants.get(room_id.as_str()) {
            Some(entry) if !entry.is_expired(now) => entry,
            _ => return Ok(Vec::new()),
        };

        let mut participants = Vec::with_capacity(entry.value.len());
        for payload in entry.value.values() {
            let participant: Participant = serde_json::from_str(payload)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            participants.push(participant);
        }
        Ok(participants)
    }

    async fn get_participant(
        &self,
        room_id: &RoomId,
        client_id: &ClientId,
    ) -> Result<Option<Participant>, StoreError> {
        let now = self.clock.now_utc_millis();
        let shelves = self.shelves.lock().await;
        let payload = shelves
            .participants
            .get(room_id.as_str())
            .filter(|entry| !entry.is_expired(now))
            .and_then(|entry| entry.value.get(client_id.as_str()));
        match payload {
            Some(payload) => {
                let participant: Participant = serde_json::from_str(payload)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(participant))
            }
            None => Ok(None),
        }
    }

    async fn upsert_participant(
        &self,
        participant: &Participant,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(participant)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let expires_at = self.deadline(ttl);
        let now = self.clock.now_utc_millis();

        let mut shelves = self.shelves.lock().await;
        let entry = shelves
            .participants
            .entry(participant.room_id.as_str().to_string())
            .or_insert_with(|| Expiring {
                value: HashMap::new(),
                expires_at,
            });
        if entry.is_expired(now) {
            entry.value.clear();
        }
        entry
            .value
            .insert(participant.client_id.as_str().to_string(), payload);
        entry.expires_at = expires_at;
        Ok(())
    }

    async fn remove_participant(
        &self,
        room_id: &RoomId,
        client_id: &ClientId,
    ) -> Result<(), StoreError> {
        let mut shelves = self.shelves.lock().await;
        if let Some(entry) = shelves.participants.get_mut(room_id.as_str()) {
            entry.value.remove(client_id.as_str());
        }
        Ok(())
    }

    async fn save_clock_offset(
        &self,
        room_id: &RoomId,
        client_id: &ClientId,
        offset_ms: f64,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let expires_at = self.deadline(ttl);
        let mut shelves = self.shelves.lock().await;
        shelves.offsets.insert(
            (room_id.as_str().to_string(), client_id.as_str().to_string()),
            Expiring {
                value: offset_ms,
                expires_at,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Capabilities, MetronomeStatus, Tempo, TimeSignature, Timestamp};
    use pulseband_shared::time::FixedClock;

    const NOW_MS: i64 = 1_700_000_000_000;
    const TTL: Duration = Duration::from_secs(60);

    fn sample_room(id: &str) -> RoomState {
        RoomState {
            room_id: RoomId::new(id.to_string()),
            tempo_bpm: Tempo::clamped(96),
            time_signature: TimeSignature::parse("6/8").unwrap(),
            status: MetronomeStatus::Running,
            created_at: Timestamp::new(NOW_MS - 1000),
            last_updated_at: Timestamp::new(NOW_MS),
            scheduled_start_at: Some(Timestamp::new(NOW_MS + 1500)),
            last_server_beat_timestamp: Some(Timestamp::new(NOW_MS + 1500)),
            created_by: Some("alice".to_string()),
        }
    }

    fn sample_participant(room_id: &str, client_id: &str) -> Participant {
        Participant {
            room_id: RoomId::new(room_id.to_string()),
            client_id: ClientId::new(client_id.to_string()).unwrap(),
            display_name: client_id.to_string(),
            joined_at: Timestamp::new(NOW_MS),
            capabilities: Capabilities {
                instrument: Some("bass".to_string()),
            },
        }
    }

    #[tokio::test]
    async fn test_room_round_trip_preserves_all_attributes() {
        // given:
        let store = InMemoryRoomStore::new(Arc::new(FixedClock::new(NOW_MS)));
        let room = sample_room("room1");

        // when:
        store.save_room(&room, TTL).await.unwrap();
        let loaded = store.get_room(&room.room_id).await.unwrap();

        // then: serialization round trip yields identical attribute values
        assert_eq!(loaded, Some(room));
    }

    #[tokio::test]
    async fn test_expired_room_reads_as_absent() {
        // given: a room written, then the clock moved past the TTL
        let store = InMemoryRoomStore::new(Arc::new(FixedClock::new(NOW_MS)));
        let room = sample_room("room1");
        store.save_room(&room, TTL).await.unwrap();

        let late_store = InMemoryRoomStore {
            clock: Arc::new(FixedClock::new(NOW_MS + TTL.as_millis() as i64 + 1)),
            shelves: Mutex::new(std::mem::take(
                &mut *store.shelves.lock().await,
            )),
        };

        // when:
        let loaded = late_store.get_room(&room.room_id).await.unwrap();

        // then:
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_participant_round_trip() {
        // given:
        let store = InMemoryRoomStore::new(Arc::new(FixedClock::new(NOW_MS)));
        let participant = sample_participant("room1", "alice");

        // when:
        store.upsert_participant(&participant, TTL).await.unwrap();
        let loaded = store
            .get_participant(&participant.room_id, &participant.client_id)
            .await
            .unwrap();

        // then:
        assert_eq!(loaded, Some(participant));
    }

    #[tokio::test]
    async fn test_get_participants_lists_all() {
        // given:
        let store = InMemoryRoomStore::new(Arc::new(FixedClock::new(NOW_MS)));
        let room_id = RoomId::new("room1".to_string());
        store
            .upsert_participant(&sample_participant("room1", "alice"), TTL)
            .await
            .unwrap();
        store
            .upsert_participant(&sample_participant("room1", "bob"), TTL)
            .await
            .unwrap();

        // when:
        let participants = store.get_participants(&room_id).await.unwrap();

        // then:
        assert_eq!(participants.len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_participant() {
        // given:
        let store = InMemoryRoomStore::new(Arc::new(FixedClock::new(NOW_MS)));
        let mut participant = sample_participant("room1", "alice");
        store.upsert_participant(&participant, TTL).await.unwrap();

        // when:
        participant.display_name = "Alice D".to_string();
        store.upsert_participant(&participant, TTL).await.unwrap();

        // then: still one entry, with the updated payload
        let participants = store.get_participants(&participant.room_id).await.unwrap();
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].display_name, "Alice D");
    }

    #[tokio::test]
    async fn test_remove_participant_missing_is_noop() {
        // given:
        let store = InMemoryRoomStore::new(Arc::new(FixedClock::new(NOW_MS)));
        let room_id = RoomId::new("room1".to_string());
        let client_id = ClientId::new("ghost".to_string()).unwrap();

        // when:
        let result = store.remove_participant(&room_id, &client_id).await;

        // then:
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_delete_room_clears_all_keys() {
        // given:
        let store = InMemoryRoomStore::new(Arc::new(FixedClock::new(NOW_MS)));
        let room = sample_room("room1");
        let participant = sample_participant("room1", "alice");
        store.save_room(&room, TTL).await.unwrap();
        store.upsert_participant(&participant, TTL).await.unwrap();
        store
            .save_clock_offset(&room.room_id, &participant.client_id, 12.0, TTL)
            .await
            .unwrap();

        // when:
        store.delete_room(&room.room_id).await.unwrap();

        // then:
        assert!(store.get_room(&room.room_id).await.unwrap().is_none());
        assert!(store
            .get_participants(&room.room_id)
            .await
            .unwrap()
            .is_empty());
        assert!(store
            .get_clock_offset(&room.room_id, &participant.client_id)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_clock_offset_round_trip() {
        // given:
        let store = InMemoryRoomStore::new(Arc::new(FixedClock::new(NOW_MS)));
        let room_id = RoomId::new("room1".to_string());
        let client_id = ClientId::new("alice".to_string()).unwrap();

        // when:
        store
            .save_clock_offset(&room_id, &client_id, -37.5, TTL)
            .await
            .unwrap();

        // then:
        assert_eq!(
            store.get_clock_offset(&room_id, &client_id).await,
            Some(-37.5)
        );
    }
}
