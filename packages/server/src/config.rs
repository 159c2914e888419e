//! Server configuration: room tunables, synchronization tunables, and the
//! invite-link builder.

use std::time::Duration;

use crate::domain::{RoomId, TimeSignature};

/// Room-level tunables.
#[derive(Debug, Clone)]
pub struct RoomOptions {
    /// Tempo applied when a creation request carries none.
    pub default_tempo_bpm: u32,
    /// Time signature applied when a creation request carries none
    /// (or an unparseable one).
    pub default_time_signature: TimeSignature,
    /// Store TTL for room state, participants and clock-offset samples.
    /// Refreshed on every successful write; an untouched room silently
    /// expires.
    pub ttl: Duration,
    /// Capacity enforced only for participants joining under a new client id.
    pub max_participants: usize,
}

impl Default for RoomOptions {
    fn default() -> Self {
        Self {
            default_tempo_bpm: 120,
            default_time_signature: TimeSignature::common_time(),
            ttl: Duration::from_secs(6 * 60 * 60),
            max_participants: 32,
        }
    }
}

/// Beat-synchronization tunables.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Maximum acceptable drift advertised to clients in clock-sync
    /// responses. Advisory only; not enforced server-side.
    pub max_drift_ms: u32,
    /// Number of ping samples a client is suggested to take. Currently
    /// unused: the server keeps a single offset sample per client.
    pub ping_sample_size: u32,
    /// Delay between a start request and the scheduled effective start,
    /// giving clients time to receive the payload before beat 1.
    pub lead_time_ms: u32,
    /// Suggested ping cadence for clients refreshing their clock offset.
    pub heartbeat_interval_ms: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_drift_ms: 3,
            ping_sample_size: 5,
            lead_time_ms: 1500,
            heartbeat_interval_ms: 2000,
        }
    }
}

/// Builds shareable invite URLs for rooms from the configured public base URL.
#[derive(Debug, Clone)]
pub struct RoomLinkBuilder {
    base_url: String,
}

impl RoomLinkBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build the invite URL for a room.
    pub fn room_url(&self, room_id: &RoomId) -> String {
        format!("{}/rooms/{}", self.base_url, room_id.as_str())
    }
}
