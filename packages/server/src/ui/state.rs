//! Server state shared across handlers.

use std::sync::Arc;

use crate::{
    config::RoomLinkBuilder,
    domain::BroadcastBus,
    usecase::{ClockSyncService, RoomCoordinator, SyncPayloadFactory},
};

use super::registry::ConnectionRegistry;

/// Shared application state
pub struct AppState {
    /// Room lifecycle and participant management
    pub coordinator: Arc<RoomCoordinator>,
    /// Clock-offset estimation
    pub clock_sync: Arc<ClockSyncService>,
    /// Metronome start payload assembly
    pub payload_factory: SyncPayloadFactory,
    /// Group-addressed push over live connections
    pub bus: Arc<dyn BroadcastBus>,
    /// Connection-to-room bindings
    pub registry: ConnectionRegistry,
    /// Invite link assembly
    pub link_builder: RoomLinkBuilder,
}
