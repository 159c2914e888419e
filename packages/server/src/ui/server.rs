//! Server execution logic.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    config::RoomLinkBuilder,
    domain::BroadcastBus,
    usecase::{ClockSyncService, RoomCoordinator, SyncPayloadFactory},
};

use super::{
    handler::{
        http::{create_room, delete_room, get_room, health_check},
        websocket::websocket_handler,
    },
    registry::ConnectionRegistry,
    signal::shutdown_signal,
    state::AppState,
};

/// Shared-metronome WebSocket server
///
/// This struct encapsulates the server configuration and provides methods to
/// run the server.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(coordinator, clock_sync, payload_factory, bus, link_builder);
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    coordinator: Arc<RoomCoordinator>,
    clock_sync: Arc<ClockSyncService>,
    payload_factory: SyncPayloadFactory,
    bus: Arc<dyn BroadcastBus>,
    link_builder: RoomLinkBuilder,
}

impl Server {
    pub fn new(
        coordinator: Arc<RoomCoordinator>,
        clock_sync: Arc<ClockSyncService>,
        payload_factory: SyncPayloadFactory,
        bus: Arc<dyn BroadcastBus>,
        link_builder: RoomLinkBuilder,
    ) -> Self {
        Self {
            coordinator,
            clock_sync,
            payload_factory,
            bus,
            link_builder,
        }
    }

    /// Build the application router over the shared state.
    pub fn router(self) -> Router {
        let app_state = Arc::new(AppState {
            coordinator: self.coordinator,
            clock_sync: self.clock_sync,
            payload_factory: self.payload_factory,
            bus: self.bus,
            registry: ConnectionRegistry::new(),
            link_builder: self.link_builder,
        });

        Router::new()
            // WebSocket endpoint
            .route("/ws", get(websocket_handler))
            // HTTP endpoints
            .route("/api/health", get(health_check))
            .route("/api/rooms", post(create_room))
            .route("/api/rooms/{room_id}", get(get_room).delete(delete_room))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state)
    }

    /// Run the shared-metronome server
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address
    /// or if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.router();

        // Bind the server to the host and port
        let bind_addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

        // Start the server
        tracing::info!(
            "Shared-metronome server listening on {}",
            listener.local_addr()?
        );
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        // Set up graceful shutdown signal handler
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
