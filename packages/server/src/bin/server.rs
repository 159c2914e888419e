//! Shared-metronome WebSocket server.
//!
//! Coordinates tempo, time signature, and metronome start/stop across all
//! participants of a room, and answers clock-sync pings.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin pulseband-server
//! cargo run --bin pulseband-server -- --host 0.0.0.0 --port 3000
//! ```

use std::sync::Arc;

use clap::Parser;

use pulseband_server::{
    config::{RoomLinkBuilder, RoomOptions, SyncOptions},
    infrastructure::{bus::WebSocketBroadcastBus, store::InMemoryRoomStore},
    ui::Server,
    usecase::{ClockSyncService, RoomCoordinator, SyncPayloadFactory},
};
use pulseband_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "pulseband-server")]
#[command(about = "Shared-metronome synchronization server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Public base URL used in invite links
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    public_base_url: String,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // Initialize dependencies in order:
    // 1. Clock and store
    // 2. Broadcast bus
    // 3. Services
    // 4. Server

    // 1. Create clock and room state store (in-memory database)
    let clock = Arc::new(SystemClock);
    let store = Arc::new(InMemoryRoomStore::new(clock.clone()));

    // 2. Create broadcast bus (WebSocket implementation)
    let bus = Arc::new(WebSocketBroadcastBus::new());

    // 3. Create services
    let room_options = RoomOptions::default();
    let sync_options = SyncOptions::default();
    let coordinator = Arc::new(RoomCoordinator::new(
        store,
        clock.clone(),
        room_options,
        sync_options.clone(),
    ));
    let clock_sync = Arc::new(ClockSyncService::new(
        coordinator.clone(),
        clock.clone(),
        sync_options.clone(),
    ));
    let payload_factory = SyncPayloadFactory::new(clock, sync_options);
    let link_builder = RoomLinkBuilder::new(args.public_base_url);

    // 4. Create and run the server
    let server = Server::new(coordinator, clock_sync, payload_factory, bus, link_builder);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
