//! Terminal metronome client with room join and reconnection support.
//!
//! Joins a shared-metronome room (creating one first when no room id is
//! given), prints beats in sync with the other participants, and relays
//! typed commands to the server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin pulseband-client -- --client-id alice
//! cargo run --bin pulseband-client -- -c bob --room-id <id>
//! ```

use clap::Parser;

use pulseband_client::{api::RoomApi, runner::run_client, session::SessionConfig};
use pulseband_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "pulseband-client")]
#[command(about = "Terminal client for the shared-metronome server", long_about = None)]
struct Args {
    /// Client ID, unique within the room
    #[arg(short = 'c', long)]
    client_id: String,

    /// Display name shown to other participants (defaults to client id)
    #[arg(short = 'n', long)]
    display_name: Option<String>,

    /// Room to join; a fresh room is created when omitted
    #[arg(short = 'r', long)]
    room_id: Option<String>,

    /// Server base URL for the room HTTP API
    #[arg(short = 'a', long, default_value = "http://127.0.0.1:8080")]
    api_url: String,

    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Clock-sync ping interval in milliseconds
    #[arg(long, default_value = "2000")]
    heartbeat_interval_ms: u64,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let api = RoomApi::new(&args.api_url);
    let room_id = match args.room_id {
        Some(room_id) => match api.get_room(&room_id).await {
            Ok(room) => room.room_id,
            Err(e) => {
                tracing::error!("Cannot join room '{}': {}", room_id, e);
                std::process::exit(1);
            }
        },
        None => match api
            .create_room(None, None, Some(args.client_id.clone()))
            .await
        {
            Ok(room) => {
                println!("Created room '{}'", room.room_id);
                println!("Invite others with: {}", room.invite_url);
                room.room_id
            }
            Err(e) => {
                tracing::error!("Failed to create a room: {}", e);
                std::process::exit(1);
            }
        },
    };

    let config = SessionConfig {
        ws_url: args.url,
        room_id,
        display_name: args
            .display_name
            .unwrap_or_else(|| args.client_id.clone()),
        client_id: args.client_id,
        heartbeat_interval_ms: args.heartbeat_interval_ms,
    };

    // Run the client
    if let Err(e) = run_client(config).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
