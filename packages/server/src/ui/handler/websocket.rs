//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::{
    domain::{Capabilities, ClientId, ConnectionId, RoomId},
    infrastructure::dto::websocket::{
        ClientCommand, ClockSyncResponseMessage, ErrorMessage, MessageType, MetronomeStartMessage,
        MetronomeStopMessage, ParticipantDto, ParticipantJoinedMessage, ParticipantLeftMessage,
        ParticipantUpdatedMessage, RoomSnapshotMessage, RoomStateDto, SyncPayloadDto,
        TempoChangedMessage, TimeSignatureChangedMessage,
    },
    ui::{
        registry::ConnectionBinding,
        state::AppState,
    },
    usecase::{CoordinatorError, UpsertParticipant},
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let connection_id = ConnectionId::generate();
    tracing::info!("WebSocket upgrade for connection '{}'", connection_id);
    ws.on_upgrade(move |socket| handle_socket(socket, state, connection_id))
}

/// Serialize an outbound event. Event structs contain only JSON-safe types,
/// so serialization cannot fail.
fn encode<T: Serialize>(message: &T) -> String {
    serde_json::to_string(message).unwrap()
}

/// Spawns a task that receives messages from the rx channel and pushes them
/// to the WebSocket sender.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, connection_id: ConnectionId) {
    let (sender, mut receiver) = socket.split();

    // Register the outbound channel before any command can trigger a push
    let (tx, rx) = mpsc::unbounded_channel();
    state
        .bus
        .register_connection(connection_id.clone(), tx)
        .await;
    let mut send_task = pusher_loop(rx, sender);

    let state_clone = state.clone();
    let connection_id_clone = connection_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error on '{}': {}", connection_id_clone, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    let command = match serde_json::from_str::<ClientCommand>(&text) {
                        Ok(command) => command,
                        Err(e) => {
                            tracing::warn!("Failed to parse command as JSON: {}", e);
                            send_error(&state_clone, &connection_id_clone, "unrecognized command")
                                .await;
                            continue;
                        }
                    };
                    dispatch_command(&state_clone, &connection_id_clone, command).await;
                }
                Message::Ping(_) => {
                    tracing::debug!("Received transport ping");
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", connection_id_clone);
                    break;
                }
                _ => {}
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // The registry yields the binding at most once, so cleanup does not race
    // an explicit leave_room that arrived just before the socket closed
    if let Some(binding) = state.registry.remove(&connection_id).await {
        leave_room(&state, &connection_id, &binding).await;
    }
    state.bus.unregister_connection(&connection_id).await;
    tracing::info!("Connection '{}' closed", connection_id);
}

async fn dispatch_command(state: &Arc<AppState>, connection_id: &ConnectionId, command: ClientCommand) {
    match command {
        ClientCommand::JoinRoom {
            room_id,
            client_id,
            display_name,
            capabilities,
        } => {
            handle_join(
                state,
                connection_id,
                room_id,
                client_id,
                display_name,
                capabilities.map(Capabilities::from).unwrap_or_default(),
            )
            .await;
        }
        ClientCommand::LeaveRoom => {
            match state.registry.remove(connection_id).await {
                Some(binding) => leave_room(state, connection_id, &binding).await,
                None => send_error(state, connection_id, "not in a room").await,
            }
        }
        ClientCommand::RequestMetronomeStart => {
            with_binding(state, connection_id, |binding| {
                handle_start(state, connection_id, binding)
            })
            .await;
        }
        ClientCommand::RequestMetronomeStop => {
            with_binding(state, connection_id, |binding| {
                handle_stop(state, connection_id, binding)
            })
            .await;
        }
        ClientCommand::RequestTempoChange { tempo_bpm } => {
            with_binding(state, connection_id, |binding| {
                handle_tempo_change(state, connection_id, binding, tempo_bpm)
            })
            .await;
        }
        ClientCommand::RequestTimeSignatureChange { time_signature } => {
            with_binding(state, connection_id, |binding| {
                handle_signature_change(state, connection_id, binding, time_signature)
            })
            .await;
        }
        ClientCommand::SetInstrument {
            instrument_id,
            display_name,
        } => {
            with_binding(state, connection_id, |binding| {
                handle_set_instrument(state, connection_id, binding, instrument_id, display_name)
            })
            .await;
        }
        ClientCommand::Ping {
            client_sent_timestamp_ms,
        } => {
            with_binding(state, connection_id, |binding| {
                handle_ping(state, connection_id, binding, client_sent_timestamp_ms)
            })
            .await;
        }
    }
}

/// Resolve the connection's room binding and run the handler with it, or
/// answer with an error when the connection has not joined a room yet.
async fn with_binding<'a, F, Fut>(state: &'a Arc<AppState>, connection_id: &'a ConnectionId, f: F)
where
    F: FnOnce(ConnectionBinding) -> Fut,
    Fut: std::future::Future<Output = ()> + 'a,
{
    match state.registry.get(connection_id).await {
        Some(binding) => f(binding).await,
        None => send_error(state, connection_id, "join a room first").await,
    }
}

async fn handle_join(
    state: &Arc<AppState>,
    connection_id: &ConnectionId,
    room_id: String,
    client_id: String,
    display_name: Option<String>,
    capabilities: Capabilities,
) {
    let client_id = match ClientId::new(client_id) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Rejected join on '{}': {}", connection_id, e);
            send_error(state, connection_id, &e).await;
            return;
        }
    };
    let room_id = RoomId::new(room_id);

    let joined = state
        .coordinator
        .upsert_participant(
            &room_id,
            UpsertParticipant {
                client_id: client_id.clone(),
                display_name: display_name.unwrap_or_default(),
                joined_at: None,
                capabilities,
            },
        )
        .await;
    let participant = match joined {
        Ok(participant) => participant,
        Err(e) => {
            tracing::warn!("Join to room '{}' failed: {}", room_id, e);
            send_coordinator_error(state, connection_id, &e).await;
            return;
        }
    };

    // A connection re-joining another room leaves its previous one first
    let previous = state
        .registry
        .insert(
            connection_id.clone(),
            ConnectionBinding {
                room_id: room_id.clone(),
                client_id: client_id.clone(),
            },
        )
        .await;
    if let Some(previous) = previous {
        if previous.room_id != room_id {
            leave_room(state, connection_id, &previous).await;
        }
    }

    state.bus.join_group(connection_id, &room_id).await;

    // Snapshot to the caller, join notification to everyone else
    match state.coordinator.get_room(&room_id).await {
        Ok(details) => {
            let snapshot = RoomSnapshotMessage {
                r#type: MessageType::RoomSnapshot,
                room: RoomStateDto::from(&details.state),
                participants: details.participants.iter().map(ParticipantDto::from).collect(),
                invite_url: state.link_builder.room_url(&room_id),
            };
            if let Err(e) = state
                .bus
                .send_to_caller(connection_id, &encode(&snapshot))
                .await
            {
                tracing::warn!("Failed to send room snapshot: {}", e);
            }
        }
        Err(e) => {
            tracing::error!("Failed to load snapshot of room '{}': {}", room_id, e);
        }
    }

    let joined_msg = ParticipantJoinedMessage {
        r#type: MessageType::ParticipantJoined,
        participant: ParticipantDto::from(&participant),
    };
    state
        .bus
        .send_to_others(connection_id, &room_id, &encode(&joined_msg))
        .await;
    tracing::info!(
        "Client '{}' joined room '{}' on connection '{}'",
        client_id,
        room_id,
        connection_id
    );
}

/// Remove the participant and notify the remaining members. Shared by the
/// explicit leave command and disconnect cleanup.
async fn leave_room(state: &Arc<AppState>, connection_id: &ConnectionId, binding: &ConnectionBinding) {
    if let Err(e) = state
        .coordinator
        .remove_participant(&binding.room_id, &binding.client_id)
        .await
    {
        tracing::warn!(
            "Failed to remove participant '{}' from room '{}': {}",
            binding.client_id,
            binding.room_id,
            e
        );
    }
    state.bus.leave_group(connection_id, &binding.room_id).await;

    let left_msg = ParticipantLeftMessage {
        r#type: MessageType::ParticipantLeft,
        client_id: binding.client_id.as_str().to_string(),
    };
    state
        .bus
        .send_to_group(&binding.room_id, &encode(&left_msg))
        .await;
    tracing::info!(
        "Client '{}' left room '{}'",
        binding.client_id,
        binding.room_id
    );
}

async fn handle_start(
    state: &Arc<AppState>,
    connection_id: &ConnectionId,
    binding: ConnectionBinding,
) {
    match state.coordinator.schedule_start(&binding.room_id).await {
        Ok(room_state) => {
            let payload = state.payload_factory.create(&room_state);
            let start_msg = MetronomeStartMessage {
                r#type: MessageType::MetronomeStart,
                payload: SyncPayloadDto::from(&payload),
            };
            state
                .bus
                .send_to_group(&binding.room_id, &encode(&start_msg))
                .await;
            tracing::info!(
                "Metronome start scheduled in room '{}' at {}",
                binding.room_id,
                payload.start_at_utc.value()
            );
        }
        Err(e) => send_coordinator_error(state, connection_id, &e).await,
    }
}

async fn handle_stop(
    state: &Arc<AppState>,
    connection_id: &ConnectionId,
    binding: ConnectionBinding,
) {
    match state.coordinator.stop(&binding.room_id).await {
        Ok(room_state) => {
            let stop_msg = MetronomeStopMessage {
                r#type: MessageType::MetronomeStop,
                room: RoomStateDto::from(&room_state),
            };
            state
                .bus
                .send_to_group(&binding.room_id, &encode(&stop_msg))
                .await;
            tracing::info!("Metronome stopped in room '{}'", binding.room_id);
        }
        Err(e) => send_coordinator_error(state, connection_id, &e).await,
    }
}

async fn handle_tempo_change(
    state: &Arc<AppState>,
    connection_id: &ConnectionId,
    binding: ConnectionBinding,
    tempo_bpm: u32,
) {
    match state
        .coordinator
        .change_tempo(&binding.room_id, tempo_bpm)
        .await
    {
        Ok(room_state) => {
            let tempo_msg = TempoChangedMessage {
                r#type: MessageType::TempoChanged,
                room: RoomStateDto::from(&room_state),
            };
            state
                .bus
                .send_to_group(&binding.room_id, &encode(&tempo_msg))
                .await;
            tracing::info!(
                "Tempo of room '{}' changed to {} bpm",
                binding.room_id,
                room_state.tempo_bpm.bpm()
            );
        }
        Err(e) => send_coordinator_error(state, connection_id, &e).await,
    }
}

async fn handle_signature_change(
    state: &Arc<AppState>,
    connection_id: &ConnectionId,
    binding: ConnectionBinding,
    time_signature: String,
) {
    match state
        .coordinator
        .change_time_signature(&binding.room_id, &time_signature)
        .await
    {
        Ok(room_state) => {
            let signature_msg = TimeSignatureChangedMessage {
                r#type: MessageType::TimeSignatureChanged,
                room: RoomStateDto::from(&room_state),
            };
            state
                .bus
                .send_to_group(&binding.room_id, &encode(&signature_msg))
                .await;
            tracing::info!(
                "Time signature of room '{}' changed to {}",
                binding.room_id,
                room_state.time_signature
            );
        }
        Err(e) => send_coordinator_error(state, connection_id, &e).await,
    }
}

async fn handle_set_instrument(
    state: &Arc<AppState>,
    connection_id: &ConnectionId,
    binding: ConnectionBinding,
    instrument_id: String,
    display_name: String,
) {
    match state
        .coordinator
        .update_instrument(&binding.room_id, &binding.client_id, &instrument_id, &display_name)
        .await
    {
        Ok(participant) => {
            let updated_msg = ParticipantUpdatedMessage {
                r#type: MessageType::ParticipantUpdated,
                participant: ParticipantDto::from(&participant),
            };
            state
                .bus
                .send_to_group(&binding.room_id, &encode(&updated_msg))
                .await;
        }
        Err(e) => send_coordinator_error(state, connection_id, &e).await,
    }
}

async fn handle_ping(
    state: &Arc<AppState>,
    connection_id: &ConnectionId,
    binding: ConnectionBinding,
    client_sent_timestamp_ms: i64,
) {
    match state
        .clock_sync
        .ping(&binding.room_id, &binding.client_id, client_sent_timestamp_ms)
        .await
    {
        Ok(response) => {
            let sync_msg = ClockSyncResponseMessage {
                r#type: MessageType::ClockSyncResponse,
                server_timestamp_utc: response.server_timestamp_utc.value(),
                max_drift_ms: response.max_drift_ms,
            };
            if let Err(e) = state
                .bus
                .send_to_caller(connection_id, &encode(&sync_msg))
                .await
            {
                tracing::warn!("Failed to answer clock-sync ping: {}", e);
            }
        }
        Err(e) => send_coordinator_error(state, connection_id, &e).await,
    }
}

async fn send_coordinator_error(
    state: &Arc<AppState>,
    connection_id: &ConnectionId,
    error: &CoordinatorError,
) {
    send_error(state, connection_id, &error.to_string()).await;
}

async fn send_error(state: &Arc<AppState>, connection_id: &ConnectionId, message: &str) {
    let error_msg = ErrorMessage {
        r#type: MessageType::Error,
        message: message.to_string(),
    };
    if let Err(e) = state
        .bus
        .send_to_caller(connection_id, &encode(&error_msg))
        .await
    {
        tracing::warn!("Failed to send error to '{}': {}", connection_id, e);
    }
}
