//! WebSocket client session management.
//!
//! One session is one websocket connection: join the room, relay typed
//! commands to the server, drive the local beat scheduler from server
//! events, and keep the clock offset fresh with periodic pings.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use pulseband_server::infrastructure::dto::websocket::{
    ClientCommand, ClockSyncResponseMessage, ErrorMessage, MetronomeStartMessage,
    MetronomeStopMessage, ParticipantJoinedMessage, ParticipantLeftMessage,
    ParticipantUpdatedMessage, RoomSnapshotMessage, RoomStateDto, TempoChangedMessage,
    TimeSignatureChangedMessage,
};
use pulseband_shared::time::{get_utc_timestamp, SystemClock};

use crate::{
    domain::{beats_per_measure_of, clock_offset_ms, needs_drift_correction},
    error::ClientError,
    formatter::MessageFormatter,
    scheduler::{BeatScheduler, BeatTrack},
    ui::{parse_command, redisplay_prompt, UserCommand, USAGE},
};

/// Connection parameters of one client session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ws_url: String,
    pub room_id: String,
    pub client_id: String,
    pub display_name: String,
    pub heartbeat_interval_ms: u64,
}

/// How a session ended, decides whether the runner reconnects.
enum SessionEnd {
    ConnectionLost,
    Rejected(String),
}

fn encode<T: Serialize>(command: &T) -> String {
    serde_json::to_string(command).unwrap()
}

/// Run one WebSocket client session until quit, disconnect, or rejection.
pub async fn run_client_session(config: &SessionConfig) -> Result<(), ClientError> {
    let (ws_stream, _response) = connect_async(&config.ws_url)
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;

    tracing::info!("Connected to {}", config.ws_url);
    println!(
        "\nYou are '{}' in room '{}'. {}\n",
        config.client_id, config.room_id, USAGE
    );

    let (mut write, mut read) = ws_stream.split();

    // Single writer task: everything outbound funnels through one channel
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let write_task = tokio::spawn(async move {
        while let Some(json) = outbound_rx.recv().await {
            if write.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Join first; every later command relies on the server-side binding
    let join = ClientCommand::JoinRoom {
        room_id: config.room_id.clone(),
        client_id: config.client_id.clone(),
        display_name: Some(config.display_name.clone()),
        capabilities: None,
    };
    outbound_tx
        .send(encode(&join))
        .map_err(|_| ClientError::ConnectionError("connection closed during join".to_string()))?;

    // Local beat scheduler fed by server events
    let scheduler = Arc::new(BeatScheduler::new(Arc::new(SystemClock)));
    let mut beats = scheduler.subscribe();
    let client_id_for_beats = config.client_id.clone();
    let beat_task = tokio::spawn(async move {
        while let Some(beat) = beats.recv().await {
            print!("\n{}", MessageFormatter::format_beat(&beat));
            redisplay_prompt(&client_id_for_beats);
        }
    });

    // Periodic clock-sync pings
    let ping_tx = outbound_tx.clone();
    let heartbeat = Duration::from_millis(config.heartbeat_interval_ms);
    let ping_task = tokio::spawn(async move {
        loop {
            tokio::time::sleep(heartbeat).await;
            let ping = ClientCommand::Ping {
                client_sent_timestamp_ms: get_utc_timestamp(),
            };
            if ping_tx.send(encode(&ping)).is_err() {
                break;
            }
        }
    });

    // Inbound event loop
    let scheduler_for_read = scheduler.clone();
    let client_id_for_read = config.client_id.clone();
    let mut read_task = tokio::spawn(async move {
        let mut joined = false;
        let mut applied_offset_ms = 0.0;
        let mut max_drift_ms = 3u32;

        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    match handle_server_event(
                        &text,
                        &scheduler_for_read,
                        &client_id_for_read,
                        &mut joined,
                        &mut applied_offset_ms,
                        &mut max_drift_ms,
                    ) {
                        Ok(()) => {}
                        Err(rejection) => return SessionEnd::Rejected(rejection),
                    }
                    redisplay_prompt(&client_id_for_read);
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Server closed the connection");
                    break;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    break;
                }
                _ => {}
            }
        }
        SessionEnd::ConnectionLost
    });

    // Blocking thread for rustyline (synchronous readline)
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    let prompt = format!("{}> ", config.client_id);
    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    // Map typed input to wire commands; ends on quit or readline exit
    let command_tx = outbound_tx.clone();
    let display_name = config.display_name.clone();
    let mut command_task = tokio::spawn(async move {
        while let Some(line) = input_rx.recv().await {
            let command = match parse_command(&line) {
                Ok(command) => command,
                Err(e) => {
                    println!("{}\n{}", e, USAGE);
                    continue;
                }
            };
            let wire_command = match command {
                UserCommand::Start => ClientCommand::RequestMetronomeStart,
                UserCommand::Stop => ClientCommand::RequestMetronomeStop,
                UserCommand::Tempo(tempo_bpm) => ClientCommand::RequestTempoChange { tempo_bpm },
                UserCommand::TimeSignature(time_signature) => {
                    ClientCommand::RequestTimeSignatureChange { time_signature }
                }
                UserCommand::Instrument(instrument_id) => ClientCommand::SetInstrument {
                    instrument_id,
                    display_name: display_name.clone(),
                },
                UserCommand::Leave => ClientCommand::LeaveRoom,
                UserCommand::Help => {
                    println!("{}", USAGE);
                    continue;
                }
                UserCommand::Quit => break,
            };
            if command_tx.send(encode(&wire_command)).is_err() {
                break;
            }
        }
    });

    let result = tokio::select! {
        end = &mut read_task => {
            command_task.abort();
            match end {
                Ok(SessionEnd::Rejected(reason)) => Err(ClientError::JoinRejected(reason)),
                _ => Err(ClientError::ConnectionError("connection lost".to_string())),
            }
        }
        _ = &mut command_task => {
            read_task.abort();
            tracing::info!("Client session ended by user");
            Ok(())
        }
    };

    scheduler.stop();
    ping_task.abort();
    beat_task.abort();
    write_task.abort();

    result
}

/// Dispatch one inbound server event. Returns `Err` with the server's reason
/// only for a rejection that arrived before the join was confirmed.
fn handle_server_event(
    text: &str,
    scheduler: &BeatScheduler,
    client_id: &str,
    joined: &mut bool,
    applied_offset_ms: &mut f64,
    max_drift_ms: &mut u32,
) -> Result<(), String> {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => {
            print!("{}", MessageFormatter::format_raw_message(text));
            return Ok(());
        }
    };

    // Shapes overlap between event types, so dispatch on the discriminant
    // before parsing the full message
    match value["type"].as_str().unwrap_or_default() {
        "room_snapshot" => {
            if let Ok(msg) = serde_json::from_str::<RoomSnapshotMessage>(text) {
                *joined = true;
                print!(
                    "{}",
                    MessageFormatter::format_room_snapshot(
                        &msg.room,
                        &msg.participants,
                        &msg.invite_url,
                        client_id,
                    )
                );
                // Joining mid-performance: fall in with the running grid
                sync_scheduler_to_room(scheduler, &msg.room);
            }
        }
        "participant_joined" => {
            if let Ok(msg) = serde_json::from_str::<ParticipantJoinedMessage>(text) {
                print!("{}", MessageFormatter::format_participant_joined(&msg.participant));
            }
        }
        "participant_left" => {
            if let Ok(msg) = serde_json::from_str::<ParticipantLeftMessage>(text) {
                print!("{}", MessageFormatter::format_participant_left(&msg.client_id));
            }
        }
        "participant_updated" => {
            if let Ok(msg) = serde_json::from_str::<ParticipantUpdatedMessage>(text) {
                print!("{}", MessageFormatter::format_participant_updated(&msg.participant));
            }
        }
        "metronome_start" => {
            if let Ok(msg) = serde_json::from_str::<MetronomeStartMessage>(text) {
                print!("{}", MessageFormatter::format_metronome_started(&msg.payload));
                scheduler.start(BeatTrack {
                    start_at_utc: msg.payload.start_at_utc,
                    beat_interval_ms: msg.payload.beat_interval_ms,
                    beats_per_measure: beats_per_measure_of(&msg.payload.time_signature),
                });
            }
        }
        "metronome_stop" => {
            if serde_json::from_str::<MetronomeStopMessage>(text).is_ok() {
                print!("{}", MessageFormatter::format_metronome_stopped());
                scheduler.stop();
            }
        }
        "tempo_changed" => {
            if let Ok(msg) = serde_json::from_str::<TempoChangedMessage>(text) {
                print!("{}", MessageFormatter::format_tempo_changed(&msg.room));
                sync_scheduler_to_room(scheduler, &msg.room);
            }
        }
        "time_signature_changed" => {
            if let Ok(msg) = serde_json::from_str::<TimeSignatureChangedMessage>(text) {
                print!("{}", MessageFormatter::format_time_signature_changed(&msg.room));
                sync_scheduler_to_room(scheduler, &msg.room);
            }
        }
        "clock_sync_response" => {
            if let Ok(msg) = serde_json::from_str::<ClockSyncResponseMessage>(text) {
                *max_drift_ms = msg.max_drift_ms;
                let sampled = clock_offset_ms(msg.server_timestamp_utc, get_utc_timestamp());
                if needs_drift_correction(*applied_offset_ms, sampled, *max_drift_ms) {
                    tracing::debug!(
                        "Correcting clock offset: {:.1} ms -> {:.1} ms",
                        applied_offset_ms,
                        sampled
                    );
                    scheduler.apply_drift_correction(sampled);
                    *applied_offset_ms = sampled;
                }
            }
        }
        "error" => {
            if let Ok(msg) = serde_json::from_str::<ErrorMessage>(text) {
                if !*joined {
                    return Err(msg.message);
                }
                print!("{}", MessageFormatter::format_error(&msg.message));
            }
        }
        _ => {
            print!("{}", MessageFormatter::format_raw_message(text));
        }
    }
    Ok(())
}

/// Restart the scheduler on the room's grid when the room is mid-performance,
/// stop it otherwise.
fn sync_scheduler_to_room(scheduler: &BeatScheduler, room: &RoomStateDto) {
    if room.status != "running" {
        scheduler.stop();
        return;
    }
    if let Some(start_at_utc) = room.scheduled_start_at {
        scheduler.start(BeatTrack {
            start_at_utc,
            beat_interval_ms: room.beat_interval_ms,
            beats_per_measure: beats_per_measure_of(&room.time_signature),
        });
    }
}
