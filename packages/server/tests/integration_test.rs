//! Integration tests for the shared-metronome server.
//!
//! The tests serve the application router on an ephemeral port and talk to
//! it over real HTTP and WebSocket connections.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use pulseband_server::{
    config::{RoomLinkBuilder, RoomOptions, SyncOptions},
    infrastructure::{bus::WebSocketBroadcastBus, store::InMemoryRoomStore},
    ui::Server,
    usecase::{ClockSyncService, RoomCoordinator, SyncPayloadFactory},
};
use pulseband_shared::time::SystemClock;

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Serve the application on an ephemeral port; returns the bound address.
async fn spawn_server() -> std::net::SocketAddr {
    spawn_server_with_options(RoomOptions::default()).await
}

async fn spawn_server_with_options(room_options: RoomOptions) -> std::net::SocketAddr {
    let clock = Arc::new(SystemClock);
    let store = Arc::new(InMemoryRoomStore::new(clock.clone()));
    let bus = Arc::new(WebSocketBroadcastBus::new());
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

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let link_builder = RoomLinkBuilder::new(format!("http://{addr}"));

    let app = Server::new(coordinator, clock_sync, payload_factory, bus, link_builder).router();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn create_room(addr: std::net::SocketAddr, body: Value) -> Value {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{addr}/api/rooms"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    response.json().await.unwrap()
}

async fn connect_ws(addr: std::net::SocketAddr) -> WsClient {
    let (socket, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    socket
}

async fn send_json(socket: &mut WsClient, value: Value) {
    socket
        .send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

/// Receive the next text frame as JSON.
async fn recv_json(socket: &mut WsClient) -> Value {
    loop {
        let msg = tokio::time::timeout(std::time::Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn join(socket: &mut WsClient, room_id: &str, client_id: &str) -> Value {
    send_json(
        socket,
        json!({
            "type": "join_room",
            "room_id": room_id,
            "client_id": client_id,
            "display_name": client_id,
        }),
    )
    .await;
    let snapshot = recv_json(socket).await;
    assert_eq!(snapshot["type"], "room_snapshot");
    snapshot
}

#[tokio::test]
async fn test_health_check() {
    // given:
    let addr = spawn_server().await;

    // when:
    let response = reqwest::get(format!("http://{addr}/api/health"))
        .await
        .unwrap();

    // then:
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_and_get_room() {
    // given:
    let addr = spawn_server().await;

    // when:
    let created = create_room(addr, json!({"tempo_bpm": 90, "time_signature": "3/4"})).await;

    // then:
    assert_eq!(created["tempo_bpm"], 90);
    assert_eq!(created["time_signature"], "3/4");
    assert_eq!(created["status"], "stopped");
    let room_id = created["room_id"].as_str().unwrap();
    assert!(created["invite_url"]
        .as_str()
        .unwrap()
        .ends_with(&format!("/rooms/{room_id}")));

    let fetched: Value = reqwest::get(format!("http://{addr}/api/rooms/{room_id}"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["room_id"], *room_id);
    assert_eq!(fetched["tempo_bpm"], 90);
}

#[tokio::test]
async fn test_create_room_applies_defaults() {
    // given:
    let addr = spawn_server().await;

    // when: no tempo, unparseable signature
    let created = create_room(addr, json!({"time_signature": "waltz"})).await;

    // then: defaults applied instead of rejection
    assert_eq!(created["tempo_bpm"], 120);
    assert_eq!(created["time_signature"], "4/4");
}

#[tokio::test]
async fn test_get_unknown_room_returns_404() {
    // given:
    let addr = spawn_server().await;

    // when:
    let response = reqwest::get(format!("http://{addr}/api/rooms/nope"))
        .await
        .unwrap();

    // then:
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_room() {
    // given:
    let addr = spawn_server().await;
    let created = create_room(addr, json!({})).await;
    let room_id = created["room_id"].as_str().unwrap();
    let client = reqwest::Client::new();

    // when:
    let deleted = client
        .delete(format!("http://{addr}/api/rooms/{room_id}"))
        .send()
        .await
        .unwrap();

    // then: gone, and a second delete reports not found
    assert_eq!(deleted.status(), reqwest::StatusCode::NO_CONTENT);
    let again = client
        .delete(format!("http://{addr}/api/rooms/{room_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_join_receives_snapshot_and_peers_are_notified() {
    // given:
    let addr = spawn_server().await;
    let created = create_room(addr, json!({})).await;
    let room_id = created["room_id"].as_str().unwrap();

    let mut alice = connect_ws(addr).await;
    let alice_snapshot = join(&mut alice, room_id, "alice").await;
    assert_eq!(alice_snapshot["participants"].as_array().unwrap().len(), 1);

    // when: bob joins the same room
    let mut bob = connect_ws(addr).await;
    let bob_snapshot = join(&mut bob, room_id, "bob").await;

    // then: bob's snapshot lists both, alice is notified of bob
    assert_eq!(bob_snapshot["participants"].as_array().unwrap().len(), 2);
    let joined = recv_json(&mut alice).await;
    assert_eq!(joined["type"], "participant_joined");
    assert_eq!(joined["participant"]["client_id"], "bob");
}

#[tokio::test]
async fn test_command_before_join_is_rejected() {
    // given:
    let addr = spawn_server().await;
    let mut socket = connect_ws(addr).await;

    // when: start requested on a fresh connection
    send_json(&mut socket, json!({"type": "request_metronome_start"})).await;

    // then:
    let error = recv_json(&mut socket).await;
    assert_eq!(error["type"], "error");
}

#[tokio::test]
async fn test_join_full_room_is_rejected() {
    // given: a room that holds a single participant
    let addr = spawn_server_with_options(RoomOptions {
        max_participants: 1,
        ..RoomOptions::default()
    })
    .await;
    let created = create_room(addr, json!({})).await;
    let room_id = created["room_id"].as_str().unwrap();

    let mut alice = connect_ws(addr).await;
    join(&mut alice, room_id, "alice").await;

    // when:
    let mut bob = connect_ws(addr).await;
    send_json(
        &mut bob,
        json!({"type": "join_room", "room_id": room_id, "client_id": "bob"}),
    )
    .await;

    // then: bob gets an error instead of a snapshot
    let error = recv_json(&mut bob).await;
    assert_eq!(error["type"], "error");

    // but alice can re-join under her existing id
    send_json(
        &mut alice,
        json!({"type": "join_room", "room_id": room_id, "client_id": "alice"}),
    )
    .await;
    let snapshot = recv_json(&mut alice).await;
    assert_eq!(snapshot["type"], "room_snapshot");
}

#[tokio::test]
async fn test_metronome_start_broadcasts_sync_payload() {
    // given:
    let addr = spawn_server().await;
    let created = create_room(addr, json!({"tempo_bpm": 120})).await;
    let room_id = created["room_id"].as_str().unwrap();

    let mut alice = connect_ws(addr).await;
    join(&mut alice, room_id, "alice").await;
    let mut bob = connect_ws(addr).await;
    join(&mut bob, room_id, "bob").await;
    recv_json(&mut alice).await; // participant_joined for bob

    // when:
    send_json(&mut alice, json!({"type": "request_metronome_start"})).await;

    // then: both members receive the same payload, start in the future
    let alice_start = recv_json(&mut alice).await;
    let bob_start = recv_json(&mut bob).await;
    assert_eq!(alice_start["type"], "metronome_start");
    assert_eq!(alice_start["payload"], bob_start["payload"]);
    let payload = &alice_start["payload"];
    assert_eq!(payload["tempo_bpm"], 120);
    assert_eq!(payload["beat_interval_ms"], 500.0);
    assert!(payload["start_at_utc"].as_i64().unwrap() > payload["server_timestamp_utc"].as_i64().unwrap());
}

#[tokio::test]
async fn test_tempo_change_is_clamped_and_broadcast() {
    // given:
    let addr = spawn_server().await;
    let created = create_room(addr, json!({})).await;
    let room_id = created["room_id"].as_str().unwrap();

    let mut alice = connect_ws(addr).await;
    join(&mut alice, room_id, "alice").await;

    // when: request far above the playable range
    send_json(
        &mut alice,
        json!({"type": "request_tempo_change", "tempo_bpm": 999}),
    )
    .await;

    // then:
    let changed = recv_json(&mut alice).await;
    assert_eq!(changed["type"], "tempo_changed");
    assert_eq!(changed["room"]["tempo_bpm"], 320);
}

#[tokio::test]
async fn test_invalid_time_signature_change_is_rejected() {
    // given:
    let addr = spawn_server().await;
    let created = create_room(addr, json!({})).await;
    let room_id = created["room_id"].as_str().unwrap();

    let mut alice = connect_ws(addr).await;
    join(&mut alice, room_id, "alice").await;

    // when:
    send_json(
        &mut alice,
        json!({"type": "request_time_signature_change", "time_signature": "waltz"}),
    )
    .await;

    // then: the caller gets an error, the room keeps its signature
    let error = recv_json(&mut alice).await;
    assert_eq!(error["type"], "error");

    let fetched: Value = reqwest::get(format!("http://{addr}/api/rooms/{room_id}"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["time_signature"], "4/4");
}

#[tokio::test]
async fn test_set_instrument_broadcasts_update() {
    // given:
    let addr = spawn_server().await;
    let created = create_room(addr, json!({})).await;
    let room_id = created["room_id"].as_str().unwrap();

    let mut alice = connect_ws(addr).await;
    join(&mut alice, room_id, "alice").await;

    // when:
    send_json(
        &mut alice,
        json!({"type": "set_instrument", "instrument_id": "bass", "display_name": "Alice B."}),
    )
    .await;

    // then:
    let updated = recv_json(&mut alice).await;
    assert_eq!(updated["type"], "participant_updated");
    assert_eq!(updated["participant"]["instrument_id"], "bass");
    assert_eq!(updated["participant"]["display_name"], "Alice B.");
}

#[tokio::test]
async fn test_ping_answers_with_server_time() {
    // given:
    let addr = spawn_server().await;
    let created = create_room(addr, json!({})).await;
    let room_id = created["room_id"].as_str().unwrap();

    let mut alice = connect_ws(addr).await;
    join(&mut alice, room_id, "alice").await;

    // when:
    send_json(
        &mut alice,
        json!({"type": "ping", "client_sent_timestamp_ms": 1_700_000_000_000i64}),
    )
    .await;

    // then:
    let response = recv_json(&mut alice).await;
    assert_eq!(response["type"], "clock_sync_response");
    assert!(response["server_timestamp_utc"].as_i64().unwrap() > 0);
    assert_eq!(response["max_drift_ms"], 3);
}

#[tokio::test]
async fn test_disconnect_notifies_remaining_members() {
    // given:
    let addr = spawn_server().await;
    let created = create_room(addr, json!({})).await;
    let room_id = created["room_id"].as_str().unwrap();

    let mut alice = connect_ws(addr).await;
    join(&mut alice, room_id, "alice").await;
    let mut bob = connect_ws(addr).await;
    join(&mut bob, room_id, "bob").await;
    recv_json(&mut alice).await; // participant_joined for bob

    // when: bob's socket closes without an explicit leave
    bob.close(None).await.unwrap();

    // then:
    let left = recv_json(&mut alice).await;
    assert_eq!(left["type"], "participant_left");
    assert_eq!(left["client_id"], "bob");
}

#[tokio::test]
async fn test_leave_room_notifies_remaining_members() {
    // given:
    let addr = spawn_server().await;
    let created = create_room(addr, json!({})).await;
    let room_id = created["room_id"].as_str().unwrap();

    let mut alice = connect_ws(addr).await;
    join(&mut alice, room_id, "alice").await;
    let mut bob = connect_ws(addr).await;
    join(&mut bob, room_id, "bob").await;
    recv_json(&mut alice).await; // participant_joined for bob

    // when:
    send_json(&mut bob, json!({"type": "leave_room"})).await;

    // then:
    let left = recv_json(&mut alice).await;
    assert_eq!(left["type"], "participant_left");
    assert_eq!(left["client_id"], "bob");
}
