//! WebSocket-backed broadcast bus.
//!
//! Holds each connection's outbound `UnboundedSender` plus the room-group
//! membership sets. Socket creation happens in the ui layer; this
//! implementation only manages senders and delivers messages, so "accepting
//! a websocket" and "pushing a message" stay separated.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{BroadcastBus, ConnectionId, PushError, PusherChannel, RoomId};

#[derive(Default)]
struct BusState {
    /// Outbound channel per live connection.
    senders: HashMap<ConnectionId, PusherChannel>,
    /// Room group membership: room id -> connection ids.
    groups: HashMap<RoomId, HashSet<ConnectionId>>,
}

/// WebSocket-backed `BroadcastBus` implementation.
#[derive(Default)]
pub struct WebSocketBroadcastBus {
    state: Mutex<BusState>,
}

impl WebSocketBroadcastBus {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BroadcastBus for WebSocketBroadcastBus {
    async fn register_connection(&self, connection_id: ConnectionId, sender: PusherChannel) {
        let mut state = self.state.lock().await;
        state.senders.insert(connection_id.clone(), sender);
        tracing::debug!("Connection '{}' registered on the bus", connection_id);
    }

    async fn unregister_connection(&self, connection_id: &ConnectionId) {
        let mut state = self.state.lock().await;
        state.senders.remove(connection_id);
        for members in state.groups.values_mut() {
            members.remove(connection_id);
        }
        state.groups.retain(|_, members| !members.is_empty());
        tracing::debug!("Connection '{}' unregistered from the bus", connection_id);
    }

    async fn join_group(&self, connection_id: &ConnectionId, room_id: &RoomId) {
        let mut state = self.state.lock().await;
        state
            .groups
            .entry(room_id.clone())
            .or_default()
            .insert(connection_id.clone());
    }

    async fn leave_group(&self, connection_id: &ConnectionId, room_id: &RoomId) {
        let mut state = self.state.lock().await;
        if let Some(members) = state.groups.get_mut(room_id) {
            members.remove(connection_id);
            if members.is_empty() {
                state.groups.remove(room_id);
            }
        }
    }

    async fn send_to_group(&self, room_id: &RoomId, message: &str) {
        let state = self.state.lock().await;
        let members = match state.groups.get(room_id) {
            Some(members) => members,
            None => return,
        };
        for member in members {
            match state.senders.get(member) {
                Some(sender) => {
                    // Broadcast tolerates per-target failures.
                    if let Err(e) = sender.send(message.to_string()) {
                        tracing::warn!(
                            "Failed to push message to connection '{}': {}",
                            member,
                            e
                        );
                    }
                }
                None => {
                    tracing::warn!(
                        "Connection '{}' in group '{}' has no sender, skipping",
                        member,
                        room_id
                    );
                }
            }
        }
    }

    async fn send_to_caller(
        &self,
        connection_id: &ConnectionId,
        message: &str,
    ) -> Result<(), PushError> {
        let state = self.state.lock().await;
        let sender = state
            .senders
            .get(connection_id)
            .ok_or_else(|| PushError::ConnectionNotFound(connection_id.as_str().to_string()))?;
        sender
            .send(message.to_string())
            .map_err(|e| PushError::PushFailed(e.to_string()))
    }

    async fn send_to_others(&self, connection_id: &ConnectionId, room_id: &RoomId, message: &str) {
        let state = self.state.lock().await;
        let members = match state.groups.get(room_id) {
            Some(members) => members,
            None => return,
        };
        for member in members {
            if member == connection_id {
                continue;
            }
            if let Some(sender) = state.senders.get(member) {
                if let Err(e) = sender.send(message.to_string()) {
                    tracing::warn!(
                        "Failed to push message to connection '{}': {}",
                        member,
                        e
                    );
                }
            }
        }
    }
}
