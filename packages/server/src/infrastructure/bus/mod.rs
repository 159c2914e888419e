//! Broadcast bus implementations.

pub mod websocket;

pub use websocket::WebSocketBroadcastBus;
