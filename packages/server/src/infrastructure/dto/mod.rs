//! Data Transfer Objects for the metronome service.
//!
//! DTOs are organized by protocol:
//! - `websocket`: realtime event and command DTOs
//! - `http`: HTTP API request/response DTOs

pub mod conversion;
pub mod http;
pub mod websocket;
