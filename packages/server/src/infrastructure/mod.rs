//! Infrastructure layer: concrete implementations of the domain ports, plus
//! the DTOs of the HTTP and websocket protocols.

pub mod bus;
pub mod dto;
pub mod store;
