//! Shared-metronome server implementation.

mod handler;
pub mod registry;
mod server;
mod signal;
pub mod state;

pub use server::Server;
