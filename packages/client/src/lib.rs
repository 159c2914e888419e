//! Terminal client for the Pulseband shared-metronome server.

pub mod api;
pub mod domain;
pub mod error;
pub mod formatter;
pub mod runner;
pub mod scheduler;
pub mod session;
pub mod ui;
