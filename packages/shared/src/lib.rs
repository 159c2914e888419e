//! Shared building blocks for the Pulseband metronome service.
//!
//! Both the server and the CLI client depend on this crate for the clock
//! abstraction and tracing setup.

pub mod logger;
pub mod time;
