//! Pulseband metronome server library.
//!
//! This library implements the synchronization subsystem of the Pulseband
//! shared-metronome service: the room state machine, the clock-offset
//! protocol, and the connection registry/broadcast layer that ties live
//! websocket connections to logical room membership.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// configuration
pub mod config;
