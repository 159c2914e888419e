//! Domain logic for client-side operations.
//!
//! This module contains pure functions that implement business logic
//! without side effects, making them easy to test.

use crate::error::ClientError;

/// Estimate the client/server clock offset from a clock-sync response.
///
/// Positive means the server clock is ahead of the local clock. This is a
/// single-sample estimate; the one-way network delay is absorbed as error.
pub fn clock_offset_ms(server_timestamp_utc: i64, client_now_ms: i64) -> f64 {
    (server_timestamp_utc - client_now_ms) as f64
}

/// Whether a fresh offset sample differs enough from the applied one to be
/// worth a scheduler correction.
pub fn needs_drift_correction(applied_offset_ms: f64, sampled_offset_ms: f64, max_drift_ms: u32) -> bool {
    (sampled_offset_ms - applied_offset_ms).abs() > f64::from(max_drift_ms)
}

/// Number of beats per measure announced by a "N/D" time signature.
///
/// The wire value comes from the server, which validates signatures, so a
/// malformed one falls back to common time instead of failing the session.
pub fn beats_per_measure_of(time_signature: &str) -> u32 {
    time_signature
        .split('/')
        .next()
        .and_then(|numerator| numerator.trim().parse().ok())
        .filter(|&n| n > 0)
        .unwrap_or(4)
}

/// Check if the client should exit immediately based on the error type.
///
/// A rejected join will be rejected again on reconnect, so retrying is
/// pointless.
pub fn should_exit_immediately(error: &ClientError) -> bool {
    matches!(error, ClientError::JoinRejected(_))
}

/// Check if the client should attempt to reconnect.
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    if should_exit_immediately(error) {
        return false;
    }
    current_attempt < max_attempts
}
