//! Value objects of the metronome domain.
//!
//! Construction is the validation point: a `Tempo` is always inside the
//! playable range, a `TimeSignature` always parses as "N/D" with positive
//! integers. Identifiers are opaque newtypes so they cannot be mixed up at
//! call sites.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque unique room identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Factory for fresh room identifiers.
pub struct RoomIdFactory;

impl RoomIdFactory {
    /// Generate a fresh unique room id (hyphen-free uuid v4).
    pub fn generate() -> RoomId {
        RoomId(Uuid::new_v4().simple().to_string())
    }
}

/// Client identifier, unique within a room (not globally).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Create a client id. Empty and whitespace-only ids are rejected.
    pub fn new(value: String) -> Result<Self, String> {
        if value.trim().is_empty() {
            return Err("client_id must not be empty".to_string());
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transport connection identifier. Ephemeral: lives exactly as long as the
/// underlying websocket connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unix timestamp in UTC milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// Lower bound of the playable tempo range.
pub const TEMPO_MIN_BPM: u32 = 40;
/// Upper bound of the playable tempo range.
pub const TEMPO_MAX_BPM: u32 = 320;

/// Tempo in beats per minute, always clamped into `[40, 320]`.
///
/// Out-of-range requests are clamped rather than rejected; the range is an
/// invariant of the type, not a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Tempo(u32);

impl Tempo {
    /// Create a tempo, clamping into the playable range.
    pub fn clamped(bpm: u32) -> Self {
        Self(bpm.clamp(TEMPO_MIN_BPM, TEMPO_MAX_BPM))
    }

    pub fn bpm(&self) -> u32 {
        self.0
    }

    /// Derived beat interval in milliseconds.
    pub fn beat_interval_ms(&self) -> f64 {
        60_000.0 / f64::from(self.0)
    }
}

impl From<u32> for Tempo {
    fn from(bpm: u32) -> Self {
        Self::clamped(bpm)
    }
}

impl From<Tempo> for u32 {
    fn from(tempo: Tempo) -> Self {
        tempo.0
    }
}

/// Time signature "N/D" with positive integer numerator and denominator.
///
/// The numerator is the number of beats per measure (accent grouping); the
/// denominator is not separately modeled beyond parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSignature {
    numerator: u32,
    denominator: u32,
}

impl TimeSignature {
    /// Parse a "N/D" signature. Surrounding whitespace is tolerated.
    pub fn parse(value: &str) -> Result<Self, String> {
        let trimmed = value.trim();
        let (numerator, denominator) = trimmed
            .split_once('/')
            .ok_or_else(|| format!("invalid time signature '{value}'"))?;
        let numerator: u32 = numerator
            .trim()
            .parse()
            .map_err(|_| format!("invalid time signature '{value}'"))?;
        let denominator: u32 = denominator
            .trim()
            .parse()
            .map_err(|_| format!("invalid time signature '{value}'"))?;
        if numerator == 0 || denominator == 0 {
            return Err(format!("invalid time signature '{value}'"));
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// Common time, 4/4. The fallback signature when none is configured.
    pub fn common_time() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }

    /// Number of beats per measure.
    pub fn beats_per_measure(&self) -> u32 {
        self.numerator
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl TryFrom<String> for TimeSignature {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TimeSignature> for String {
    fn from(signature: TimeSignature) -> Self {
        signature.to_string()
    }
}
