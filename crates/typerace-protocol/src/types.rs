//! Identity and shared data types that travel on the wire.
//!
//! Everything here is serialized with camelCase field names so browser
//! clients can read the JSON without translation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use typerace_transport::ConnectionId;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// The identity of one participant.
///
/// Every connection is one participant, so the value is the transport's
/// connection id. `#[serde(transparent)]` keeps it a plain number in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

impl From<ConnectionId> for ParticipantId {
    fn from(id: ConnectionId) -> Self {
        Self(id.into_inner())
    }
}

/// A client-chosen room name, e.g. `"R1"`.
///
/// Rooms are addressed by whatever string the creator picked, so this is
/// a `String` newtype rather than a generated number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Longest accepted room name, in bytes.
    pub const MAX_LEN: usize = 64;

    /// Wraps a room name without validating it.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The room name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the name is usable: not blank and at most
    /// [`MAX_LEN`](Self::MAX_LEN) bytes.
    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty() && self.0.len() <= Self::MAX_LEN
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for RoomId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

// ---------------------------------------------------------------------------
// Race data
// ---------------------------------------------------------------------------

/// Race-level state shared with every participant.
///
/// `started` flips to `true` once, when the creator's start request is
/// accepted. `start_time` stays `None` until the countdown finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub started: bool,
    pub race_text: String,
    pub start_time: Option<Timestamp>,
}

/// One participant's latest reported progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Caller-supplied value, stored as-is.
    pub value: f64,
    /// When `value` was last written (0 until the first update).
    pub last_update_time: Timestamp,
}

/// Progress of every participant in a room.
///
/// A `BTreeMap` so the serialized order is stable.
pub type ProgressMap = BTreeMap<ParticipantId, Progress>;
