//! Named events exchanged between clients and the server.
//!
//! Every frame is one event, adjacently tagged so the JSON reads like
//! `{"event": "room:join", "data": "R1"}`. Event names use the
//! `scope:action[:outcome]` convention browser clients listen for.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{GameState, ParticipantId, ProgressMap, RoomId, Timestamp};

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Payload of `game:progress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub room_id: RoomId,
    pub value: f64,
}

/// Events a client sends to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Create a room and become its creator.
    #[serde(rename = "room:create")]
    CreateRoom(RoomId),

    /// Join an existing room that has not started racing.
    #[serde(rename = "room:join")]
    JoinRoom(RoomId),

    /// Leave the current room.
    #[serde(rename = "room:leave")]
    LeaveRoom(RoomId),

    /// Creator only: begin the countdown.
    #[serde(rename = "game:start")]
    StartGame(RoomId),

    /// Report typing progress.
    #[serde(rename = "game:progress")]
    Progress(ProgressUpdate),

    /// Ask for a snapshot of every room.
    #[serde(rename = "server:health")]
    Health,
}

// ---------------------------------------------------------------------------
// Outbound payloads
// ---------------------------------------------------------------------------

/// Sent once per connection so the client knows its own identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyNotice {
    pub participant_id: ParticipantId,
}

/// Confirmation of a successful room operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomNotice {
    pub room_id: RoomId,
    pub message: String,
}

/// A failed request, sent only to the connection that made it.
///
/// `code` follows HTTP conventions (400 malformed, 403 forbidden,
/// 404 not found, 409 conflicting state).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorNotice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    pub code: u16,
    pub message: String,
}

/// Current membership of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMembers {
    pub room_id: RoomId,
    pub users: Vec<ParticipantId>,
    pub creator: Option<ParticipantId>,
}

/// One room as reported by the health surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub participants: Vec<ParticipantId>,
    pub creator: Option<ParticipantId>,
    pub game_state: GameState,
    pub progress: ProgressMap,
}

/// Snapshot of the room store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: String,
    pub timestamp: Timestamp,
    pub rooms: Vec<RoomSummary>,
    pub participants: BTreeMap<ParticipantId, RoomId>,
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Events the server sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "connection:ready")]
    Ready(ReadyNotice),

    #[serde(rename = "room:create:success")]
    RoomCreated(RoomNotice),

    #[serde(rename = "room:create:error")]
    CreateFailed(ErrorNotice),

    #[serde(rename = "room:join:success")]
    RoomJoined(RoomNotice),

    #[serde(rename = "room:join:error")]
    JoinFailed(ErrorNotice),

    #[serde(rename = "room:user:joined")]
    UserJoined(RoomMembers),

    #[serde(rename = "room:user:left")]
    UserLeft(RoomMembers),

    #[serde(rename = "room:leave:error")]
    LeaveFailed(ErrorNotice),

    /// The race text, sent the moment a start is accepted.
    #[serde(rename = "game:text")]
    RaceText(String),

    /// One countdown value (3, 2, 1).
    #[serde(rename = "game:countdown")]
    Countdown(u8),

    /// The race is on; carries the stamped start time.
    #[serde(rename = "game:start")]
    RaceStarted(GameState),

    #[serde(rename = "game:start:error")]
    StartFailed(ErrorNotice),

    /// Full progress map of the room after an update.
    #[serde(rename = "game:progress")]
    ProgressUpdated(ProgressMap),

    #[serde(rename = "game:progress:error")]
    ProgressFailed(ErrorNotice),

    #[serde(rename = "server:health")]
    Health(HealthReport),

    /// A frame that could not be understood.
    #[serde(rename = "error")]
    Error(ErrorNotice),
}

impl ServerEvent {
    /// The wire name of this event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready(_) => "connection:ready",
            Self::RoomCreated(_) => "room:create:success",
            Self::CreateFailed(_) => "room:create:error",
            Self::RoomJoined(_) => "room:join:success",
            Self::JoinFailed(_) => "room:join:error",
            Self::UserJoined(_) => "room:user:joined",
            Self::UserLeft(_) => "room:user:left",
            Self::LeaveFailed(_) => "room:leave:error",
            Self::RaceText(_) => "game:text",
            Self::Countdown(_) => "game:countdown",
            Self::RaceStarted(_) => "game:start",
            Self::StartFailed(_) => "game:start:error",
            Self::ProgressUpdated(_) => "game:progress",
            Self::ProgressFailed(_) => "game:progress:error",
            Self::Health(_) => "server:health",
            Self::Error(_) => "error",
        }
    }
}
