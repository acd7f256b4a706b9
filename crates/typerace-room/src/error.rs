//! Error types for the room layer.

use typerace_protocol::{ParticipantId, RoomId};

/// Errors that can occur during room operations.
///
/// Every failure is reported before anything is mutated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// A room with this id already exists.
    #[error("room {0} already exists")]
    Conflict(RoomId),

    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The participant has no progress entry in the room.
    #[error("participant {0} not found in room {1}")]
    ParticipantNotFound(ParticipantId, RoomId),

    /// The participant is not in any room.
    #[error("participant {0} is not in a room")]
    NotInRoom(ParticipantId),

    /// The room has left the lobby and no longer takes joins.
    #[error("game in room {0} is already in progress")]
    GameInProgress(RoomId),

    /// Only the creator may start the race.
    #[error("participant {participant} is not the creator of room {room_id}")]
    Unauthorized {
        participant: ParticipantId,
        room_id: RoomId,
    },

    /// The race was already started once.
    #[error("game in room {0} has already been started")]
    AlreadyStarted(RoomId),

    /// The participant already occupies another room.
    #[error("participant {0} is already in room {1}")]
    AlreadyInRoom(ParticipantId, RoomId),
}

impl RoomError {
    /// HTTP-style status code for error payloads.
    pub fn code(&self) -> u16 {
        match self {
            Self::NotFound(_) | Self::ParticipantNotFound(..) | Self::NotInRoom(_) => 404,
            Self::Unauthorized { .. } => 403,
            Self::Conflict(_)
            | Self::GameInProgress(_)
            | Self::AlreadyStarted(_)
            | Self::AlreadyInRoom(..) => 409,
        }
    }

    /// The room the error is about, if there is one.
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            Self::Conflict(id)
            | Self::NotFound(id)
            | Self::ParticipantNotFound(_, id)
            | Self::GameInProgress(id)
            | Self::AlreadyStarted(id)
            | Self::AlreadyInRoom(_, id) => Some(id),
            Self::Unauthorized { room_id, .. } => Some(room_id),
            Self::NotInRoom(_) => None,
        }
    }
}
