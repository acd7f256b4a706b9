//! Wire protocol for Typerace.
//!
//! This crate defines the "language" that browsers and the server speak:
//!
//! - **Identities** ([`ParticipantId`], [`RoomId`], [`Timestamp`]).
//! - **Shared data** ([`GameState`], [`Progress`]) — the parts of a room
//!   that are sent to clients verbatim.
//! - **Events** ([`ClientEvent`], [`ServerEvent`]) — named messages with a
//!   payload, framed as `{"event": "...", "data": ...}`.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer sits between transport (raw frames) and the room
//! layer. It knows nothing about connections or room rules.
//!
//! ```text
//! Transport (frames) → Protocol (events) → Room (state machine)
//! ```

mod codec;
mod error;
mod events;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{
    ClientEvent, ErrorNotice, HealthReport, ProgressUpdate, ReadyNotice, RoomMembers,
    RoomNotice, RoomSummary, ServerEvent,
};
pub use types::{GameState, ParticipantId, Progress, ProgressMap, RoomId, Timestamp};
