//! Room lifecycle and race start sequencing for Typerace.
//!
//! [`RoomStore`] is the single owner of every room and of the reverse
//! index from participant to room. [`GameSequencer`] drives a room from
//! lobby to racing: it accepts the creator's start request once, then
//! runs the countdown as a [`TickPlan`](typerace_tick::TickPlan) in a
//! background task.
//!
//! # Key types
//!
//! - [`RoomStore`] — create/join/leave/progress, the participant registry
//! - [`Room`] — one room's participants, progress, creator, and race state
//! - [`GamePhase`] — `Lobby → Starting → Racing`
//! - [`GameSequencer`] — start validation and the countdown task
//! - [`RoomBroadcast`] — how countdown ticks reach a room's members
//! - [`TextSource`] — where race text comes from

mod config;
mod error;
mod room;
mod sequencer;
mod store;
mod text;

pub use config::{GamePhase, SequencerConfig};
pub use error::RoomError;
pub use room::Room;
pub use sequencer::{GameSequencer, RaceSignal, RoomBroadcast, StartedGame};
pub use store::{RoomStore, SharedRoomStore, StoreSnapshot};
pub use text::{FixedText, SentencePool, TextSource};
