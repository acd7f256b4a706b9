//! # Typerace
//!
//! A real-time typing race server. Browsers connect over WebSocket,
//! create or join named rooms, and the room's creator starts a race that
//! counts down in lockstep for everyone in it. Progress reports are
//! relayed to the whole room as they arrive.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use typerace::prelude::*;
//!
//! # async fn run() -> Result<(), TyperaceError> {
//! let server = TyperaceServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```
//!
//! ## Layers
//!
//! ```text
//! transport (frames) → protocol (events) → router → room store / sequencer
//! ```

mod broadcast;
mod error;
mod handler;
mod router;
mod server;

pub use broadcast::{HubBroadcaster, SharedHub};
pub use error::TyperaceError;
pub use router::Router;
pub use server::{TyperaceServer, TyperaceServerBuilder, DEFAULT_BIND};

pub mod prelude {
    pub use crate::{Router, TyperaceError, TyperaceServer, TyperaceServerBuilder};
    pub use typerace_protocol::{ClientEvent, ParticipantId, RoomId, ServerEvent};
    pub use typerace_room::{FixedText, SentencePool, SequencerConfig, TextSource};
    pub use typerace_tick::{Clock, ManualClock, SystemClock, TokioClock};
}
