//! Race start sequencing: validate a start request, then run the
//! countdown as a tick plan in its own task.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use typerace_protocol::{ParticipantId, RoomId, ServerEvent};
use typerace_tick::{Clock, TickScheduler};

use crate::{GamePhase, Room, RoomError, SequencerConfig, SharedRoomStore, TextSource};

/// Payload of one step in the start sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceSignal {
    /// Send the race text.
    Text,
    /// Send one countdown value.
    Countdown(u8),
    /// Stamp the start time and send `game:start`.
    Launch,
}

/// Delivers an event to everyone currently in a room.
///
/// Countdown ticks only know the room id; the implementation resolves the
/// audience at the moment of sending. An empty or unknown room receives
/// nothing.
pub trait RoomBroadcast: Send + Sync + 'static {
    fn broadcast(&self, room_id: &RoomId, event: ServerEvent) -> impl Future<Output = ()> + Send;
}

/// An accepted start request.
#[derive(Debug)]
pub struct StartedGame {
    /// The room right after the start was accepted.
    pub room: Room,
    /// The countdown task. Dropping the handle does not stop it.
    pub countdown: JoinHandle<()>,
}

/// Moves rooms from the lobby into a race.
pub struct GameSequencer<B, S> {
    store: SharedRoomStore,
    broadcaster: Arc<B>,
    text_source: S,
    clock: Arc<dyn Clock>,
    config: SequencerConfig,
}

impl<B: RoomBroadcast, S: TextSource> GameSequencer<B, S> {
    pub fn new(
        store: SharedRoomStore,
        broadcaster: Arc<B>,
        text_source: S,
        clock: Arc<dyn Clock>,
        config: SequencerConfig,
    ) -> Self {
        Self {
            store,
            broadcaster,
            text_source,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Accepts a start request from the room's creator and schedules the
    /// countdown.
    ///
    /// The race text goes out immediately, followed by the countdown values
    /// and finally `game:start` with the stamped start time. Once accepted
    /// the sequence always runs to the end; each step looks the room up
    /// again and sends nothing if it has gone.
    ///
    /// # Errors
    /// `NotFound` if the room is absent, `Unauthorized` if `requester` is
    /// not the creator, `AlreadyStarted` if the room has left the lobby.
    /// A rejected request changes nothing.
    pub async fn start_game(
        &self,
        room_id: &RoomId,
        requester: ParticipantId,
    ) -> Result<StartedGame, RoomError> {
        let (room, scheduler) = {
            let mut store = self.store.lock().await;
            let room = store
                .room_mut(room_id)
                .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

            if !room.is_creator(requester) {
                tracing::debug!(%room_id, participant = %requester, "start rejected: not creator");
                return Err(RoomError::Unauthorized {
                    participant: requester,
                    room_id: room_id.clone(),
                });
            }
            if room.phase() != GamePhase::Lobby {
                tracing::debug!(%room_id, phase = %room.phase(), "start rejected: already started");
                return Err(RoomError::AlreadyStarted(room_id.clone()));
            }

            room.begin_countdown(self.text_source.next_text())?;
            tracing::info!(%room_id, participant = %requester, epoch = room.epoch(), "race accepted");

            // Anchored here so the first delay counts from acceptance.
            (room.clone(), TickScheduler::new(self.config.plan()))
        };

        let countdown = tokio::spawn(run_countdown(
            Arc::clone(&self.store),
            Arc::clone(&self.broadcaster),
            Arc::clone(&self.clock),
            room.room_id().clone(),
            room.epoch(),
            scheduler,
        ));

        Ok(StartedGame { room, countdown })
    }
}

/// Walks the plan, re-reading the room before every step.
async fn run_countdown<B: RoomBroadcast>(
    store: SharedRoomStore,
    broadcaster: Arc<B>,
    clock: Arc<dyn Clock>,
    room_id: RoomId,
    epoch: u64,
    mut scheduler: TickScheduler<RaceSignal>,
) {
    while let Some(tick) = scheduler.next_tick().await {
        let event = {
            let mut store = store.lock().await;
            let Some(room) = store.room_mut(&room_id).filter(|room| room.epoch() == epoch) else {
                tracing::debug!(%room_id, tick = tick.tick, "room gone, tick dropped");
                continue;
            };

            match tick.payload {
                RaceSignal::Text => ServerEvent::RaceText(room.game_state().race_text.clone()),
                RaceSignal::Countdown(n) => ServerEvent::Countdown(n),
                RaceSignal::Launch => {
                    let at = clock.now_millis();
                    if room.launch(at) {
                        tracing::info!(%room_id, start_time = at, "race launched");
                    }
                    ServerEvent::RaceStarted(room.game_state().clone())
                }
            }
        };

        tracing::trace!(%room_id, tick = tick.tick, event = event.name(), "countdown step");
        broadcaster.broadcast(&room_id, event).await;
    }
}
