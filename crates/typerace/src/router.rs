//! Turns client events into store operations and outbound events.
//!
//! Lock order is store, then hub, never the reverse. Handlers that change
//! room membership keep the store guard until the hub group matches, so a
//! countdown tick can never find a member that the hub would skip. Other
//! handlers drop the store guard before touching the hub.

use std::sync::Arc;

use tokio::sync::Mutex;
use typerace_protocol::{
    ClientEvent, ErrorNotice, HealthReport, ParticipantId, ProgressUpdate, ReadyNotice, RoomId,
    RoomNotice, ServerEvent,
};
use typerace_room::{
    GameSequencer, RoomError, RoomStore, SequencerConfig, SharedRoomStore, TextSource,
};
use typerace_tick::Clock;
use typerace_transport::{BroadcastHub, MemberSender};

use crate::broadcast::{HubBroadcaster, SharedHub};

/// Builds an error event of the given kind.
type FailureKind = fn(ErrorNotice) -> ServerEvent;

/// Routes events for every connection of one server.
pub struct Router {
    store: SharedRoomStore,
    hub: SharedHub,
    sequencer: GameSequencer<HubBroadcaster, Box<dyn TextSource>>,
    clock: Arc<dyn Clock>,
}

impl Router {
    pub fn new(
        config: SequencerConfig,
        text_source: Box<dyn TextSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = RoomStore::new(Arc::clone(&clock)).shared();
        let hub: SharedHub = Arc::new(Mutex::new(BroadcastHub::new()));
        let sequencer = GameSequencer::new(
            Arc::clone(&store),
            Arc::new(HubBroadcaster::new(Arc::clone(&hub))),
            text_source,
            Arc::clone(&clock),
            config,
        );
        Self {
            store,
            hub,
            sequencer,
            clock,
        }
    }

    pub fn store(&self) -> &SharedRoomStore {
        &self.store
    }

    /// Registers a connection's outbound channel and tells the client who
    /// it is.
    pub async fn connect(&self, participant: ParticipantId, sender: MemberSender<ServerEvent>) {
        let mut hub = self.hub.lock().await;
        hub.register(participant, sender);
        hub.send_to(
            participant,
            ServerEvent::Ready(ReadyNotice {
                participant_id: participant,
            }),
        );
        tracing::debug!(%participant, "participant connected");
    }

    /// Handles one decoded client event.
    pub async fn dispatch(&self, participant: ParticipantId, event: ClientEvent) {
        match event {
            ClientEvent::CreateRoom(room_id) => self.create_room(participant, room_id).await,
            ClientEvent::JoinRoom(room_id) => self.join_room(participant, room_id).await,
            ClientEvent::LeaveRoom(room_id) => self.leave_room(participant, room_id).await,
            ClientEvent::StartGame(room_id) => self.start_game(participant, room_id).await,
            ClientEvent::Progress(update) => self.progress(participant, update).await,
            ClientEvent::Health => self.health(participant).await,
        }
    }

    /// Answers a frame that could not be decoded.
    pub async fn reject_frame(&self, participant: ParticipantId, reason: &str) {
        self.reply(
            participant,
            ServerEvent::Error(ErrorNotice {
                room_id: None,
                code: 400,
                message: format!("malformed event: {reason}"),
            }),
        )
        .await;
    }

    /// Removes a closed connection from its room and from the hub.
    pub async fn disconnect(&self, participant: ParticipantId) {
        let mut store = self.store.lock().await;
        let left = store.leave_room(participant);

        let mut hub = self.hub.lock().await;
        hub.unregister(participant);
        match left {
            Ok(room) => {
                hub.broadcast(room.room_id().as_str(), ServerEvent::UserLeft(room.members()));
            }
            Err(RoomError::NotInRoom(_)) => {}
            Err(e) => tracing::warn!(%participant, error = %e, "disconnect cleanup failed"),
        }
        tracing::debug!(%participant, "participant disconnected");
    }

    // -- handlers -----------------------------------------------------------

    async fn create_room(&self, participant: ParticipantId, room_id: RoomId) {
        if !self.check_room_id(participant, &room_id, ServerEvent::CreateFailed).await {
            return;
        }

        let mut store = self.store.lock().await;
        match store
            .create_room(room_id.clone(), participant)
            .map(|room| room.members())
        {
            Ok(members) => {
                let mut hub = self.hub.lock().await;
                hub.join_group(room_id.as_str(), participant);
                hub.send_to(
                    participant,
                    ServerEvent::RoomCreated(RoomNotice {
                        message: format!("Room {room_id} created successfully"),
                        room_id,
                    }),
                );
                hub.send_to(participant, ServerEvent::UserJoined(members));
            }
            Err(e) => {
                drop(store);
                self.fail(participant, ServerEvent::CreateFailed, &e).await
            }
        }
    }

    async fn join_room(&self, participant: ParticipantId, room_id: RoomId) {
        if !self.check_room_id(participant, &room_id, ServerEvent::JoinFailed).await {
            return;
        }

        let mut store = self.store.lock().await;
        match store
            .join_room(&room_id, participant)
            .map(|room| room.members())
        {
            Ok(members) => {
                let mut hub = self.hub.lock().await;
                hub.join_group(room_id.as_str(), participant);
                hub.broadcast(room_id.as_str(), ServerEvent::UserJoined(members));
                hub.send_to(
                    participant,
                    ServerEvent::RoomJoined(RoomNotice {
                        message: format!("Joined room {room_id}"),
                        room_id,
                    }),
                );
            }
            Err(e) => {
                drop(store);
                self.fail(participant, ServerEvent::JoinFailed, &e).await
            }
        }
    }

    /// Leaves `room_id`. A request naming a room other than the one the
    /// participant occupies is refused, so a stale client cannot pull them
    /// out of their current room.
    async fn leave_room(&self, participant: ParticipantId, room_id: RoomId) {
        let mut store = self.store.lock().await;
        let result = if store.room_of(participant) == Some(&room_id) {
            store.leave_room(participant)
        } else {
            Err(RoomError::NotInRoom(participant))
        };

        match result {
            Ok(room) => {
                let mut hub = self.hub.lock().await;
                hub.leave_group(room_id.as_str(), participant);
                hub.broadcast(room_id.as_str(), ServerEvent::UserLeft(room.members()));
            }
            Err(e) => {
                drop(store);
                let notice = ErrorNotice {
                    room_id: Some(room_id),
                    code: e.code(),
                    message: e.to_string(),
                };
                self.reply(participant, ServerEvent::LeaveFailed(notice)).await;
            }
        }
    }

    async fn start_game(&self, participant: ParticipantId, room_id: RoomId) {
        // Success needs no reply: the countdown itself reaches the room.
        if let Err(e) = self.sequencer.start_game(&room_id, participant).await {
            self.fail(participant, ServerEvent::StartFailed, &e).await;
        }
    }

    async fn progress(&self, participant: ParticipantId, update: ProgressUpdate) {
        let result = self
            .store
            .lock()
            .await
            .set_progress(&update.room_id, participant, update.value)
            .map(|room| room.progress().clone());

        match result {
            Ok(progress) => {
                self.hub
                    .lock()
                    .await
                    .broadcast(update.room_id.as_str(), ServerEvent::ProgressUpdated(progress));
            }
            Err(e) => self.fail(participant, ServerEvent::ProgressFailed, &e).await,
        }
    }

    async fn health(&self, participant: ParticipantId) {
        let snapshot = self.store.lock().await.snapshot();
        let report = HealthReport {
            status: "ok".to_string(),
            timestamp: self.clock.now_millis(),
            rooms: snapshot.rooms,
            participants: snapshot.participants,
        };
        self.reply(participant, ServerEvent::Health(report)).await;
    }

    // -- helpers ------------------------------------------------------------

    async fn reply(&self, participant: ParticipantId, event: ServerEvent) {
        self.hub.lock().await.send_to(participant, event);
    }

    async fn fail(&self, participant: ParticipantId, kind: FailureKind, err: &RoomError) {
        tracing::debug!(%participant, error = %err, "request rejected");
        let notice = ErrorNotice {
            room_id: err.room_id().cloned(),
            code: err.code(),
            message: err.to_string(),
        };
        self.reply(participant, kind(notice)).await;
    }

    /// Replies with a 400 of the given kind if `room_id` is unusable.
    async fn check_room_id(
        &self,
        participant: ParticipantId,
        room_id: &RoomId,
        kind: FailureKind,
    ) -> bool {
        if room_id.is_valid() {
            return true;
        }
        let notice = ErrorNotice {
            room_id: None,
            code: 400,
            message: format!(
                "room id must be non-blank and at most {} bytes",
                RoomId::MAX_LEN
            ),
        };
        self.reply(participant, kind(notice)).await;
        false
    }
}
