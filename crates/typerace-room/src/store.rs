//! Room store: owns every room and tracks which participant is where.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::Mutex;
use typerace_protocol::{ParticipantId, RoomId, RoomSummary};
use typerace_tick::{Clock, SystemClock};

use crate::{Room, RoomError};

/// The store as shared between connection tasks and countdown tasks.
pub type SharedRoomStore = Arc<Mutex<RoomStore>>;

/// Serializable view of the whole store, for the health surface.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    /// Every room, ordered by id.
    pub rooms: Vec<RoomSummary>,
    pub participants: BTreeMap<ParticipantId, RoomId>,
}

/// All rooms plus the participant → room registry.
///
/// Every operation either succeeds completely or returns an error having
/// changed nothing. A participant is in at most one room, and appears in a
/// room's participant list iff the registry points them at that room.
pub struct RoomStore {
    rooms: HashMap<RoomId, Room>,

    /// Reverse index used to resolve leave and disconnect.
    registry: HashMap<ParticipantId, RoomId>,

    /// Last epoch handed out. Each created room gets the next one.
    last_epoch: u64,

    clock: Arc<dyn Clock>,
}

impl RoomStore {
    /// Creates an empty store that stamps progress with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            rooms: HashMap::new(),
            registry: HashMap::new(),
            last_epoch: 0,
            clock,
        }
    }

    /// Wraps the store for sharing across tasks.
    pub fn shared(self) -> SharedRoomStore {
        Arc::new(Mutex::new(self))
    }

    /// Creates `room_id` with `participant` as its first member and creator.
    ///
    /// # Errors
    /// `Conflict` if the id is taken, `AlreadyInRoom` if the participant
    /// already occupies another room.
    pub fn create_room(
        &mut self,
        room_id: RoomId,
        participant: ParticipantId,
    ) -> Result<&Room, RoomError> {
        let vacant = match self.rooms.entry(room_id) {
            Entry::Occupied(occupied) => {
                tracing::debug!(room_id = %occupied.key(), %participant, "create rejected: room exists");
                return Err(RoomError::Conflict(occupied.key().clone()));
            }
            Entry::Vacant(vacant) => vacant,
        };
        if let Some(current) = self.registry.get(&participant) {
            return Err(RoomError::AlreadyInRoom(participant, current.clone()));
        }

        self.last_epoch += 1;
        let mut room = Room::new(vacant.key().clone(), self.last_epoch);
        room.add_participant(participant);
        room.set_creator(participant);
        self.registry.insert(participant, vacant.key().clone());

        tracing::info!(room_id = %vacant.key(), %participant, epoch = self.last_epoch, "room created");
        Ok(&*vacant.insert(room))
    }

    /// Adds `participant` to an existing room that is still in the lobby.
    ///
    /// Joining the room one is already in returns it unchanged.
    ///
    /// # Errors
    /// `NotFound`, `GameInProgress` once the room has left the lobby, or
    /// `AlreadyInRoom` if the participant occupies a different room.
    pub fn join_room(
        &mut self,
        room_id: &RoomId,
        participant: ParticipantId,
    ) -> Result<&Room, RoomError> {
        if let Some(current) = self.registry.get(&participant) {
            if current != room_id {
                return Err(RoomError::AlreadyInRoom(participant, current.clone()));
            }
        }

        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        if room.contains(participant) {
            tracing::debug!(%room_id, %participant, "already in room");
            return Ok(&*room);
        }
        if !room.phase().is_joinable() {
            tracing::debug!(%room_id, %participant, phase = %room.phase(), "join rejected");
            return Err(RoomError::GameInProgress(room_id.clone()));
        }

        room.add_participant(participant);
        self.registry.insert(participant, room_id.clone());
        tracing::info!(%room_id, %participant, members = room.len(), "participant joined");
        Ok(&*room)
    }

    /// Removes `participant` from whatever room they are in.
    ///
    /// Returns the room as it stands afterwards. If it became empty it has
    /// already been deleted and the returned value is its final state.
    ///
    /// # Errors
    /// `NotInRoom` if the registry has no entry for the participant.
    pub fn leave_room(&mut self, participant: ParticipantId) -> Result<Room, RoomError> {
        let room_id = self
            .registry
            .remove(&participant)
            .ok_or(RoomError::NotInRoom(participant))?;

        let Some(room) = self.rooms.get_mut(&room_id) else {
            tracing::warn!(%room_id, %participant, "registry pointed at a missing room");
            return Err(RoomError::NotInRoom(participant));
        };
        room.remove_participant(participant);
        tracing::info!(%room_id, %participant, members = room.len(), "participant left");

        if !room.is_empty() {
            return Ok(room.clone());
        }
        match self.rooms.remove(&room_id) {
            Some(room) => {
                tracing::info!(%room_id, "room deleted");
                Ok(room)
            }
            None => Err(RoomError::NotInRoom(participant)),
        }
    }

    /// Overwrites a participant's progress, stamped with the store clock.
    ///
    /// # Errors
    /// `NotFound` if the room is absent, `ParticipantNotFound` if the
    /// participant has no progress entry there.
    pub fn set_progress(
        &mut self,
        room_id: &RoomId,
        participant: ParticipantId,
        value: f64,
    ) -> Result<&Room, RoomError> {
        let now = self.clock.now_millis();
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        if !room.record_progress(participant, value, now) {
            tracing::debug!(%room_id, %participant, "progress rejected: not a participant");
            return Err(RoomError::ParticipantNotFound(participant, room_id.clone()));
        }
        Ok(&*room)
    }

    pub fn room(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    /// Race fields only; membership stays with the store operations.
    pub(crate) fn room_mut(&mut self, room_id: &RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    /// The room `participant` currently occupies.
    pub fn room_of(&self, participant: ParticipantId) -> Option<&RoomId> {
        self.registry.get(&participant)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn participant_count(&self) -> usize {
        self.registry.len()
    }

    /// Current time on the store clock.
    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let mut rooms: Vec<RoomSummary> = self.rooms.values().map(Room::summary).collect();
        rooms.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        StoreSnapshot {
            rooms,
            participants: self
                .registry
                .iter()
                .map(|(p, r)| (*p, r.clone()))
                .collect(),
        }
    }

    /// Checks the store-wide invariants, describing the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        for (participant, room_id) in &self.registry {
            let room = self
                .rooms
                .get(room_id)
                .ok_or_else(|| format!("{participant} registered to missing room {room_id}"))?;
            if !room.contains(*participant) {
                return Err(format!("{participant} registered to {room_id} but not a member"));
            }
        }

        for (room_id, room) in &self.rooms {
            if room.room_id() != room_id {
                return Err(format!("room stored under {room_id} reports id {}", room.room_id()));
            }
            if room.is_empty() {
                return Err(format!("empty room {room_id} was not deleted"));
            }
            let mut seen = std::collections::HashSet::new();
            for participant in room.participants() {
                if !seen.insert(*participant) {
                    return Err(format!("{participant} listed twice in {room_id}"));
                }
                if self.registry.get(participant) != Some(room_id) {
                    return Err(format!("{participant} in {room_id} without registry entry"));
                }
            }
            if room.progress().len() != room.len()
                || !room.participants().iter().all(|p| room.progress().contains_key(p))
            {
                return Err(format!("progress entries of {room_id} do not match participants"));
            }
            match room.creator() {
                Some(creator) if room.contains(creator) => {}
                other => return Err(format!("creator {other:?} of {room_id} is not a member")),
            }
        }
        Ok(())
    }
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for RoomStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomStore")
            .field("rooms", &self.rooms.len())
            .field("participants", &self.registry.len())
            .finish()
    }
}
