//! A single room: who is in it, how far they have typed, and its race.

use typerace_protocol::{
    GameState, ParticipantId, Progress, ProgressMap, RoomId, RoomMembers, RoomSummary, Timestamp,
};

use crate::{GamePhase, RoomError};

/// One race room.
///
/// Membership is only changed through [`RoomStore`](crate::RoomStore),
/// which keeps the participant registry in step. The race fields are
/// driven by [`GameSequencer`](crate::GameSequencer).
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    room_id: RoomId,
    epoch: u64,
    /// Join order. The first entry inherits the creator role.
    participants: Vec<ParticipantId>,
    game_state: GameState,
    progress: ProgressMap,
    creator: Option<ParticipantId>,
    phase: GamePhase,
}

impl Room {
    pub(crate) fn new(room_id: RoomId, epoch: u64) -> Self {
        Self {
            room_id,
            epoch,
            participants: Vec::new(),
            game_state: GameState::default(),
            progress: ProgressMap::new(),
            creator: None,
            phase: GamePhase::Lobby,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Store-assigned incarnation number. A room recreated under the same
    /// id gets a different epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn participants(&self) -> &[ParticipantId] {
        &self.participants
    }

    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    pub fn progress(&self) -> &ProgressMap {
        &self.progress
    }

    pub fn progress_of(&self, participant: ParticipantId) -> Option<&Progress> {
        self.progress.get(&participant)
    }

    pub fn creator(&self) -> Option<ParticipantId> {
        self.creator
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_creator(&self, participant: ParticipantId) -> bool {
        self.creator == Some(participant)
    }

    pub fn contains(&self, participant: ParticipantId) -> bool {
        self.participants.contains(&participant)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Membership view sent with `room:user:joined` / `room:user:left`.
    pub fn members(&self) -> RoomMembers {
        RoomMembers {
            room_id: self.room_id.clone(),
            users: self.participants.clone(),
            creator: self.creator,
        }
    }

    /// Full view used by the health surface.
    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.room_id.clone(),
            participants: self.participants.clone(),
            creator: self.creator,
            game_state: self.game_state.clone(),
            progress: self.progress.clone(),
        }
    }

    // -- membership (store only) --------------------------------------------

    /// Appends `participant` with zeroed progress. Returns `false` if they
    /// were already present.
    pub(crate) fn add_participant(&mut self, participant: ParticipantId) -> bool {
        if self.contains(participant) {
            return false;
        }
        self.participants.push(participant);
        self.progress.insert(participant, Progress::default());
        true
    }

    /// Removes `participant` and their progress. If they were the creator,
    /// the earliest remaining participant takes over (or nobody, when the
    /// room is now empty).
    pub(crate) fn remove_participant(&mut self, participant: ParticipantId) -> bool {
        let Some(pos) = self.participants.iter().position(|p| *p == participant) else {
            return false;
        };
        self.participants.remove(pos);
        self.progress.remove(&participant);
        if self.creator == Some(participant) {
            self.creator = self.participants.first().copied();
        }
        true
    }

    pub(crate) fn set_creator(&mut self, participant: ParticipantId) {
        self.creator = Some(participant);
    }

    /// Overwrites a participant's progress. Returns `false` if they have
    /// no entry; entries are never created here.
    pub(crate) fn record_progress(
        &mut self,
        participant: ParticipantId,
        value: f64,
        at: Timestamp,
    ) -> bool {
        match self.progress.get_mut(&participant) {
            Some(entry) => {
                *entry = Progress {
                    value,
                    last_update_time: at,
                };
                true
            }
            None => false,
        }
    }

    // -- race (sequencer only) ----------------------------------------------

    /// `Lobby → Starting`: marks the race started and fixes its text.
    pub(crate) fn begin_countdown(&mut self, race_text: String) -> Result<(), RoomError> {
        if !self.phase.can_transition_to(GamePhase::Starting) {
            return Err(RoomError::AlreadyStarted(self.room_id.clone()));
        }
        self.phase = GamePhase::Starting;
        self.game_state.started = true;
        self.game_state.race_text = race_text;
        Ok(())
    }

    /// `Starting → Racing`: stamps the start time. Returns `false` if the
    /// room was not counting down.
    pub(crate) fn launch(&mut self, at: Timestamp) -> bool {
        if !self.phase.can_transition_to(GamePhase::Racing) {
            return false;
        }
        self.phase = GamePhase::Racing;
        self.game_state.start_time = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(n: u64) -> ParticipantId {
        ParticipantId(n)
    }

    fn room_with(members: &[u64]) -> Room {
        let mut room = Room::new(RoomId::new("R1"), 1);
        for &m in members {
            room.add_participant(p(m));
        }
        if let Some(&first) = members.first() {
            room.set_creator(p(first));
        }
        room
    }

    #[test]
    fn test_new_room_is_empty_lobby() {
        let room = Room::new(RoomId::new("R1"), 1);
        assert!(room.is_empty());
        assert_eq!(room.phase(), GamePhase::Lobby);
        assert_eq!(room.creator(), None);
        assert_eq!(room.game_state(), &GameState::default());
    }

    #[test]
    fn test_add_participant_zeroes_progress_once() {
        let mut room = room_with(&[1]);
        assert!(!room.add_participant(p(1)));
        assert_eq!(room.participants(), &[p(1)]);
        assert_eq!(room.progress_of(p(1)), Some(&Progress::default()));
    }

    #[test]
    fn test_remove_creator_promotes_earliest_remaining() {
        let mut room = room_with(&[1, 2, 3]);
        assert!(room.remove_participant(p(1)));
        assert_eq!(room.creator(), Some(p(2)));
        assert_eq!(room.participants(), &[p(2), p(3)]);
        assert!(room.progress_of(p(1)).is_none());
    }

    #[test]
    fn test_remove_non_creator_keeps_creator() {
        let mut room = room_with(&[1, 2, 3]);
        assert!(room.remove_participant(p(2)));
        assert_eq!(room.creator(), Some(p(1)));
    }

    #[test]
    fn test_remove_last_clears_creator() {
        let mut room = room_with(&[1]);
        assert!(room.remove_participant(p(1)));
        assert!(room.is_empty());
        assert_eq!(room.creator(), None);
        assert!(!room.remove_participant(p(1)));
    }

    #[test]
    fn test_record_progress_overwrites_without_validation() {
        let mut room = room_with(&[1]);
        assert!(room.record_progress(p(1), 80.0, 100));
        assert!(room.record_progress(p(1), 20.0, 200));
        assert_eq!(
            room.progress_of(p(1)),
            Some(&Progress {
                value: 20.0,
                last_update_time: 200,
            })
        );
        assert!(!room.record_progress(p(9), 1.0, 300));
        assert!(room.progress_of(p(9)).is_none());
    }

    #[test]
    fn test_race_transitions() {
        let mut room = room_with(&[1]);
        room.begin_countdown("the quick brown fox".into()).unwrap();
        assert_eq!(room.phase(), GamePhase::Starting);
        assert!(room.game_state().started);
        assert_eq!(room.game_state().start_time, None);

        assert_eq!(
            room.begin_countdown("again".into()),
            Err(RoomError::AlreadyStarted(RoomId::new("R1")))
        );
        assert_eq!(room.game_state().race_text, "the quick brown fox");

        assert!(room.launch(1_234));
        assert_eq!(room.phase(), GamePhase::Racing);
        assert_eq!(room.game_state().start_time, Some(1_234));
        assert!(!room.launch(5_678));
        assert_eq!(room.game_state().start_time, Some(1_234));
    }

    #[test]
    fn test_launch_requires_countdown() {
        let mut room = room_with(&[1]);
        assert!(!room.launch(1));
        assert_eq!(room.phase(), GamePhase::Lobby);
    }

    #[test]
    fn test_members_view() {
        let room = room_with(&[4, 5]);
        let members = room.members();
        assert_eq!(members.users, vec![p(4), p(5)]);
        assert_eq!(members.creator, Some(p(4)));
        assert_eq!(room.summary().progress.len(), 2);
    }
}
