//! Integration tests for the room store and the race start sequence.
//!
//! Timing tests run on tokio's paused clock, so the countdown offsets are
//! exact and the suite finishes instantly.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;
use tokio::time::Instant;
use typerace_protocol::{ParticipantId, RoomId, ServerEvent};
use typerace_room::{
    FixedText, GamePhase, GameSequencer, RoomBroadcast, RoomError, RoomStore, SequencerConfig,
    SharedRoomStore,
};
use typerace_tick::{Clock, TokioClock};

// =========================================================================
// Helpers
// =========================================================================

const EPOCH_MS: u64 = 1_700_000_000_000;

fn p(n: u64) -> ParticipantId {
    ParticipantId(n)
}

fn r(name: &str) -> RoomId {
    RoomId::new(name)
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// What one broadcast looked like when it went out.
#[derive(Debug, Clone)]
struct Delivery {
    room_id: RoomId,
    event: ServerEvent,
    audience: Vec<ParticipantId>,
    at: Duration,
}

/// Resolves the audience from the store at send time, the way the server
/// resolves hub groups.
struct AudienceRecorder {
    store: SharedRoomStore,
    started: Instant,
    log: Mutex<Vec<Delivery>>,
}

impl RoomBroadcast for AudienceRecorder {
    async fn broadcast(&self, room_id: &RoomId, event: ServerEvent) {
        let audience = self
            .store
            .lock()
            .await
            .room(room_id)
            .map(|room| room.participants().to_vec())
            .unwrap_or_default();
        self.log.lock().await.push(Delivery {
            room_id: room_id.clone(),
            event,
            audience,
            at: self.started.elapsed(),
        });
    }
}

struct Harness {
    store: SharedRoomStore,
    recorder: Arc<AudienceRecorder>,
    sequencer: GameSequencer<AudienceRecorder, FixedText>,
}

impl Harness {
    fn new() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(TokioClock::starting_at(EPOCH_MS));
        let store = RoomStore::new(Arc::clone(&clock)).shared();
        let recorder = Arc::new(AudienceRecorder {
            store: Arc::clone(&store),
            started: Instant::now(),
            log: Mutex::new(Vec::new()),
        });
        let sequencer = GameSequencer::new(
            Arc::clone(&store),
            Arc::clone(&recorder),
            FixedText("The pen is mightier than the sword.".into()),
            clock,
            SequencerConfig::default(),
        );
        Self {
            store,
            recorder,
            sequencer,
        }
    }

    async fn deliveries(&self) -> Vec<Delivery> {
        self.recorder.log.lock().await.clone()
    }
}

// =========================================================================
// Start sequence
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_countdown_fires_at_fixed_offsets() {
    let h = Harness::new();
    h.store.lock().await.create_room(r("R1"), p(1)).unwrap();

    let started = h.sequencer.start_game(&r("R1"), p(1)).await.unwrap();
    started.countdown.await.unwrap();

    let timeline: Vec<_> = h
        .deliveries()
        .await
        .into_iter()
        .map(|d| (d.event.name(), d.at))
        .collect();
    assert_eq!(
        timeline,
        vec![
            ("game:text", ms(0)),
            ("game:countdown", ms(300)),
            ("game:countdown", ms(2300)),
            ("game:countdown", ms(4300)),
            ("game:start", ms(5300)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_start_time_is_stamped_when_final_tick_fires() {
    let h = Harness::new();
    h.store.lock().await.create_room(r("R1"), p(1)).unwrap();

    let started = h.sequencer.start_game(&r("R1"), p(1)).await.unwrap();

    tokio::time::sleep(ms(5_000)).await;
    {
        let store = h.store.lock().await;
        let room = store.room(&r("R1")).unwrap();
        assert_eq!(room.phase(), GamePhase::Starting);
        assert_eq!(room.game_state().start_time, None);
    }

    started.countdown.await.unwrap();
    let store = h.store.lock().await;
    let room = store.room(&r("R1")).unwrap();
    assert_eq!(room.phase(), GamePhase::Racing);
    assert_eq!(room.game_state().start_time, Some(EPOCH_MS + 5_300));
}

#[tokio::test(start_paused = true)]
async fn test_non_creator_start_changes_nothing() {
    let h = Harness::new();
    {
        let mut store = h.store.lock().await;
        store.create_room(r("R1"), p(1)).unwrap();
        store.join_room(&r("R1"), p(2)).unwrap();
    }
    let before = h.store.lock().await.room(&r("R1")).cloned();

    let err = h.sequencer.start_game(&r("R1"), p(2)).await.unwrap_err();
    assert_eq!(
        err,
        RoomError::Unauthorized {
            participant: p(2),
            room_id: r("R1"),
        }
    );

    tokio::time::sleep(ms(10_000)).await;
    assert_eq!(h.store.lock().await.room(&r("R1")).cloned(), before);
    assert!(h.deliveries().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_double_start_runs_one_chain() {
    let h = Harness::new();
    h.store.lock().await.create_room(r("R1"), p(1)).unwrap();

    let first = h.sequencer.start_game(&r("R1"), p(1)).await.unwrap();
    tokio::time::sleep(ms(1_000)).await;
    let second = h.sequencer.start_game(&r("R1"), p(1)).await;
    assert_eq!(second.unwrap_err(), RoomError::AlreadyStarted(r("R1")));

    first.countdown.await.unwrap();
    tokio::time::sleep(ms(10_000)).await;

    let log = h.deliveries().await;
    assert_eq!(log.len(), 5);
    let texts = log
        .iter()
        .filter(|d| matches!(d.event, ServerEvent::RaceText(_)))
        .count();
    assert_eq!(texts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_start_after_race_is_already_started() {
    let h = Harness::new();
    h.store.lock().await.create_room(r("R1"), p(1)).unwrap();
    h.sequencer
        .start_game(&r("R1"), p(1))
        .await
        .unwrap()
        .countdown
        .await
        .unwrap();

    let err = h.sequencer.start_game(&r("R1"), p(1)).await.unwrap_err();
    assert_eq!(err, RoomError::AlreadyStarted(r("R1")));
}

// =========================================================================
// The R1 scenario
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_r1_scenario_with_creator_leaving_mid_countdown() {
    let h = Harness::new();
    let (a, b) = (p(1), p(2));

    {
        let mut store = h.store.lock().await;
        let room = store.create_room(r("R1"), a).unwrap();
        assert_eq!(room.creator(), Some(a));
        let room = store.join_room(&r("R1"), b).unwrap();
        assert_eq!(room.participants(), &[a, b]);
    }

    let started = h.sequencer.start_game(&r("R1"), a).await.unwrap();
    assert!(started.room.game_state().started);

    // Joins are refused once the countdown runs.
    assert_eq!(
        h.store.lock().await.join_room(&r("R1"), p(3)),
        Err(RoomError::GameInProgress(r("R1")))
    );

    // Between countdown 3 (300ms) and 2 (2300ms).
    tokio::time::sleep(ms(1_000)).await;
    let room = h.store.lock().await.leave_room(a).unwrap();
    assert_eq!(room.creator(), Some(b));
    assert_eq!(room.participants(), &[b]);

    started.countdown.await.unwrap();

    let log = h.deliveries().await;
    let audiences: Vec<_> = log.iter().map(|d| (d.event.name(), d.audience.clone())).collect();
    assert_eq!(
        audiences,
        vec![
            ("game:text", vec![a, b]),
            ("game:countdown", vec![a, b]),
            ("game:countdown", vec![b]),
            ("game:countdown", vec![b]),
            ("game:start", vec![b]),
        ]
    );

    // B reports progress once racing.
    let mut store = h.store.lock().await;
    let room = store.set_progress(&r("R1"), b, 55.0).unwrap();
    assert_eq!(room.progress_of(b).unwrap().value, 55.0);
    assert_eq!(room.progress_of(b).unwrap().last_update_time, EPOCH_MS + 5_300);
    store.check_invariants().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_ticks_for_deleted_room_send_nothing() {
    let h = Harness::new();
    h.store.lock().await.create_room(r("R1"), p(1)).unwrap();
    let started = h.sequencer.start_game(&r("R1"), p(1)).await.unwrap();

    tokio::time::sleep(ms(500)).await;
    h.store.lock().await.leave_room(p(1)).unwrap();
    started.countdown.await.unwrap();

    let log = h.deliveries().await;
    assert_eq!(log.len(), 2, "only text and countdown 3 went out");
    assert!(h.store.lock().await.room(&r("R1")).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_old_chain_ignores_recreated_room() {
    let h = Harness::new();
    h.store.lock().await.create_room(r("R1"), p(1)).unwrap();
    let started = h.sequencer.start_game(&r("R1"), p(1)).await.unwrap();

    tokio::time::sleep(ms(500)).await;
    {
        let mut store = h.store.lock().await;
        store.leave_room(p(1)).unwrap();
        store.create_room(r("R1"), p(2)).unwrap();
    }
    started.countdown.await.unwrap();

    let store = h.store.lock().await;
    let room = store.room(&r("R1")).unwrap();
    assert_eq!(room.phase(), GamePhase::Lobby);
    assert!(!room.game_state().started);
    assert!(h.deliveries().await.iter().all(|d| d.at <= ms(300)));
}

#[tokio::test(start_paused = true)]
async fn test_rooms_count_down_independently() {
    let h = Harness::new();
    {
        let mut store = h.store.lock().await;
        store.create_room(r("A"), p(1)).unwrap();
        store.create_room(r("B"), p(2)).unwrap();
    }
    let a = h.sequencer.start_game(&r("A"), p(1)).await.unwrap();
    tokio::time::sleep(ms(100)).await;
    let b = h.sequencer.start_game(&r("B"), p(2)).await.unwrap();
    a.countdown.await.unwrap();
    b.countdown.await.unwrap();

    let log = h.deliveries().await;
    let starts: Vec<_> = log
        .iter()
        .filter(|d| d.event.name() == "game:start")
        .map(|d| (d.room_id.clone(), d.at))
        .collect();
    assert_eq!(starts, vec![(r("A"), ms(5_300)), (r("B"), ms(5_400))]);
}

// =========================================================================
// Store invariants under arbitrary operation sequences
// =========================================================================

#[test]
fn test_invariants_hold_for_random_operations() {
    let rooms = ["R1", "R2", "R3"];
    for seed in 0..32 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut store = RoomStore::default();

        for _ in 0..200 {
            let participant = p(rng.random_range(1..=8));
            let room_id = r(rooms[rng.random_range(0..rooms.len())]);
            let before = store.snapshot();

            let result = match rng.random_range(0..4) {
                0 => store.create_room(room_id, participant).map(|_| ()),
                1 => store.join_room(&room_id, participant).map(|_| ()),
                2 => store.leave_room(participant).map(|_| ()),
                _ => store
                    .set_progress(&room_id, participant, rng.random_range(0.0..100.0))
                    .map(|_| ()),
            };

            if result.is_err() {
                assert_eq!(store.snapshot(), before, "seed {seed}: failed op mutated state");
            }
            if let Err(violation) = store.check_invariants() {
                panic!("seed {seed}: {violation}");
            }
        }
    }
}

#[test]
fn test_leaving_last_member_removes_room_and_registry() {
    let mut store = RoomStore::default();
    store.create_room(r("R1"), p(1)).unwrap();
    store.join_room(&r("R1"), p(2)).unwrap();

    store.leave_room(p(2)).unwrap();
    store.leave_room(p(1)).unwrap();

    assert_eq!(store.room_count(), 0);
    assert_eq!(store.participant_count(), 0);
    assert_eq!(store.room_of(p(1)), None);
    assert_eq!(store.room_of(p(2)), None);
    assert!(store.snapshot().participants.is_empty());
}

#[test]
fn test_creator_falls_back_to_earliest_remaining() {
    let mut store = RoomStore::default();
    store.create_room(r("R1"), p(10)).unwrap();
    for n in [11, 12, 13] {
        store.join_room(&r("R1"), p(n)).unwrap();
    }

    assert_eq!(store.leave_room(p(12)).unwrap().creator(), Some(p(10)));
    assert_eq!(store.leave_room(p(10)).unwrap().creator(), Some(p(11)));
    assert_eq!(store.leave_room(p(11)).unwrap().creator(), Some(p(13)));
    store.check_invariants().unwrap();
}
