//! Game phase state machine and countdown timing.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use typerace_tick::TickPlan;

use crate::RaceSignal;

// ---------------------------------------------------------------------------
// SequencerConfig
// ---------------------------------------------------------------------------

/// Timing of the start sequence.
///
/// Every delay is measured from the previous step, so with the defaults
/// the countdown values land at 300, 2300 and 4300ms and the race starts
/// at 5300ms after the start request was accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencerConfig {
    /// Delay before the race text goes out.
    pub text_delay: Duration,

    /// Delay from the race text to the first countdown value.
    pub first_countdown_delay: Duration,

    /// First countdown value. The countdown runs down to 1; 0 skips it.
    pub countdown_from: u8,

    /// Delay between consecutive countdown values.
    pub countdown_interval: Duration,

    /// Delay from the last countdown value to the race start.
    pub launch_delay: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            text_delay: Duration::ZERO,
            first_countdown_delay: Duration::from_millis(300),
            countdown_from: 3,
            countdown_interval: Duration::from_millis(2000),
            launch_delay: Duration::from_millis(1000),
        }
    }
}

impl SequencerConfig {
    /// Builds the tick plan: text, `countdown_from..=1`, launch.
    pub fn plan(&self) -> TickPlan<RaceSignal> {
        let mut plan = TickPlan::new().then(self.text_delay, RaceSignal::Text);
        for (i, n) in (1..=self.countdown_from).rev().enumerate() {
            let delay = if i == 0 {
                self.first_countdown_delay
            } else {
                self.countdown_interval
            };
            plan.push(delay, RaceSignal::Countdown(n));
        }
        plan.push(self.launch_delay, RaceSignal::Launch);
        plan
    }
}

// ---------------------------------------------------------------------------
// GamePhase
// ---------------------------------------------------------------------------

/// Where a room is in its single race.
///
/// ```text
/// Lobby → Starting → Racing
/// ```
///
/// - **Lobby**: accepting joins; the creator may start.
/// - **Starting**: a start was accepted and the countdown is running.
///   Joins are refused.
/// - **Racing**: the countdown finished and `startTime` is stamped.
///   Terminal for the lifetime of the room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    #[default]
    Lobby,
    Starting,
    Racing,
}

impl GamePhase {
    /// Returns `true` if new participants may join.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Lobby)
    }

    /// The following phase, or `None` from the terminal phase.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Lobby => Some(Self::Starting),
            Self::Starting => Some(Self::Racing),
            Self::Racing => None,
        }
    }

    /// Returns `true` if moving to `target` is a single forward step.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::Starting => write!(f, "Starting"),
            Self::Racing => write!(f, "Racing"),
        }
    }
}
