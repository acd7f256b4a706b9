//! Delayed-step tick scheduler for Typerace.
//!
//! A countdown is declared as data: a [`TickPlan`] is an ordered list of
//! `{delay, payload}` steps, where each delay is measured from the moment
//! the *previous* step fired. A [`TickScheduler`] walks the plan on tokio's
//! clock and hands each payload back to the caller when it is due.
//!
//! Because the plan is plain data, its cumulative offsets can be checked
//! without waiting, and running it under `tokio::time::pause()` makes the
//! timing fully deterministic in tests.
//!
//! # Integration
//!
//! The scheduler is meant to be driven from a spawned task:
//!
//! ```ignore
//! let mut scheduler = TickScheduler::new(plan);
//! while let Some(tick) = scheduler.next_tick().await {
//!     fire(tick.payload).await;
//! }
//! ```
//!
//! Once started, a plan always runs to the end. There is no cancel
//! handle; callers that lose interest simply make their handler a no-op.

mod clock;

pub use clock::{Clock, ManualClock, SystemClock, TokioClock};

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// One step of a plan: wait `delay` after the previous step, then deliver
/// `payload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickStep<T> {
    pub delay: Duration,
    pub payload: T,
}

/// An ordered sequence of delayed steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickPlan<T> {
    steps: Vec<TickStep<T>>,
}

impl<T> TickPlan<T> {
    /// An empty plan.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Appends a step, builder style.
    pub fn then(mut self, delay: Duration, payload: T) -> Self {
        self.push(delay, payload);
        self
    }

    /// Appends a step.
    pub fn push(&mut self, delay: Duration, payload: T) {
        self.steps.push(TickStep { delay, payload });
    }

    /// The steps in firing order.
    pub fn steps(&self) -> &[TickStep<T>] {
        &self.steps
    }

    /// When each step is due, measured from the start of the plan.
    pub fn offsets(&self) -> Vec<Duration> {
        self.steps
            .iter()
            .scan(Duration::ZERO, |acc, step| {
                *acc += step.delay;
                Some(*acc)
            })
            .collect()
    }

    /// Offset of the last step (zero for an empty plan).
    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.delay).sum()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<T> Default for TickPlan<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tick info (returned to caller each tick)
// ---------------------------------------------------------------------------

/// A fired step, returned by [`TickScheduler::next_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo<T> {
    /// 1-based position of this step in the plan.
    pub tick: u64,
    /// The step's payload.
    pub payload: T,
    /// Tokio instant at which the step actually fired.
    pub fired_at: TokioInstant,
    /// How far past its deadline the step fired.
    pub late_by: Duration,
    /// `true` for the final step of the plan.
    pub is_last: bool,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Runs a [`TickPlan`] against tokio's clock.
///
/// The clock is anchored when the scheduler is created, so the first
/// step's delay counts from construction, not from the first poll.
pub struct TickScheduler<T> {
    pending: VecDeque<TickStep<T>>,
    tick_count: u64,
    started_at: TokioInstant,
    /// When the previous step fired (the anchor before the first step).
    last_fired: TokioInstant,
    late_warn_threshold: Duration,
}

impl<T> TickScheduler<T> {
    /// Default lateness beyond which a tick is logged as a warning.
    pub const DEFAULT_LATE_WARN: Duration = Duration::from_millis(50);

    /// Creates a scheduler for `plan`, anchored at the current instant.
    pub fn new(plan: TickPlan<T>) -> Self {
        let now = TokioInstant::now();
        debug!(
            steps = plan.len(),
            total_ms = plan.total_duration().as_millis() as u64,
            "tick plan scheduled"
        );
        Self {
            pending: plan.steps.into(),
            tick_count: 0,
            started_at: now,
            last_fired: now,
            late_warn_threshold: Self::DEFAULT_LATE_WARN,
        }
    }

    /// Overrides the lateness warning threshold.
    pub fn with_late_warning(mut self, threshold: Duration) -> Self {
        self.late_warn_threshold = threshold;
        self
    }

    /// Waits for the next step and returns it, or `None` once the plan is
    /// exhausted.
    ///
    /// The deadline is the previous step's actual fire time plus this
    /// step's delay, so one late step shifts the rest of the plan rather
    /// than bunching them up.
    pub async fn next_tick(&mut self) -> Option<TickInfo<T>> {
        let deadline = self.last_fired + self.pending.front()?.delay;

        time::sleep_until(deadline).await;

        // Only taken once due, so dropping this future mid-wait loses nothing.
        let step = self.pending.pop_front()?;

        let now = TokioInstant::now();
        let late_by = now.saturating_duration_since(deadline);
        if late_by > self.late_warn_threshold {
            warn!(
                tick = self.tick_count + 1,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "tick fired late"
            );
        }

        self.last_fired = now;
        self.tick_count += 1;
        trace!(tick = self.tick_count, "tick fired");

        Some(TickInfo {
            tick: self.tick_count,
            payload: step.payload,
            fired_at: now,
            late_by,
            is_last: self.pending.is_empty(),
        })
    }

    /// Number of steps fired so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Number of steps still to fire.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Whether every step has fired.
    pub fn is_finished(&self) -> bool {
        self.pending.is_empty()
    }

    /// Time since the scheduler was created.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_offsets_are_cumulative() {
        let plan = TickPlan::new().then(ms(0), 'a').then(ms(300), 'b').then(ms(2000), 'c');
        assert_eq!(plan.offsets(), vec![ms(0), ms(300), ms(2300)]);
        assert_eq!(plan.total_duration(), ms(2300));
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn test_empty_plan() {
        let plan: TickPlan<()> = TickPlan::default();
        assert!(plan.is_empty());
        assert!(plan.offsets().is_empty());
        assert_eq!(plan.total_duration(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_plan_finishes_immediately() {
        let mut s = TickScheduler::new(TickPlan::<u8>::new());
        assert!(s.is_finished());
        assert!(s.next_tick().await.is_none());
    }
}
