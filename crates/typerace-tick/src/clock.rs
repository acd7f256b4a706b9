//! Time sources for stamping events with wall-clock milliseconds.
//!
//! Room state records timestamps (progress updates, race start) as
//! milliseconds since the Unix epoch. Reading them through [`Clock`]
//! instead of calling `SystemTime::now()` directly lets tests pin or
//! advance time by hand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::Instant as TokioInstant;

/// A source of wall-clock time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync + 'static {
    fn now_millis(&self) -> u64;
}

/// The operating system's wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Wall-clock time that advances with tokio's clock.
///
/// Anchored to a wall-clock reading at construction; afterwards it adds
/// tokio's elapsed time. Under `tokio::time::pause()` it therefore moves
/// exactly as far as the test advances the runtime, which keeps
/// timestamps consistent with when ticks fire.
#[derive(Debug, Clone)]
pub struct TokioClock {
    anchor: TokioInstant,
    anchor_millis: u64,
}

impl TokioClock {
    /// Anchors to the system clock's current reading.
    pub fn new() -> Self {
        Self::starting_at(SystemClock.now_millis())
    }

    /// Anchors to a fixed epoch reading.
    pub fn starting_at(anchor_millis: u64) -> Self {
        Self {
            anchor: TokioInstant::now(),
            anchor_millis,
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_millis(&self) -> u64 {
        self.anchor_millis + self.anchor.elapsed().as_millis() as u64
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(start_millis),
        }
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
