/// Time sources for the control loop and audio contexts
///
/// Every timestamp in the core is a `u64` millisecond count from the clock
/// epoch. Timeouts and cue deadlines are evaluated by polling, never by
/// scheduled interrupts, so swapping the wall clock for a manual one makes
/// the whole timing engine deterministic under test.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Millisecond time source shared between the control loop, the buzzer
/// worker and the sample synthesizer.
pub trait TimeSource: Send + Sync {
    fn now_ms(&self) -> u64;
}

pub type SharedClock = Arc<dyn TimeSource>;

/// Wall clock with its epoch fixed at construction.
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock for tests and scripted demo runs.
#[derive(Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: AtomicU64::new(0),
        })
    }

    pub fn starting_at(ms: u64) -> Arc<Self> {
        Arc::new(Self {
            now: AtomicU64::new(ms),
        })
    }

    pub fn set_ms(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, delta: u64) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
