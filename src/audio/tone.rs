/// Tone requests and the shared tone plan
///
/// The plan is the only state crossing the control/audio boundary. It is a
/// single small value behind one mutex and is always exchanged as a unit:
/// the producer replaces the whole plan, the consumer snapshots and writes
/// back the whole plan. Independent per-field flags would let the audio
/// side observe a torn half-update.
use std::sync::Arc;

use parking_lot::Mutex;

/// One cue on the streamed path. Immutable value, one per cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToneRequest {
    pub frequency_hz: i32,
    pub duration_ms: u64,
    /// Clock time at which the synthesizer may activate the tone.
    pub scheduled_start_ms: u64,
    /// Set for side-by-side latency calibration tones.
    pub sync_calibration: bool,
}

/// A tone the synthesizer has activated and is currently rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveTone {
    pub frequency_hz: i32,
    pub end_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TonePlan {
    pub pending: Option<ToneRequest>,
    pub active: Option<ActiveTone>,
}

impl TonePlan {
    pub fn is_idle(&self) -> bool {
        self.pending.is_none() && self.active.is_none()
    }
}

/// Cloneable single-producer/single-consumer slot holding the plan.
#[derive(Clone, Default)]
pub struct TonePlanSlot {
    inner: Arc<Mutex<TonePlan>>,
}

impl TonePlanSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole plan with a new pending cue. Any in-flight tone is
    /// dropped with it; the next frame pull observes the new plan.
    pub fn publish(&self, request: ToneRequest) {
        *self.inner.lock() = TonePlan {
            pending: Some(request),
            active: None,
        };
    }

    /// Reset to idle. No-op when already idle.
    pub fn clear(&self) {
        *self.inner.lock() = TonePlan::default();
    }

    pub fn snapshot(&self) -> TonePlan {
        *self.inner.lock()
    }

    /// Consumer-side exchange: the synthesizer reads the plan and writes its
    /// updated view back in one critical section.
    pub fn update<R>(&self, f: impl FnOnce(&mut TonePlan) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

/// Request consumed by the buzzer worker. `frequency_hz <= 0` with a
/// positive duration is a pure delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuzzerRequest {
    pub frequency_hz: i32,
    pub duration_ms: u64,
}
