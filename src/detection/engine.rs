/// Detection engine
///
/// Wraps the active mode's policy, applies its verdict to the session and
/// reports what the timing loop needs to know: whether a shot landed and
/// whether it filled the session.
use super::policy::ShotPolicy;
use crate::sensors::DetectionSample;
use crate::session::{Session, ShotRecord};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    None,
    Shot(ShotRecord),
    /// The recorded shot was the last one the session allows.
    MaxShotsReached(ShotRecord),
}

pub struct DetectionEngine {
    policy: Box<dyn ShotPolicy>,
}

impl DetectionEngine {
    pub fn new(policy: Box<dyn ShotPolicy>) -> Self {
        Self { policy }
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Evaluate one listening tick. Returns the engine event plus whether
    /// the caller should reset the mic peak tracker.
    pub fn tick(&mut self, sample: &DetectionSample, session: &mut Session) -> (EngineEvent, bool) {
        let verdict = self.policy.evaluate(sample, session);

        let event = match verdict.shot_at.and_then(|t| session.record_shot(t)) {
            Some(record) => {
                tracing::info!(
                    "shot {} at t={} ms, split {:.2} s",
                    record.index + 1,
                    record.timestamp_ms,
                    record.split_seconds
                );
                if session.is_full() {
                    EngineEvent::MaxShotsReached(record)
                } else {
                    EngineEvent::Shot(record)
                }
            }
            None => EngineEvent::None,
        };

        (event, verdict.reset_peak)
    }

    pub fn reset(&mut self) {
        self.policy.reset();
    }
}
