/// Shot policy trait and common types
///
/// A policy turns one tick's sensor sample into at most one shot decision.
/// Policies stay side-effect free: the engine owns the session bookkeeping
/// and the caller performs the mic peak reset the verdict asks for, so the
/// same policy runs identically against real and scripted sensors.
use crate::sensors::DetectionSample;
use crate::session::Session;

/// Outcome of evaluating one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyVerdict {
    /// Timestamp to record a shot at. For fused detection this is the
    /// acoustic anchor, not the confirming tick.
    pub shot_at: Option<u64>,
    /// Whether the mic peak tracker should be reset after this tick.
    pub reset_peak: bool,
}

impl PolicyVerdict {
    pub fn quiet() -> Self {
        Self {
            shot_at: None,
            reset_peak: true,
        }
    }

    pub fn hold() -> Self {
        Self {
            shot_at: None,
            reset_peak: false,
        }
    }

    pub fn shot(timestamp_ms: u64, reset_peak: bool) -> Self {
        Self {
            shot_at: Some(timestamp_ms),
            reset_peak,
        }
    }
}

/// Per-mode detection policy.
pub trait ShotPolicy: Send {
    /// Evaluate one tick. Only called while the session is listening.
    fn evaluate(&mut self, sample: &DetectionSample, session: &Session) -> PolicyVerdict;

    /// Drop any in-flight partial detection (session end, reset).
    fn reset(&mut self);

    /// Policy name (for logging)
    fn name(&self) -> &'static str;
}

/// Shared qualification gate: loud enough, out of the refractory window,
/// and room left in the session.
pub(crate) fn peak_qualifies(
    sample: &DetectionSample,
    session: &Session,
    threshold_rms: f32,
) -> bool {
    sample.rms_peak > threshold_rms
        && session.refractory_elapsed(sample.timestamp_ms)
        && !session.is_full()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::PracticeMode;

    fn sample(timestamp_ms: u64, rms_peak: f32) -> DetectionSample {
        DetectionSample {
            timestamp_ms,
            rms_peak,
            recoil_magnitude: None,
        }
    }

    #[test]
    fn test_qualification_gate() {
        let mut session = Session::new(PracticeMode::LiveFire, 0, 2);

        assert!(peak_qualifies(&sample(1000, 2000.0), &session, 1000.0));
        assert!(!peak_qualifies(&sample(1000, 500.0), &session, 1000.0));

        session.record_shot(1000);
        // Refractory not yet elapsed.
        assert!(!peak_qualifies(&sample(1100, 2000.0), &session, 1000.0));
        assert!(peak_qualifies(&sample(1200, 2000.0), &session, 1000.0));

        session.record_shot(1200);
        // Session full.
        assert!(!peak_qualifies(&sample(1500, 2000.0), &session, 1000.0));
    }
}
