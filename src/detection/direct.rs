/// Direct acoustic detection (Live Fire)
///
/// Each tick is an independent detection window: a qualifying RMS peak
/// records a shot at the tick time, anything else resets the peak tracker
/// so stale energy cannot accumulate across ticks.
use super::policy::{peak_qualifies, PolicyVerdict, ShotPolicy};
use crate::sensors::DetectionSample;
use crate::session::Session;

pub struct DirectAudioPolicy {
    threshold_rms: f32,
}

impl DirectAudioPolicy {
    pub fn new(threshold_rms: f32) -> Self {
        Self { threshold_rms }
    }
}

impl ShotPolicy for DirectAudioPolicy {
    fn evaluate(&mut self, sample: &DetectionSample, session: &Session) -> PolicyVerdict {
        if peak_qualifies(sample, session, self.threshold_rms) {
            tracing::debug!(
                "shot at t={} (peak {:.0} > {:.0})",
                sample.timestamp_ms,
                sample.rms_peak,
                self.threshold_rms
            );
            // The peak survives the shot tick; the next tick clears it.
            PolicyVerdict::shot(sample.timestamp_ms, false)
        } else {
            PolicyVerdict::quiet()
        }
    }

    fn reset(&mut self) {}

    fn name(&self) -> &'static str {
        "DirectAudioPolicy"
    }
}
