/// Fused acoustic + recoil detection (Noisy Range)
///
/// A loud peak alone only opens a short confirmation window; the shot is
/// recorded when a recoil impulse lands inside it, and it is recorded at
/// the acoustic anchor time because sound, not the confirming tick, is the
/// canonical shot instant. An unconfirmed window expires silently, which is
/// what rejects range noise from neighbouring lanes.
use super::policy::{peak_qualifies, PolicyVerdict, ShotPolicy};
use crate::config::RECOIL_DETECTION_WINDOW_MS;
use crate::sensors::DetectionSample;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FusedState {
    Idle,
    /// Acoustic trigger seen at `anchor_ms`, waiting for recoil.
    CheckingRecoil { anchor_ms: u64 },
}

pub struct FusedAudioRecoilPolicy {
    threshold_rms: f32,
    recoil_threshold_g: f32,
    window_ms: u64,
    state: FusedState,
}

impl FusedAudioRecoilPolicy {
    pub fn new(threshold_rms: f32, recoil_threshold_g: f32) -> Self {
        Self::with_window(threshold_rms, recoil_threshold_g, RECOIL_DETECTION_WINDOW_MS)
    }

    pub fn with_window(threshold_rms: f32, recoil_threshold_g: f32, window_ms: u64) -> Self {
        Self {
            threshold_rms,
            recoil_threshold_g,
            window_ms,
            state: FusedState::Idle,
        }
    }
}

impl ShotPolicy for FusedAudioRecoilPolicy {
    fn evaluate(&mut self, sample: &DetectionSample, session: &Session) -> PolicyVerdict {
        match self.state {
            FusedState::Idle => {
                if peak_qualifies(sample, session, self.threshold_rms) {
                    self.state = FusedState::CheckingRecoil {
                        anchor_ms: sample.timestamp_ms,
                    };
                    tracing::debug!("acoustic trigger at t={}, awaiting recoil", sample.timestamp_ms);
                    // Hold the peak until the window resolves.
                    PolicyVerdict::hold()
                } else {
                    PolicyVerdict::quiet()
                }
            }
            FusedState::CheckingRecoil { anchor_ms } => {
                let recoil = sample.recoil_magnitude.unwrap_or(0.0);
                if recoil > self.recoil_threshold_g {
                    self.state = FusedState::Idle;
                    tracing::debug!(
                        "recoil {:.2} g confirmed shot anchored at t={}",
                        recoil,
                        anchor_ms
                    );
                    PolicyVerdict::shot(anchor_ms, true)
                } else if sample.timestamp_ms.saturating_sub(anchor_ms) > self.window_ms {
                    self.state = FusedState::Idle;
                    tracing::debug!("recoil window expired, rejecting trigger at t={}", anchor_ms);
                    PolicyVerdict::quiet()
                } else {
                    PolicyVerdict::hold()
                }
            }
        }
    }

    fn reset(&mut self) {
        self.state = FusedState::Idle;
    }

    fn name(&self) -> &'static str {
        "FusedAudioRecoilPolicy"
    }
}
