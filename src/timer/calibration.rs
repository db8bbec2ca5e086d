/// Interactive calibration flows
///
/// Peak calibration tracks the loudest mic peak (or strongest recoil) seen
/// while the user fires reference shots, then writes that maximum back into
/// the config. Offset calibration steps a latency candidate and replays a
/// dual-path cue on every adjustment so the user can line the two paths up
/// by ear before committing.
use crate::audio::scheduler::{AudioPathScheduler, ToneMode};
use crate::config::{BT_AUDIO_OFFSET_MAX_MS, BT_AUDIO_OFFSET_MIN_MS, BT_AUDIO_OFFSET_STEP_MS, TimerConfig};
use crate::sensors::{recoil_magnitude, AccelSource, MicLevelSource};

/// Which config field a peak calibration run writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationKind {
    ShotThreshold,
    RecoilThreshold,
}

pub struct PeakCalibration {
    kind: CalibrationKind,
    peak: f32,
}

impl PeakCalibration {
    pub fn new(kind: CalibrationKind) -> Self {
        Self { kind, peak: 0.0 }
    }

    pub fn kind(&self) -> CalibrationKind {
        self.kind
    }

    /// Running maximum so far, for live display.
    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// Sample the relevant sensor once. The mic peak is consumed each tick
    /// so the running maximum here is the only place it accumulates.
    pub fn tick(&mut self, mic: &mut dyn MicLevelSource, accel: &mut dyn AccelSource) {
        let value = match self.kind {
            CalibrationKind::ShotThreshold => {
                mic.update();
                let peak = mic.peak_rms();
                mic.reset_peak();
                peak
            }
            CalibrationKind::RecoilThreshold => recoil_magnitude(accel.accel()),
        };
        if value > self.peak {
            self.peak = value;
            tracing::debug!("calibration peak {:?} now {:.1}", self.kind, self.peak);
        }
    }

    /// Write the captured maximum into the matching config field.
    pub fn commit(self, config: &mut TimerConfig) {
        match self.kind {
            CalibrationKind::ShotThreshold => config.shot_threshold_rms = self.peak,
            CalibrationKind::RecoilThreshold => config.recoil_threshold_g = self.peak,
        }
        config.clamp();
    }
}

pub struct OffsetCalibration {
    candidate_ms: i64,
    beep_tone_hz: i32,
    beep_duration_ms: u64,
}

impl OffsetCalibration {
    pub fn new(current_offset_ms: i64, beep_tone_hz: i32, beep_duration_ms: u64) -> Self {
        Self {
            candidate_ms: current_offset_ms.clamp(BT_AUDIO_OFFSET_MIN_MS, BT_AUDIO_OFFSET_MAX_MS),
            beep_tone_hz,
            beep_duration_ms,
        }
    }

    pub fn candidate_ms(&self) -> i64 {
        self.candidate_ms
    }

    /// Step the candidate and replay the comparison cue on both paths.
    pub fn adjust(&mut self, steps: i64, scheduler: &AudioPathScheduler) {
        self.candidate_ms = (self.candidate_ms + steps * BT_AUDIO_OFFSET_STEP_MS)
            .clamp(BT_AUDIO_OFFSET_MIN_MS, BT_AUDIO_OFFSET_MAX_MS);
        scheduler.schedule_tone(
            self.beep_tone_hz,
            self.beep_duration_ms,
            ToneMode::SyncCalibration {
                offset_ms: self.candidate_ms,
            },
        );
        tracing::debug!("offset candidate now {} ms", self.candidate_ms);
    }

    /// Adopt the candidate for both the persisted config and the live
    /// scheduler.
    pub fn commit(self, config: &mut TimerConfig, scheduler: &mut AudioPathScheduler) {
        config.bt_audio_offset_ms = self.candidate_ms;
        scheduler.set_offset_ms(self.candidate_ms);
        tracing::info!("stream offset committed: {} ms", self.candidate_ms);
    }
}
