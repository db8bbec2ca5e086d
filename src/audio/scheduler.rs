/// Audio path scheduler
///
/// Decides buzzer-vs-stream per request, computes latency-compensated start
/// times and the audio-completion deadline the timing loop uses as its
/// detection barrier. Connectivity is queried at call time; a mid-tone
/// disconnect is not a fault, the in-flight tone free-runs to its end.
use crate::audio::buzzer::BuzzerHandle;
use crate::audio::tone::{BuzzerRequest, ToneRequest, TonePlanSlot};
use crate::clock::SharedClock;
use crate::config::{
    BT_AUDIO_OFFSET_MAX_MS, BT_AUDIO_OFFSET_MIN_MS, BUZZER_GUARD_MS, STREAM_GUARD_MS,
};
use crate::transport::TransportStatus;

/// How a cue's start time relates to the issue instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneMode {
    /// Start now, ignoring the configured stream offset (UI feedback).
    Immediate,
    /// Apply the configured stream offset (timing-critical start beeps).
    WithOffset,
    /// Drive buzzer and stream together with a candidate offset, so both
    /// paths can be compared by ear during calibration.
    SyncCalibration { offset_ms: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPath {
    Buzzer,
    Stream,
    /// Only SyncCalibration drives both paths at once.
    Both,
}

/// Receipt for one scheduled cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTone {
    pub path: OutputPath,
    pub issue_ms: u64,
    pub start_ms: u64,
    /// Earliest instant the cue audio is guaranteed finished on every path
    /// it was sent to. Consumed as the detection barrier.
    pub audio_end_ms: u64,
}

pub struct AudioPathScheduler {
    slot: TonePlanSlot,
    buzzer: BuzzerHandle,
    transport: TransportStatus,
    clock: SharedClock,
    offset_ms: i64,
}

impl AudioPathScheduler {
    pub fn new(
        slot: TonePlanSlot,
        buzzer: BuzzerHandle,
        transport: TransportStatus,
        clock: SharedClock,
        offset_ms: i64,
    ) -> Self {
        Self {
            slot,
            buzzer,
            transport,
            clock,
            offset_ms: offset_ms.clamp(BT_AUDIO_OFFSET_MIN_MS, BT_AUDIO_OFFSET_MAX_MS),
        }
    }

    pub fn offset_ms(&self) -> i64 {
        self.offset_ms
    }

    /// Update the offset applied by `WithOffset` requests (clamped).
    pub fn set_offset_ms(&mut self, offset_ms: i64) {
        self.offset_ms = offset_ms.clamp(BT_AUDIO_OFFSET_MIN_MS, BT_AUDIO_OFFSET_MAX_MS);
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Schedule one cue. Exactly one path is armed unless the mode is
    /// SyncCalibration. Degraded requests (zero duration) touch no path.
    pub fn schedule_tone(
        &self,
        frequency_hz: i32,
        duration_ms: u64,
        mode: ToneMode,
    ) -> ScheduledTone {
        let issue_ms = self.clock.now_ms();

        match mode {
            ToneMode::SyncCalibration { offset_ms } => {
                self.schedule_sync_calibration(frequency_hz, duration_ms, offset_ms, issue_ms)
            }
            ToneMode::Immediate | ToneMode::WithOffset => {
                let offset_ms = match mode {
                    ToneMode::WithOffset => self.offset_ms,
                    _ => 0,
                };
                if self.transport.is_connected() {
                    self.arm_stream(frequency_hz, duration_ms, offset_ms, issue_ms, false)
                } else {
                    self.arm_buzzer(frequency_hz, duration_ms, issue_ms)
                }
            }
        }
    }

    /// Audio-completion deadline for a cue issued at `issue_ms` on `path`,
    /// matching the actuator's post-tone guard and the stream's scheduling
    /// slack respectively.
    pub fn compute_audio_end_time(
        issue_ms: u64,
        start_ms: u64,
        duration_ms: u64,
        path: OutputPath,
    ) -> u64 {
        match path {
            OutputPath::Buzzer => issue_ms + duration_ms + BUZZER_GUARD_MS,
            OutputPath::Stream => issue_ms.max(start_ms) + duration_ms + STREAM_GUARD_MS,
            OutputPath::Both => {
                let buzzer = issue_ms + duration_ms + BUZZER_GUARD_MS;
                let stream = issue_ms.max(start_ms) + duration_ms + STREAM_GUARD_MS;
                buzzer.max(stream)
            }
        }
    }

    /// Atomically drop any pending or active stream tone. Called on mode
    /// exit, disconnect or cancel; a no-op on an idle plan.
    pub fn reset_state(&self) {
        self.slot.clear();
    }

    fn arm_stream(
        &self,
        frequency_hz: i32,
        duration_ms: u64,
        offset_ms: i64,
        issue_ms: u64,
        sync_calibration: bool,
    ) -> ScheduledTone {
        let start_ms = apply_offset(issue_ms, offset_ms);
        // Degraded requests never touch the plan; publishing one would
        // clobber a tone that is still rendering.
        if frequency_hz > 0 && duration_ms > 0 {
            self.slot.publish(ToneRequest {
                frequency_hz,
                duration_ms,
                scheduled_start_ms: start_ms,
                sync_calibration,
            });
            tracing::debug!(
                "armed stream tone {} Hz / {} ms at t={}",
                frequency_hz,
                duration_ms,
                start_ms
            );
        }
        ScheduledTone {
            path: OutputPath::Stream,
            issue_ms,
            start_ms,
            audio_end_ms: Self::compute_audio_end_time(
                issue_ms,
                start_ms,
                duration_ms,
                OutputPath::Stream,
            ),
        }
    }

    fn arm_buzzer(&self, frequency_hz: i32, duration_ms: u64, issue_ms: u64) -> ScheduledTone {
        if duration_ms > 0 {
            self.buzzer.enqueue(BuzzerRequest {
                frequency_hz,
                duration_ms,
            });
        }
        ScheduledTone {
            path: OutputPath::Buzzer,
            issue_ms,
            start_ms: issue_ms,
            audio_end_ms: Self::compute_audio_end_time(
                issue_ms,
                issue_ms,
                duration_ms,
                OutputPath::Buzzer,
            ),
        }
    }

    fn schedule_sync_calibration(
        &self,
        frequency_hz: i32,
        duration_ms: u64,
        offset_ms: i64,
        issue_ms: u64,
    ) -> ScheduledTone {
        // Fresh comparison: whatever was armed before is stale now.
        self.slot.clear();

        let buzzer = self.arm_buzzer(frequency_hz, duration_ms, issue_ms);
        if !self.transport.is_connected() {
            return buzzer;
        }

        let stream = self.arm_stream(frequency_hz, duration_ms, offset_ms, issue_ms, true);
        ScheduledTone {
            path: OutputPath::Both,
            issue_ms,
            start_ms: stream.start_ms,
            audio_end_ms: buzzer.audio_end_ms.max(stream.audio_end_ms),
        }
    }
}

/// Saturating issue-time shift; a negative offset cannot reach before the
/// clock epoch.
fn apply_offset(issue_ms: u64, offset_ms: i64) -> u64 {
    (issue_ms as i64 + offset_ms).max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buzzer::{BuzzerActuator, ToneLine};
    use crate::clock::ManualClock;
    use std::sync::Arc;

    struct SilentLine;
    impl ToneLine for SilentLine {
        fn start(&mut self, _frequency_hz: u32) {}
        fn stop(&mut self) {}
    }

    fn scheduler_rig(
        offset_ms: i64,
    ) -> (
        AudioPathScheduler,
        TonePlanSlot,
        Arc<ManualClock>,
        TransportStatus,
    ) {
        let slot = TonePlanSlot::new();
        let clock = ManualClock::new();
        let transport = TransportStatus::new();
        let (buzzer, _join) = BuzzerActuator::spawn(Box::new(SilentLine), Box::new(SilentLine));
        let scheduler = AudioPathScheduler::new(
            slot.clone(),
            buzzer,
            transport.clone(),
            clock.clone(),
            offset_ms,
        );
        (scheduler, slot, clock, transport)
    }

    #[test]
    fn test_disconnected_immediate_goes_to_buzzer() {
        // Disconnected, 2000 Hz / 150 ms at t=0.
        let (scheduler, slot, _clock, _transport) = scheduler_rig(0);

        let tone = scheduler.schedule_tone(2000, 150, ToneMode::Immediate);

        assert_eq!(tone.path, OutputPath::Buzzer);
        assert_eq!(tone.audio_end_ms, 155);
        assert!(slot.snapshot().is_idle(), "stream plan must stay untouched");
    }

    #[test]
    fn test_connected_with_offset_arms_stream_only() {
        // Connected, offset -200, issued at t=1000.
        let (scheduler, slot, clock, transport) = scheduler_rig(-200);
        transport.set_connected(true);
        clock.set_ms(1000);

        let tone = scheduler.schedule_tone(2000, 150, ToneMode::WithOffset);

        assert_eq!(tone.path, OutputPath::Stream);
        assert_eq!(tone.start_ms, 800);
        let pending = slot.snapshot().pending.unwrap();
        assert_eq!(pending.scheduled_start_ms, 800);
        assert_eq!(pending.frequency_hz, 2000);
        // End deadline counts from issue time for early starts.
        assert_eq!(tone.audio_end_ms, 1000 + 150 + STREAM_GUARD_MS);
    }

    #[test]
    fn test_immediate_ignores_configured_offset() {
        let (scheduler, slot, clock, transport) = scheduler_rig(-500);
        transport.set_connected(true);
        clock.set_ms(2000);

        let tone = scheduler.schedule_tone(880, 100, ToneMode::Immediate);

        assert_eq!(tone.start_ms, 2000);
        assert_eq!(slot.snapshot().pending.unwrap().scheduled_start_ms, 2000);
    }

    #[test]
    fn test_positive_offset_pushes_end_time_out() {
        let (scheduler, _slot, clock, transport) = scheduler_rig(300);
        transport.set_connected(true);
        clock.set_ms(1000);

        let tone = scheduler.schedule_tone(2000, 150, ToneMode::WithOffset);
        assert_eq!(tone.start_ms, 1300);
        assert_eq!(tone.audio_end_ms, 1300 + 150 + STREAM_GUARD_MS);
    }

    #[test]
    fn test_sync_calibration_uses_both_paths() {
        let (scheduler, slot, clock, transport) = scheduler_rig(0);
        transport.set_connected(true);
        clock.set_ms(500);

        let tone =
            scheduler.schedule_tone(2000, 150, ToneMode::SyncCalibration { offset_ms: 200 });

        assert_eq!(tone.path, OutputPath::Both);
        let pending = slot.snapshot().pending.unwrap();
        assert!(pending.sync_calibration);
        assert_eq!(pending.scheduled_start_ms, 700);
        // Both-path deadline covers the later of the two paths.
        assert_eq!(tone.audio_end_ms, 700 + 150 + STREAM_GUARD_MS);
    }

    #[test]
    fn test_sync_calibration_disconnected_falls_back_to_buzzer() {
        let (scheduler, slot, _clock, _transport) = scheduler_rig(0);

        let tone =
            scheduler.schedule_tone(2000, 150, ToneMode::SyncCalibration { offset_ms: -100 });

        assert_eq!(tone.path, OutputPath::Buzzer);
        assert!(slot.snapshot().is_idle());
    }

    #[test]
    fn test_zero_duration_touches_no_path() {
        let (scheduler, slot, _clock, transport) = scheduler_rig(0);
        transport.set_connected(true);

        let tone = scheduler.schedule_tone(0, 0, ToneMode::Immediate);
        assert!(slot.snapshot().is_idle());
        assert_eq!(tone.audio_end_ms, STREAM_GUARD_MS);
    }

    #[test]
    fn test_degraded_request_leaves_armed_plan_intact() {
        let (scheduler, slot, _clock, transport) = scheduler_rig(0);
        transport.set_connected(true);

        scheduler.schedule_tone(2000, 150, ToneMode::Immediate);

        // Zero frequency with a positive duration must not replace the
        // armed cue.
        scheduler.schedule_tone(0, 150, ToneMode::Immediate);
        assert_eq!(slot.snapshot().pending.unwrap().frequency_hz, 2000);
    }

    #[test]
    fn test_reset_state_clears_pending_plan() {
        let (scheduler, slot, _clock, transport) = scheduler_rig(0);
        transport.set_connected(true);

        scheduler.schedule_tone(2000, 150, ToneMode::Immediate);
        assert!(!slot.snapshot().is_idle());

        scheduler.reset_state();
        assert!(slot.snapshot().is_idle());

        // No-op on an already idle plan.
        scheduler.reset_state();
        assert!(slot.snapshot().is_idle());
    }

    #[test]
    fn test_negative_offset_saturates_at_epoch() {
        let (scheduler, _slot, clock, transport) = scheduler_rig(-1000);
        transport.set_connected(true);
        clock.set_ms(200);

        let tone = scheduler.schedule_tone(2000, 150, ToneMode::WithOffset);
        assert_eq!(tone.start_ms, 0);
    }

    #[test]
    fn test_offset_setter_clamps() {
        let (mut scheduler, _slot, _clock, _transport) = scheduler_rig(0);
        scheduler.set_offset_ms(-9999);
        assert_eq!(scheduler.offset_ms(), BT_AUDIO_OFFSET_MIN_MS);
        scheduler.set_offset_ms(9999);
        assert_eq!(scheduler.offset_ms(), BT_AUDIO_OFFSET_MAX_MS);
    }
}
