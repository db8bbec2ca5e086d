/// End-to-end timing runs against the manual clock and scripted sensors:
/// scheduling deadlines, the detection barrier, split bookkeeping and the
/// par cue plan, all without real audio hardware.
use std::sync::Arc;

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use shot_timer::audio::{
    AudioPathScheduler, BuzzerActuator, FeedbackSequencer, LoggingToneLine, ToneMode, TonePlanSlot,
};
use shot_timer::clock::ManualClock;
use shot_timer::detection::{DetectionEngine, DirectAudioPolicy, FusedAudioRecoilPolicy};
use shot_timer::display::NullView;
use shot_timer::sensors::{AccelSource, MicLevelSource};
use shot_timer::timer::{ModeStateMachine, ParSequencer, StopReason, TimerPhase};
use shot_timer::{PracticeMode, TimeSource, TransportStatus};

/// Mic whose peak rises at scripted instants (plus an optional ambient
/// floor), evaluated lazily against the manual clock.
struct ScriptedMic {
    clock: Arc<ManualClock>,
    events: Vec<(u64, f32)>,
    ambient: f32,
    peak: f32,
}

impl ScriptedMic {
    fn new(clock: Arc<ManualClock>, events: Vec<(u64, f32)>) -> Self {
        Self {
            clock,
            events,
            ambient: 0.0,
            peak: 0.0,
        }
    }

    fn with_ambient(clock: Arc<ManualClock>, ambient: f32) -> Self {
        Self {
            clock,
            events: Vec::new(),
            ambient,
            peak: 0.0,
        }
    }
}

impl MicLevelSource for ScriptedMic {
    fn update(&mut self) {
        let now = self.clock.now_ms();
        if self.ambient > self.peak {
            self.peak = self.ambient;
        }
        for &(at_ms, level) in &self.events {
            if now >= at_ms && now < at_ms + 50 && level > self.peak {
                self.peak = level;
            }
        }
    }

    fn peak_rms(&self) -> f32 {
        self.peak
    }

    fn reset_peak(&mut self) {
        self.peak = 0.0;
    }
}

/// Accelerometer returning a scripted z spike inside [start, end) windows
/// and a 1 g resting reading otherwise.
struct ScriptedAccel {
    clock: Arc<ManualClock>,
    spikes: Vec<(u64, u64, f32)>,
}

impl AccelSource for ScriptedAccel {
    fn accel(&mut self) -> [f32; 3] {
        let now = self.clock.now_ms();
        for &(start_ms, end_ms, z) in &self.spikes {
            if now >= start_ms && now < end_ms {
                return [0.0, 0.0, z];
            }
        }
        [0.0, 0.0, 1.0]
    }
}

struct Harness {
    clock: Arc<ManualClock>,
    scheduler: AudioPathScheduler,
    machine: ModeStateMachine,
    feedback: FeedbackSequencer,
}

impl Harness {
    fn new(policy: Box<dyn shot_timer::detection::ShotPolicy>, max_shots: usize) -> Self {
        Self::with_beep(policy, max_shots, 150)
    }

    fn with_beep(
        policy: Box<dyn shot_timer::detection::ShotPolicy>,
        max_shots: usize,
        beep_duration_ms: u64,
    ) -> Self {
        let clock = ManualClock::new();
        let (buzzer, _join) = BuzzerActuator::spawn(
            Box::new(LoggingToneLine::new("a")),
            Box::new(LoggingToneLine::new("b")),
        );
        let scheduler = AudioPathScheduler::new(
            TonePlanSlot::new(),
            buzzer,
            TransportStatus::new(),
            clock.clone(),
            0,
        );
        let machine = ModeStateMachine::new(
            PracticeMode::LiveFire,
            DetectionEngine::new(policy),
            max_shots,
            2000,
            beep_duration_ms,
        );
        Self {
            clock,
            scheduler,
            machine,
            feedback: FeedbackSequencer::new(),
        }
    }

    /// Tick the machine every 10 ms up to and including `until_ms`.
    fn run_until(
        &mut self,
        until_ms: u64,
        mic: &mut ScriptedMic,
        mut accel: Option<&mut ScriptedAccel>,
    ) {
        while self.clock.now_ms() < until_ms {
            self.clock.advance_ms(10);
            let now = self.clock.now_ms();
            let accel_dyn = accel.as_mut().map(|a| &mut **a as &mut dyn AccelSource);
            self.machine.tick(
                now,
                false,
                &self.scheduler,
                &mut self.feedback,
                mic,
                accel_dyn,
                &mut NullView,
            );
        }
    }

    fn shots(&self) -> Vec<(u64, f32)> {
        self.machine
            .session()
            .map(|s| {
                s.shots()
                    .iter()
                    .map(|r| (r.timestamp_ms, r.split_seconds))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[test]
fn test_disconnected_cue_deadline_covers_buzzer_guard() {
    let harness = Harness::new(Box::new(DirectAudioPolicy::new(1000.0)), 5);
    let scheduled = harness
        .scheduler
        .schedule_tone(2000, 150, ToneMode::Immediate);
    assert_eq!(scheduled.audio_end_ms, 155);
}

#[test]
fn test_negative_offset_advances_stream_start() {
    let clock = ManualClock::new();
    let (buzzer, _join) = BuzzerActuator::spawn(
        Box::new(LoggingToneLine::new("a")),
        Box::new(LoggingToneLine::new("b")),
    );
    let scheduler = AudioPathScheduler::new(
        TonePlanSlot::new(),
        buzzer,
        TransportStatus::connected(),
        clock.clone(),
        -200,
    );

    clock.set_ms(1000);
    let scheduled = scheduler.schedule_tone(2000, 150, ToneMode::WithOffset);
    assert_eq!(scheduled.start_ms, 800);
}

#[test]
fn test_three_shot_string_records_expected_splits() {
    let mut harness = Harness::new(Box::new(DirectAudioPolicy::new(1000.0)), 3);
    let mut mic = ScriptedMic::new(
        harness.clock.clone(),
        vec![(850, 45_000.0), (1050, 45_000.0), (1250, 45_000.0)],
    );

    harness.machine.start(&harness.scheduler);
    harness.run_until(2000, &mut mic, None);

    let shots = harness.shots();
    assert_eq!(shots.len(), 3);
    assert_relative_eq!(shots[0].1, 0.1, epsilon = 0.011);
    assert_relative_eq!(shots[1].1, 0.2, epsilon = 0.011);
    assert_relative_eq!(shots[2].1, 0.2, epsilon = 0.011);

    match harness.machine.phase() {
        TimerPhase::Stopped { reason, .. } => {
            assert_eq!(*reason, StopReason::MaxShotsReached);
        }
        other => panic!("expected Stopped, got {other:?}"),
    }
}

#[test]
fn test_detection_barrier_holds_until_cue_audio_completes() {
    // A 1 s start cue finishes after the 750 ms post-beep delay, so the
    // barrier is the audio deadline, not the start instant.
    let mut harness = Harness::with_beep(Box::new(DirectAudioPolicy::new(1000.0)), 5, 1000);
    let mut mic = ScriptedMic::with_ambient(harness.clock.clone(), 45_000.0);

    harness.machine.start(&harness.scheduler);
    harness.run_until(1000, &mut mic, None);
    assert!(harness.shots().is_empty());

    harness.run_until(1100, &mut mic, None);
    let shots = harness.shots();
    assert_eq!(shots.len(), 1);
    assert!(shots[0].0 >= 1005);
}

#[test]
fn test_refractory_window_suppresses_double_count() {
    let mut harness = Harness::new(Box::new(DirectAudioPolicy::new(1000.0)), 5);
    let mut mic = ScriptedMic::new(
        harness.clock.clone(),
        vec![(850, 45_000.0), (950, 45_000.0), (1150, 45_000.0)],
    );

    harness.machine.start(&harness.scheduler);
    harness.run_until(2000, &mut mic, None);

    let shots = harness.shots();
    assert_eq!(shots.len(), 2);
    assert_eq!(shots[0].0, 850);
    assert_eq!(shots[1].0, 1150);
}

#[test]
fn test_recoil_confirmed_shot_lands_at_acoustic_anchor() {
    let mut harness = Harness::new(
        Box::new(FusedAudioRecoilPolicy::new(1000.0, 1.5)),
        5,
    );
    let mut mic = ScriptedMic::new(harness.clock.clone(), vec![(850, 45_000.0)]);
    let mut accel = ScriptedAccel {
        clock: harness.clock.clone(),
        spikes: vec![(880, 910, 3.0)],
    };

    harness.machine.start(&harness.scheduler);
    harness.run_until(2000, &mut mic, Some(&mut accel));

    let shots = harness.shots();
    assert_eq!(shots.len(), 1);
    assert_eq!(shots[0].0, 850);
    assert_relative_eq!(shots[0].1, 0.1, epsilon = 0.011);
}

#[test]
fn test_unconfirmed_peak_leaves_no_record() {
    let mut harness = Harness::new(
        Box::new(FusedAudioRecoilPolicy::new(1000.0, 1.5)),
        5,
    );
    let mut mic = ScriptedMic::new(harness.clock.clone(), vec![(850, 45_000.0)]);

    harness.machine.start(&harness.scheduler);
    harness.run_until(2000, &mut mic, None);
    assert!(harness.shots().is_empty());
}

#[test]
fn test_par_cues_follow_cumulative_gap_plan() {
    let clock = ManualClock::new();
    // Connected, so cues land in the tone plan slot where their timing is
    // observable without real playback.
    let transport = TransportStatus::connected();
    let slot = TonePlanSlot::new();
    let (buzzer, _join) = BuzzerActuator::spawn(
        Box::new(LoggingToneLine::new("a")),
        Box::new(LoggingToneLine::new("b")),
    );
    let scheduler =
        AudioPathScheduler::new(slot.clone(), buzzer, transport, clock.clone(), 0);

    let mut sequencer = ParSequencer::new(2000, 150);
    let mut rng = StdRng::seed_from_u64(11);
    let start = sequencer.start(0, &[1.0, 1.5], 2, &mut rng);

    clock.set_ms(start);
    sequencer.tick(start, &scheduler);
    assert!(slot.snapshot().is_idle());

    clock.set_ms(start + 1000);
    sequencer.tick(start + 1000, &scheduler);
    let first = slot.snapshot().pending.unwrap();
    assert_eq!(first.scheduled_start_ms, start + 1000);

    clock.set_ms(start + 2500);
    assert!(sequencer.tick(start + 2500, &scheduler));
    let second = slot.snapshot().pending.unwrap();
    assert_eq!(second.scheduled_start_ms, start + 2500);

    // Winds down after the final cue's audio deadline and clears the slot.
    clock.set_ms(start + 3500);
    assert!(!sequencer.tick(start + 3500, &scheduler));
    assert!(slot.snapshot().is_idle());
}
