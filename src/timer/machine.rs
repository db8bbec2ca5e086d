/// Timing-run state machine
///
/// One machine drives a single start-beep-to-stop run: it arms the start cue,
/// waits out the post-beep delay and the audio-completion barrier, feeds
/// sensor samples through the detection engine and decides when the run is
/// over. Everything is polled from the control loop; the machine never
/// sleeps and never owns the clock.
use crate::audio::feedback::FeedbackSequencer;
use crate::audio::scheduler::{AudioPathScheduler, ToneMode};
use crate::config::{POST_BEEP_DELAY_MS, TIMEOUT_DURATION_MS};
use crate::detection::{DetectionEngine, EngineEvent};
use crate::display::TimingView;
use crate::sensors::{recoil_magnitude, AccelSource, DetectionSample, MicLevelSource};
use crate::session::{PracticeMode, Session, ShotRecord};

/// Why a run ended. All of these are normal outcomes, not faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Manual,
    Timeout,
    MaxShotsReached,
}

/// Phase of the current run. Each variant carries only the state that phase
/// needs, so illegal combinations (a stopped run still listening, a ready
/// machine holding shots) cannot be represented.
#[derive(Debug)]
pub enum TimerPhase {
    Ready,
    /// Start cue armed, waiting for the post-beep delay to elapse.
    GetReady { session: Session, audio_end_ms: u64 },
    /// Run in progress. Detection only engages once `listening_active`,
    /// which requires both the start instant and the audio-completion
    /// barrier to have passed.
    Timing {
        session: Session,
        audio_end_ms: u64,
        listening_active: bool,
    },
    /// Terminal until an external `reset()`.
    Stopped { session: Session, reason: StopReason },
}

/// What one tick produced, for callers that log or chain behavior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Idle,
    Waiting,
    Listening,
    Shot(ShotRecord),
    Stopped(StopReason),
}

pub struct ModeStateMachine {
    mode: PracticeMode,
    phase: TimerPhase,
    engine: DetectionEngine,
    max_shots: usize,
    beep_tone_hz: i32,
    beep_duration_ms: u64,
}

impl ModeStateMachine {
    pub fn new(
        mode: PracticeMode,
        engine: DetectionEngine,
        max_shots: usize,
        beep_tone_hz: i32,
        beep_duration_ms: u64,
    ) -> Self {
        Self {
            mode,
            phase: TimerPhase::Ready,
            engine,
            max_shots,
            beep_tone_hz,
            beep_duration_ms,
        }
    }

    pub fn phase(&self) -> &TimerPhase {
        &self.phase
    }

    pub fn mode(&self) -> PracticeMode {
        self.mode
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.phase {
            TimerPhase::Ready => None,
            TimerPhase::GetReady { session, .. }
            | TimerPhase::Timing { session, .. }
            | TimerPhase::Stopped { session, .. } => Some(session),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self.phase,
            TimerPhase::GetReady { .. } | TimerPhase::Timing { .. }
        )
    }

    /// Arm the start cue and enter GetReady. No-op outside Ready.
    pub fn start(&mut self, scheduler: &AudioPathScheduler) {
        if !matches!(self.phase, TimerPhase::Ready) {
            return;
        }

        let scheduled =
            scheduler.schedule_tone(self.beep_tone_hz, self.beep_duration_ms, ToneMode::WithOffset);
        let start_time_ms = scheduled.issue_ms + POST_BEEP_DELAY_MS;

        tracing::info!(
            "{} run armed: start beep issued at {} ms, timing starts at {} ms, \
             audio done by {} ms",
            self.mode,
            scheduled.issue_ms,
            start_time_ms,
            scheduled.audio_end_ms
        );

        self.engine.reset();
        self.phase = TimerPhase::GetReady {
            session: Session::new(self.mode, start_time_ms, self.max_shots),
            audio_end_ms: scheduled.audio_end_ms,
        };
    }

    /// Drop the run and return to Ready, regardless of phase.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.phase = TimerPhase::Ready;
    }

    /// Advance one control-loop tick.
    pub fn tick(
        &mut self,
        now_ms: u64,
        stop_requested: bool,
        scheduler: &AudioPathScheduler,
        feedback: &mut FeedbackSequencer,
        mic: &mut dyn MicLevelSource,
        accel: Option<&mut dyn AccelSource>,
        view: &mut dyn TimingView,
    ) -> TickOutcome {
        match std::mem::replace(&mut self.phase, TimerPhase::Ready) {
            TimerPhase::Ready => TickOutcome::Idle,
            TimerPhase::GetReady {
                session,
                audio_end_ms,
            } => {
                if stop_requested {
                    return self.stop(now_ms, session, StopReason::Manual, scheduler, feedback);
                }
                if now_ms >= session.start_time_ms {
                    tracing::debug!("timing started at {} ms", now_ms);
                    self.phase = TimerPhase::Timing {
                        session,
                        audio_end_ms,
                        listening_active: false,
                    };
                } else {
                    view.show_timing(0.0, 0, 0.0);
                    self.phase = TimerPhase::GetReady {
                        session,
                        audio_end_ms,
                    };
                }
                TickOutcome::Waiting
            }
            TimerPhase::Timing {
                mut session,
                audio_end_ms,
                mut listening_active,
            } => {
                if stop_requested {
                    return self.stop(now_ms, session, StopReason::Manual, scheduler, feedback);
                }
                if self.timed_out(now_ms, &session) {
                    return self.stop(now_ms, session, StopReason::Timeout, scheduler, feedback);
                }

                let mut outcome = TickOutcome::Waiting;
                if !listening_active {
                    // Own cue audio must be fully out of the air before the
                    // mic peak means anything.
                    if now_ms >= audio_end_ms && now_ms >= session.start_time_ms {
                        listening_active = true;
                        mic.reset_peak();
                        tracing::debug!("listening opened at {} ms", now_ms);
                    }
                }

                if listening_active {
                    outcome = TickOutcome::Listening;
                    mic.update();
                    let sample = DetectionSample {
                        timestamp_ms: now_ms,
                        rms_peak: mic.peak_rms(),
                        recoil_magnitude: accel.map(|a| recoil_magnitude(a.accel())),
                    };
                    let (event, reset_peak) = self.engine.tick(&sample, &mut session);
                    if reset_peak {
                        mic.reset_peak();
                    }
                    match event {
                        EngineEvent::None => {}
                        EngineEvent::Shot(record) => outcome = TickOutcome::Shot(record),
                        EngineEvent::MaxShotsReached(_) => {
                            return self.stop(
                                now_ms,
                                session,
                                StopReason::MaxShotsReached,
                                scheduler,
                                feedback,
                            );
                        }
                    }
                }

                view.show_timing(
                    session.elapsed_seconds(now_ms),
                    session.shot_count(),
                    session.last_split_seconds(),
                );
                self.phase = TimerPhase::Timing {
                    session,
                    audio_end_ms,
                    listening_active,
                };
                outcome
            }
            stopped @ TimerPhase::Stopped { .. } => {
                self.phase = stopped;
                TickOutcome::Idle
            }
        }
    }

    fn timed_out(&self, now_ms: u64, session: &Session) -> bool {
        let reference_ms = match session.last_shot() {
            Some(shot) => shot.timestamp_ms,
            None => session.start_time_ms,
        };
        now_ms.saturating_sub(reference_ms) > TIMEOUT_DURATION_MS
    }

    fn stop(
        &mut self,
        now_ms: u64,
        session: Session,
        reason: StopReason,
        scheduler: &AudioPathScheduler,
        feedback: &mut FeedbackSequencer,
    ) -> TickOutcome {
        tracing::info!(
            "{} run stopped ({:?}): {} shots in {:.2} s",
            self.mode,
            reason,
            session.shot_count(),
            session.elapsed_seconds(now_ms).max(0.0)
        );
        scheduler.reset_state();
        feedback.play_outcome(now_ms, session.shot_count() > 0);
        self.engine.reset();
        self.phase = TimerPhase::Stopped { session, reason };
        TickOutcome::Stopped(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buzzer::{BuzzerActuator, LoggingToneLine};
    use crate::audio::tone::TonePlanSlot;
    use crate::clock::ManualClock;
    use crate::detection::DirectAudioPolicy;
    use crate::display::NullView;
    use crate::transport::TransportStatus;
    use std::sync::Arc;

    struct ScriptMic {
        peak: f32,
    }

    impl MicLevelSource for ScriptMic {
        fn update(&mut self) {}
        fn peak_rms(&self) -> f32 {
            self.peak
        }
        fn reset_peak(&mut self) {
            self.peak = 0.0;
        }
    }

    fn rig(max_shots: usize) -> (Arc<ManualClock>, AudioPathScheduler, ModeStateMachine) {
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
            DetectionEngine::new(Box::new(DirectAudioPolicy::new(1000.0))),
            max_shots,
            2000,
            150,
        );
        (clock, scheduler, machine)
    }

    fn quiet_tick(
        machine: &mut ModeStateMachine,
        scheduler: &AudioPathScheduler,
        now_ms: u64,
        peak: f32,
    ) -> TickOutcome {
        let mut feedback = FeedbackSequencer::new();
        let mut mic = ScriptMic { peak };
        machine.tick(
            now_ms,
            false,
            scheduler,
            &mut feedback,
            &mut mic,
            None,
            &mut NullView,
        )
    }

    #[test]
    fn test_start_enters_get_ready_with_post_beep_start_time() {
        let (clock, scheduler, mut machine) = rig(5);
        clock.set_ms(100);
        machine.start(&scheduler);

        match machine.phase() {
            TimerPhase::GetReady { session, .. } => {
                assert_eq!(session.start_time_ms, 100 + POST_BEEP_DELAY_MS);
            }
            other => panic!("expected GetReady, got {other:?}"),
        }
    }

    #[test]
    fn test_detection_waits_for_start_and_audio_barrier() {
        let (clock, scheduler, mut machine) = rig(5);
        clock.set_ms(0);
        machine.start(&scheduler);

        // Loud ticks before the barrier must not register.
        for t in [100, 300, 700, 749] {
            clock.set_ms(t);
            let outcome = quiet_tick(&mut machine, &scheduler, t, 50_000.0);
            assert!(!matches!(outcome, TickOutcome::Shot(_)));
        }
        assert_eq!(machine.session().map(Session::shot_count), Some(0));

        clock.set_ms(800);
        let outcome = quiet_tick(&mut machine, &scheduler, 800, 50_000.0);
        assert!(matches!(outcome, TickOutcome::Shot(r) if r.timestamp_ms == 800));
    }

    #[test]
    fn test_max_shots_stops_the_run() {
        let (clock, scheduler, mut machine) = rig(2);
        clock.set_ms(0);
        machine.start(&scheduler);

        clock.set_ms(1000);
        assert!(matches!(
            quiet_tick(&mut machine, &scheduler, 1000, 50_000.0),
            TickOutcome::Shot(_)
        ));
        clock.set_ms(1400);
        assert_eq!(
            quiet_tick(&mut machine, &scheduler, 1400, 50_000.0),
            TickOutcome::Stopped(StopReason::MaxShotsReached)
        );
        match machine.phase() {
            TimerPhase::Stopped { session, reason } => {
                assert_eq!(*reason, StopReason::MaxShotsReached);
                assert_eq!(session.shot_count(), 2);
            }
            other => panic!("expected Stopped, got {other:?}"),
        }
    }

    #[test]
    fn test_timeout_without_shots_measured_from_start() {
        let (clock, scheduler, mut machine) = rig(5);
        clock.set_ms(0);
        machine.start(&scheduler);

        let start = POST_BEEP_DELAY_MS;
        clock.set_ms(start + TIMEOUT_DURATION_MS);
        assert!(matches!(
            quiet_tick(&mut machine, &scheduler, start + TIMEOUT_DURATION_MS, 0.0),
            TickOutcome::Listening | TickOutcome::Waiting
        ));

        clock.set_ms(start + TIMEOUT_DURATION_MS + 1);
        assert_eq!(
            quiet_tick(&mut machine, &scheduler, start + TIMEOUT_DURATION_MS + 1, 0.0),
            TickOutcome::Stopped(StopReason::Timeout)
        );
    }

    #[test]
    fn test_manual_stop_during_get_ready() {
        let (clock, scheduler, mut machine) = rig(5);
        clock.set_ms(0);
        machine.start(&scheduler);

        let mut feedback = FeedbackSequencer::new();
        let mut mic = ScriptMic { peak: 0.0 };
        clock.set_ms(100);
        let outcome = machine.tick(
            100,
            true,
            &scheduler,
            &mut feedback,
            &mut mic,
            None,
            &mut NullView,
        );
        assert_eq!(outcome, TickOutcome::Stopped(StopReason::Manual));
        assert!(feedback.is_active());
    }

    #[test]
    fn test_reset_returns_to_ready() {
        let (clock, scheduler, mut machine) = rig(5);
        clock.set_ms(0);
        machine.start(&scheduler);
        machine.reset();
        assert!(matches!(machine.phase(), TimerPhase::Ready));
        assert!(machine.session().is_none());
    }
}
