use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rodio::{OutputStream, Sink};

use shot_timer::audio::{
    AudioPathScheduler, BuzzerActuator, FeedbackSequencer, LoggingToneLine, SampleSynthesizer,
    TonePlanSlot,
};
use shot_timer::clock::{MonotonicClock, SharedClock};
use shot_timer::detection::{DetectionEngine, DirectAudioPolicy};
use shot_timer::display::ConsoleView;
use shot_timer::sensors::MicLevelSource;
use shot_timer::session::PracticeMode;
use shot_timer::timer::{ModeStateMachine, ParSequencer, TickOutcome, TimerPhase};
use shot_timer::{AudioError, TimerConfig, TransportStatus};

/// Mic stand-in for the demo: raises a loud peak at each scripted instant.
struct SimulatedMic {
    clock: SharedClock,
    shot_times_ms: Vec<u64>,
    next: usize,
    peak: f32,
}

impl SimulatedMic {
    fn new(clock: SharedClock, shot_times_ms: Vec<u64>) -> Self {
        Self {
            clock,
            shot_times_ms,
            next: 0,
            peak: 0.0,
        }
    }
}

impl MicLevelSource for SimulatedMic {
    fn update(&mut self) {
        let now = self.clock.now_ms();
        while self.next < self.shot_times_ms.len() && now >= self.shot_times_ms[self.next] {
            self.peak = 45_000.0;
            self.next += 1;
        }
    }

    fn peak_rms(&self) -> f32 {
        self.peak
    }

    fn reset_peak(&mut self) {
        self.peak = 0.0;
    }
}

/// Bring up the streamed output path and attach the synthesizer. The
/// returned pair must stay alive for playback to continue.
fn connect_stream(
    config: &TimerConfig,
    slot: &TonePlanSlot,
    clock: &SharedClock,
    transport: &TransportStatus,
) -> Result<(OutputStream, Sink), AudioError> {
    let (stream, handle) =
        OutputStream::try_default().map_err(|e| AudioError::StreamInitFailed(Box::new(e)))?;
    let sink = Sink::try_new(&handle).map_err(|e| AudioError::PlaybackFailed(Box::new(e)))?;

    let synth = SampleSynthesizer::new(
        slot.clone(),
        clock.clone(),
        transport.clone(),
        config.idle_keep_alive,
    );
    sink.set_volume(config.bt_volume as f32 / 100.0);
    sink.append(synth);
    Ok((stream, sink))
}

fn initialize_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    println!("===========================================");
    println!("  Shot Timer - Practice Timing Engine");
    println!("===========================================\n");

    initialize_tracing();

    // Load configuration
    let config = match TimerConfig::load() {
        Ok(config) => {
            println!("✓ Configuration loaded from {}", TimerConfig::config_path_display());
            println!("  Max shots: {}", config.max_shots);
            println!(
                "  Start beep: {} Hz / {} ms",
                config.beep_tone_hz, config.beep_duration_ms
            );
            println!("  Shot threshold: {:.0} RMS", config.shot_threshold_rms);
            println!("  Stream offset: {} ms\n", config.bt_audio_offset_ms);
            config
        }
        Err(e) => {
            eprintln!("✗ Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let clock: SharedClock = Arc::new(MonotonicClock::new());
    let transport = TransportStatus::new();
    let slot = TonePlanSlot::new();

    // Buzzer worker with log-backed tone lines (no GPIO on a desktop).
    let (buzzer, _buzzer_join) = BuzzerActuator::spawn(
        Box::new(LoggingToneLine::new("buzzer-a")),
        Box::new(LoggingToneLine::new("buzzer-b")),
    );
    println!("✓ Buzzer worker started");

    // Stream output if an audio device is available; otherwise every cue
    // falls back to the buzzer path.
    let _stream_output = match connect_stream(&config, &slot, &clock, &transport) {
        Ok(output) => {
            transport.set_connected(true);
            println!("✓ Audio stream connected");
            Some(output)
        }
        Err(e) => {
            eprintln!("✗ {}, using buzzer path", e);
            None
        }
    };

    let scheduler = AudioPathScheduler::new(
        slot,
        buzzer,
        transport.clone(),
        clock.clone(),
        config.bt_audio_offset_ms,
    );

    let running = Arc::new(AtomicBool::new(true));
    let running_for_handler = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!("\n\nShutting down...");
        running_for_handler.store(false, Ordering::SeqCst);
    }) {
        eprintln!("✗ Failed to set Ctrl-C handler: {}", e);
    }

    println!("\n===========================================");
    println!("  Running demo: live fire, then dry fire");
    println!("  Press Ctrl+C to quit");
    println!("===========================================\n");

    run_live_fire_demo(&config, &clock, &scheduler, &running);
    if running.load(Ordering::SeqCst) {
        run_dry_fire_demo(&config, &clock, &scheduler, &running);
    }

    println!("\nDone.");
}

/// Scripted live-fire run: three simulated shots after the start beep.
fn run_live_fire_demo(
    config: &TimerConfig,
    clock: &SharedClock,
    scheduler: &AudioPathScheduler,
    running: &Arc<AtomicBool>,
) {
    println!("-- Live fire: three simulated shots --");

    let engine = DetectionEngine::new(Box::new(DirectAudioPolicy::new(config.shot_threshold_rms)));
    let mut machine = ModeStateMachine::new(
        PracticeMode::LiveFire,
        engine,
        config.max_shots,
        config.beep_tone_hz,
        config.beep_duration_ms,
    );
    let mut feedback = FeedbackSequencer::new();
    let mut view = ConsoleView::default();

    let demo_start = clock.now_ms();
    let mut mic = SimulatedMic::new(
        clock.clone(),
        vec![demo_start + 2000, demo_start + 2800, demo_start + 3900],
    );

    machine.start(scheduler);
    while running.load(Ordering::SeqCst) {
        let now = clock.now_ms();
        let outcome = machine.tick(
            now,
            false,
            scheduler,
            &mut feedback,
            &mut mic,
            None,
            &mut view,
        );
        feedback.tick(now, scheduler);

        if matches!(outcome, TickOutcome::Stopped(_)) || matches!(machine.phase(), TimerPhase::Stopped { .. }) {
            if !feedback.is_active() {
                break;
            }
        }
        // Safety stop for the scripted run.
        if now.saturating_sub(demo_start) > 25_000 {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }

    if let Some(session) = machine.session() {
        println!(
            "\nRun finished: {} shots, last split {:.2} s\n",
            session.shot_count(),
            session.last_split_seconds()
        );
    }
}

/// Dry-fire par sequence using the configured gaps.
fn run_dry_fire_demo(
    config: &TimerConfig,
    clock: &SharedClock,
    scheduler: &AudioPathScheduler,
    running: &Arc<AtomicBool>,
) {
    println!("-- Dry fire: {} par cues --", config.par_beep_count);

    let mut sequencer = ParSequencer::new(config.beep_tone_hz, config.beep_duration_ms);
    let mut rng = StdRng::from_entropy();
    let sequence_start = sequencer.start(
        clock.now_ms(),
        &config.par_times_sec,
        config.par_beep_count,
        &mut rng,
    );
    println!(
        "Sequence starts in {} ms",
        sequence_start.saturating_sub(clock.now_ms())
    );

    while running.load(Ordering::SeqCst) {
        let now = clock.now_ms();
        if !sequencer.tick(now, scheduler) {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    println!("Par sequence complete");
}
