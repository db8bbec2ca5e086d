use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::ConfigError;

// --- Tuning constants ---
// The refractory, recoil-window and offset bounds are hardware-derived
// tuning values; anything a user would reasonably retune lives in
// `TimerConfig` instead.
pub const SHOT_REFRACTORY_MS: u64 = 150;
pub const TIMEOUT_DURATION_MS: u64 = 15_000;
pub const POST_BEEP_DELAY_MS: u64 = 750;
pub const RECOIL_DETECTION_WINDOW_MS: u64 = 100;
pub const BUZZER_GUARD_MS: u64 = 5;
pub const STREAM_GUARD_MS: u64 = 150;
pub const MAX_SHOTS_LIMIT: usize = 20;
pub const MAX_PAR_BEEPS: usize = 10;
pub const DRY_FIRE_RANDOM_DELAY_MIN_MS: u64 = 2000;
pub const DRY_FIRE_RANDOM_DELAY_MAX_MS: u64 = 5000;
pub const BEEP_NOTE_DURATION_MS: u64 = 150;
pub const BEEP_NOTE_DELAY_MS: u64 = 50;
pub const BT_AUDIO_OFFSET_MIN_MS: i64 = -1000;
pub const BT_AUDIO_OFFSET_MAX_MS: i64 = 500;
pub const BT_AUDIO_OFFSET_STEP_MS: i64 = 50;
pub const BUZZER_QUEUE_LENGTH: usize = 10;

fn default_par_times() -> Vec<f32> {
    vec![1.0; MAX_PAR_BEEPS]
}

fn default_keep_alive() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Shots after which a session stops automatically (1-20)
    pub max_shots: usize,

    /// Start beep duration in milliseconds
    pub beep_duration_ms: u64,

    /// Start beep frequency in Hz
    pub beep_tone_hz: i32,

    /// Microphone RMS peak above which a shot candidate is registered
    pub shot_threshold_rms: f32,

    /// Accelerometer magnitude (g) confirming recoil in Noisy Range mode
    pub recoil_threshold_g: f32,

    /// Number of par cues in a dry-fire sequence (1-10)
    pub par_beep_count: usize,

    /// Gap before each par cue, in seconds (10 slots)
    #[serde(default = "default_par_times")]
    pub par_times_sec: Vec<f32>,

    /// Offset applied to scheduled stream tones, ms (-1000..=500).
    /// Negative values arm the stream early to absorb sink latency.
    pub bt_audio_offset_ms: i64,

    /// Streamed output volume (0-100)
    pub bt_volume: u8,

    /// Sink device name used by the transport layer for auto-connect
    #[serde(default)]
    pub bt_device_name: String,

    #[serde(default)]
    pub bt_auto_reconnect: bool,

    /// Emit a near-silent carrier while idle and connected, so sinks that
    /// sleep on silence keep the link open. Overridable per sink.
    #[serde(default = "default_keep_alive")]
    pub idle_keep_alive: bool,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            max_shots: 10,
            beep_duration_ms: 150,
            beep_tone_hz: 2000,
            shot_threshold_rms: 15_311.0,
            recoil_threshold_g: 1.5,
            par_beep_count: 3,
            par_times_sec: default_par_times(),
            bt_audio_offset_ms: 0,
            bt_volume: 80,
            bt_device_name: String::new(),
            bt_auto_reconnect: false,
            idle_keep_alive: true,
        }
    }
}

impl TimerConfig {
    /// Load configuration from the platform config directory, creating the
    /// default file on first run. Out-of-range values are clamped, never
    /// rejected.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content =
                fs::read_to_string(&config_path).map_err(|e| ConfigError::LoadFailed {
                    path: config_path.display().to_string(),
                    source: Box::new(e),
                })?;
            let mut config: TimerConfig =
                serde_json::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: config_path.display().to_string(),
                    source: Box::new(e),
                })?;
            config.clamp();
            tracing::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = TimerConfig::default();
            config.save()?;
            tracing::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::DirectoryCreationFailed {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: config_path.display().to_string(),
            source: Box::new(e),
        })?;
        fs::write(&config_path, json).map_err(|e| ConfigError::SaveFailed {
            path: config_path.display().to_string(),
            source: Box::new(e),
        })?;

        Ok(())
    }

    /// Clamp every field into its valid range, mirroring what the detection
    /// and scheduling code assumes.
    pub fn clamp(&mut self) {
        self.max_shots = self.max_shots.clamp(1, MAX_SHOTS_LIMIT);
        self.par_beep_count = self.par_beep_count.clamp(1, MAX_PAR_BEEPS);
        self.par_times_sec.resize(MAX_PAR_BEEPS, 1.0);
        for t in &mut self.par_times_sec {
            if !t.is_finite() || *t < 0.0 {
                *t = 1.0;
            }
        }
        self.bt_audio_offset_ms = self
            .bt_audio_offset_ms
            .clamp(BT_AUDIO_OFFSET_MIN_MS, BT_AUDIO_OFFSET_MAX_MS);
        self.bt_volume = self.bt_volume.min(100);
        if !self.shot_threshold_rms.is_finite() || self.shot_threshold_rms < 0.0 {
            self.shot_threshold_rms = 15_311.0;
        }
        if !self.recoil_threshold_g.is_finite() || self.recoil_threshold_g < 0.0 {
            self.recoil_threshold_g = 1.5;
        }
    }

    fn config_path() -> Result<PathBuf, ConfigError> {
        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(base.join("shot-timer").join("config.json"))
    }

    /// Get the config file path (for display purposes)
    pub fn config_path_display() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }
}
