/// Shot records and per-session state
///
/// A Session is created when a start cue is issued and discarded when the
/// timer returns to Ready; nothing carries over between sessions. The shot
/// sequence is bounded at the configured max and allocated once up front.
use crate::config::SHOT_REFRACTORY_MS;

/// Practice modes the timing engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PracticeMode {
    /// Acoustic detection only
    LiveFire,
    /// Acoustic detection confirmed by recoil
    NoisyRange,
    /// Par cue sequence, no detection
    DryFire,
}

impl std::fmt::Display for PracticeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PracticeMode::LiveFire => write!(f, "Live Fire"),
            PracticeMode::NoisyRange => write!(f, "Noisy Range"),
            PracticeMode::DryFire => write!(f, "Dry Fire"),
        }
    }
}

/// One detected shot. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotRecord {
    pub index: usize,
    pub timestamp_ms: u64,
    pub split_seconds: f32,
}

#[derive(Debug)]
pub struct Session {
    pub mode: PracticeMode,
    pub start_time_ms: u64,
    pub last_detection_ms: u64,
    shots: Vec<ShotRecord>,
    max_shots: usize,
}

impl Session {
    pub fn new(mode: PracticeMode, start_time_ms: u64, max_shots: usize) -> Self {
        Self {
            mode,
            start_time_ms,
            last_detection_ms: 0,
            shots: Vec::with_capacity(max_shots),
            max_shots,
        }
    }

    pub fn shots(&self) -> &[ShotRecord] {
        &self.shots
    }

    pub fn shot_count(&self) -> usize {
        self.shots.len()
    }

    pub fn max_shots(&self) -> usize {
        self.max_shots
    }

    pub fn is_full(&self) -> bool {
        self.shots.len() >= self.max_shots
    }

    pub fn last_shot(&self) -> Option<&ShotRecord> {
        self.shots.last()
    }

    pub fn last_split_seconds(&self) -> f32 {
        self.shots.last().map(|s| s.split_seconds).unwrap_or(0.0)
    }

    /// True once the refractory period has passed since the last detection.
    pub fn refractory_elapsed(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_detection_ms) > SHOT_REFRACTORY_MS
    }

    /// Elapsed session time in seconds, clamped at zero before the start
    /// instant.
    pub fn elapsed_seconds(&self, now_ms: u64) -> f32 {
        now_ms.saturating_sub(self.start_time_ms) as f32 / 1000.0
    }

    /// Append a shot at `timestamp_ms`. The first split is measured from the
    /// session start, later splits from the previous shot. Returns `None`
    /// when the sequence is already at capacity or the timestamp does not
    /// advance past the previous shot.
    pub fn record_shot(&mut self, timestamp_ms: u64) -> Option<ShotRecord> {
        if self.is_full() {
            return None;
        }

        let split_seconds = match self.shots.last() {
            None => timestamp_ms.saturating_sub(self.start_time_ms) as f32 / 1000.0,
            Some(prev) => {
                if timestamp_ms <= prev.timestamp_ms {
                    return None;
                }
                (timestamp_ms - prev.timestamp_ms) as f32 / 1000.0
            }
        };

        let record = ShotRecord {
            index: self.shots.len(),
            timestamp_ms,
            split_seconds,
        };
        self.last_detection_ms = timestamp_ms;
        self.shots.push(record);
        Some(record)
    }
}
