/// Dry-fire par cue sequencer
///
/// After a randomized hold-off the sequencer walks a precomputed plan of
/// absolute cue instants and fires the par beep at each one. The plan is the
/// running sum of the configured gaps, so a cursor that only ever advances
/// cannot double-fire a cue even if the control loop stalls past two of them.
use rand::Rng;

use crate::audio::scheduler::{AudioPathScheduler, ToneMode};
use crate::config::{DRY_FIRE_RANDOM_DELAY_MAX_MS, DRY_FIRE_RANDOM_DELAY_MIN_MS, MAX_PAR_BEEPS};

pub struct ParSequencer {
    beep_tone_hz: i32,
    beep_duration_ms: u64,
    /// Absolute cue instants, earliest first.
    cues: Vec<u64>,
    cursor: usize,
    /// Audio deadline of the last cue fired; the sequence only winds down
    /// once this has passed, so the final beep is not cut off.
    last_audio_end_ms: u64,
}

impl ParSequencer {
    pub fn new(beep_tone_hz: i32, beep_duration_ms: u64) -> Self {
        Self {
            beep_tone_hz,
            beep_duration_ms,
            cues: Vec::new(),
            cursor: 0,
            last_audio_end_ms: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.cues.is_empty()
    }

    /// Arm a new sequence. The first cue lands one configured gap after the
    /// randomized sequence start, not at the start itself. Returns the
    /// sequence start instant.
    pub fn start<R: Rng>(
        &mut self,
        now_ms: u64,
        par_gaps_sec: &[f32],
        cue_count: usize,
        rng: &mut R,
    ) -> u64 {
        let sequence_start_ms =
            now_ms + rng.gen_range(DRY_FIRE_RANDOM_DELAY_MIN_MS..=DRY_FIRE_RANDOM_DELAY_MAX_MS);

        let mut offset_ms = 0u64;
        self.cues = par_gaps_sec
            .iter()
            .take(cue_count.min(MAX_PAR_BEEPS))
            .map(|gap_sec| {
                offset_ms += (gap_sec.max(0.0) * 1000.0).round() as u64;
                sequence_start_ms + offset_ms
            })
            .collect();
        self.cursor = 0;
        self.last_audio_end_ms = 0;

        tracing::info!(
            "par sequence armed: {} cues starting at {} ms",
            self.cues.len(),
            sequence_start_ms
        );
        sequence_start_ms
    }

    /// Fire the cue at the cursor if it has come due. At most one cue fires
    /// per tick: a second cue due in the same tick (zero gap, or a stalled
    /// loop catching up) would replace the first one's stream plan before it
    /// ever rendered, so late cues fire on consecutive ticks instead.
    /// Returns true while the sequence is still running after this tick.
    pub fn tick(&mut self, now_ms: u64, scheduler: &AudioPathScheduler) -> bool {
        if self.cursor < self.cues.len() && now_ms >= self.cues[self.cursor] {
            let scheduled =
                scheduler.schedule_tone(self.beep_tone_hz, self.beep_duration_ms, ToneMode::WithOffset);
            self.last_audio_end_ms = scheduled.audio_end_ms;
            tracing::debug!("par cue {} fired at {} ms", self.cursor + 1, now_ms);
            self.cursor += 1;
        }

        // Let the final cue play out before winding the sequence down.
        if !self.cues.is_empty() && self.cursor >= self.cues.len() && now_ms >= self.last_audio_end_ms
        {
            self.finish(scheduler);
        }
        self.is_active()
    }

    pub fn cancel(&mut self, scheduler: &AudioPathScheduler) {
        if !self.cues.is_empty() {
            self.finish(scheduler);
        }
    }

    fn finish(&mut self, scheduler: &AudioPathScheduler) {
        self.cues.clear();
        self.cursor = 0;
        self.last_audio_end_ms = 0;
        scheduler.reset_state();
    }
}
