/// Session-end feedback patterns
///
/// Short melodies confirming how a session ended. Notes are issued through
/// the scheduler's Immediate mode so the buzzer/stream decision stays in one
/// place, and the sequence is advanced by polling rather than sleeping in
/// the control loop.
use std::collections::VecDeque;

use crate::audio::scheduler::{AudioPathScheduler, ToneMode};
use crate::config::{BEEP_NOTE_DELAY_MS, BEEP_NOTE_DURATION_MS};

#[derive(Debug, Clone, Copy)]
struct Note {
    frequency_hz: i32,
    duration_ms: u64,
    gap_after_ms: u64,
}

/// Ascending run played when a session recorded at least one shot.
fn success_notes() -> Vec<Note> {
    [1047, 1175, 1319, 1397, 1568]
        .into_iter()
        .map(|frequency_hz| Note {
            frequency_hz,
            duration_ms: BEEP_NOTE_DURATION_MS,
            gap_after_ms: BEEP_NOTE_DELAY_MS,
        })
        .collect()
}

/// Low double-beep for empty or cancelled sessions.
fn failure_notes() -> Vec<Note> {
    let duration_ms = BEEP_NOTE_DURATION_MS * 3 / 2;
    vec![
        Note {
            frequency_hz: 262,
            duration_ms,
            gap_after_ms: BEEP_NOTE_DELAY_MS * 2,
        };
        2
    ]
}

#[derive(Default)]
pub struct FeedbackSequencer {
    queue: VecDeque<Note>,
    next_note_ms: u64,
}

impl FeedbackSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn play_success(&mut self, now_ms: u64) {
        self.queue = success_notes().into();
        self.next_note_ms = now_ms;
    }

    pub fn play_failure(&mut self, now_ms: u64) {
        self.queue = failure_notes().into();
        self.next_note_ms = now_ms;
    }

    /// Convenience used at every session stop.
    pub fn play_outcome(&mut self, now_ms: u64, any_shots: bool) {
        if any_shots {
            self.play_success(now_ms);
        } else {
            self.play_failure(now_ms);
        }
    }

    pub fn cancel(&mut self) {
        self.queue.clear();
    }

    /// Issue the next due note, if any.
    pub fn tick(&mut self, now_ms: u64, scheduler: &AudioPathScheduler) {
        let Some(note) = self.queue.front().copied() else {
            return;
        };
        if now_ms < self.next_note_ms {
            return;
        }

        scheduler.schedule_tone(note.frequency_hz, note.duration_ms, ToneMode::Immediate);
        self.queue.pop_front();
        self.next_note_ms = now_ms + note.duration_ms + note.gap_after_ms;
    }
}
