/// Presentation callback consumed by the timing loop
///
/// The core pushes `(elapsed seconds, shot count, last split)` and nothing
/// else; layout and refresh throttling are the caller's business.

pub trait TimingView {
    fn show_timing(&mut self, elapsed_seconds: f32, shot_count: usize, last_split_seconds: f32);
}

/// View that discards everything; used by tests and headless runs.
#[derive(Default)]
pub struct NullView;

impl TimingView for NullView {
    fn show_timing(&mut self, _elapsed: f32, _shots: usize, _split: f32) {}
}

/// Single-line console rendering for the demo runner.
#[derive(Default)]
pub struct ConsoleView {
    last_line: String,
}

impl TimingView for ConsoleView {
    fn show_timing(&mut self, elapsed_seconds: f32, shot_count: usize, last_split_seconds: f32) {
        let line = format!(
            "t={:6.2}s  shots={:2}  split={:5.2}s",
            elapsed_seconds, shot_count, last_split_seconds
        );
        if line != self.last_line {
            println!("{line}");
            self.last_line = line;
        }
    }
}
