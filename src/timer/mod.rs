/// Run orchestration: the timing state machine, the dry-fire par sequencer
/// and the calibration flows that tune it.
pub mod calibration;
pub mod machine;
pub mod par;

pub use calibration::{CalibrationKind, OffsetCalibration, PeakCalibration};
pub use machine::{ModeStateMachine, StopReason, TickOutcome, TimerPhase};
pub use par::ParSequencer;
