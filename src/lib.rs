/// Shot timer core: audio cue scheduling, shot detection and run timing for
/// live-fire, noisy-range and dry-fire practice.
pub mod audio;
pub mod clock;
pub mod config;
pub mod detection;
pub mod display;
pub mod error;
pub mod sensors;
pub mod session;
pub mod timer;
pub mod transport;

pub use clock::{ManualClock, MonotonicClock, SharedClock, TimeSource};
pub use config::TimerConfig;
pub use error::{AppResult, AudioError, ConfigError};
pub use session::{PracticeMode, Session, ShotRecord};
pub use transport::TransportStatus;
