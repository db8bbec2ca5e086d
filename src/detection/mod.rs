/// Shot detection: per-mode policies behind a common trait, driven by the
/// detection engine.
pub mod direct;
pub mod engine;
pub mod fused;
pub mod policy;

pub use direct::DirectAudioPolicy;
pub use engine::{DetectionEngine, EngineEvent};
pub use fused::FusedAudioRecoilPolicy;
pub use policy::{PolicyVerdict, ShotPolicy};
