/// Audio subsystem
///
/// Two incompatible output paths share one scheduler: a blocking buzzer
/// worker fed by a bounded queue, and a pull-based PCM synthesizer feeding
/// the streamed transport. The scheduler picks the path per request and
/// publishes the shared tone plan the synthesizer consumes.
pub mod buzzer;
pub mod feedback;
pub mod scheduler;
pub mod synth;
pub mod tone;

pub use buzzer::{BuzzerActuator, BuzzerHandle, LoggingToneLine, ToneLine};
pub use feedback::FeedbackSequencer;
pub use scheduler::{AudioPathScheduler, OutputPath, ScheduledTone, ToneMode};
pub use synth::{SampleSynthesizer, SAMPLE_RATE};
pub use tone::{ActiveTone, BuzzerRequest, TonePlan, TonePlanSlot, ToneRequest};
