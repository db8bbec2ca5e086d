/// Pull-based PCM synthesizer for the streamed output path
///
/// Implements `rodio::Source`, so the transport's output callback drains it
/// one interleaved stereo sample at a time. The hot path never blocks and
/// never allocates; the shared tone plan is re-polled once every
/// `PLAN_POLL_FRAMES` frames (~3 ms at 44.1 kHz), which bounds both the lock
/// traffic and the activation latency well below the scheduling guard.
use std::time::Duration;

use rodio::Source;

use crate::audio::tone::{ActiveTone, TonePlan, TonePlanSlot};
use crate::clock::SharedClock;
use crate::transport::TransportStatus;

pub const SAMPLE_RATE: u32 = 44_100;
const CHANNELS: u16 = 2;
const PLAN_POLL_FRAMES: u32 = 128;
const BEEP_AMPLITUDE: f32 = 10_000.0;
/// While idle but connected, a 1 Hz whisper keeps sinks from sleeping the
/// link. Documented workaround for specific sinks; disable via config.
const KEEP_ALIVE_FREQUENCY_HZ: f32 = 1.0;
const KEEP_ALIVE_AMPLITUDE: f32 = 1.0;

#[derive(Clone, Copy)]
struct Voice {
    frequency_hz: f32,
    amplitude: f32,
}

const SILENCE: Voice = Voice {
    frequency_hz: KEEP_ALIVE_FREQUENCY_HZ,
    amplitude: 0.0,
};

pub struct SampleSynthesizer {
    slot: TonePlanSlot,
    clock: SharedClock,
    transport: TransportStatus,
    idle_keep_alive: bool,
    voice: Voice,
    /// Seconds into the current 1 s period; wrapped to bound float error.
    t: f32,
    frames_until_poll: u32,
    /// Latched second-channel sample of the current frame.
    other_channel: Option<i16>,
}

impl SampleSynthesizer {
    pub fn new(
        slot: TonePlanSlot,
        clock: SharedClock,
        transport: TransportStatus,
        idle_keep_alive: bool,
    ) -> Self {
        Self {
            slot,
            clock,
            transport,
            idle_keep_alive,
            voice: SILENCE,
            t: 0.0,
            frames_until_poll: 0,
            other_channel: None,
        }
    }

    /// Exchange with the tone plan: activate a due pending cue, retire an
    /// expired active one, and derive the voice for the next poll window.
    fn poll_plan(&mut self) {
        let now = self.clock.now_ms();
        let mut phase_reset = false;

        let plan = self.slot.update(|plan| {
            if let Some(request) = plan.pending {
                if now >= request.scheduled_start_ms {
                    plan.pending = None;
                    if request.frequency_hz > 0 && request.duration_ms > 0 {
                        plan.active = Some(ActiveTone {
                            frequency_hz: request.frequency_hz,
                            end_ms: now + request.duration_ms,
                        });
                        phase_reset = true;
                    } else {
                        // Degraded request: nothing to render.
                        plan.active = None;
                    }
                }
            }

            if let Some(active) = plan.active {
                if now >= active.end_ms || active.frequency_hz <= 0 {
                    plan.active = None;
                }
            }

            *plan
        });

        if phase_reset {
            self.t = 0.0;
        }
        self.voice = self.voice_for(&plan);
    }

    fn voice_for(&self, plan: &TonePlan) -> Voice {
        match plan.active {
            Some(active) => Voice {
                frequency_hz: active.frequency_hz as f32,
                amplitude: BEEP_AMPLITUDE,
            },
            None => {
                if self.idle_keep_alive && self.transport.is_connected() {
                    Voice {
                        frequency_hz: KEEP_ALIVE_FREQUENCY_HZ,
                        amplitude: KEEP_ALIVE_AMPLITUDE,
                    }
                } else {
                    SILENCE
                }
            }
        }
    }

    fn render_frame(&mut self) -> i16 {
        let angle = std::f32::consts::TAU * self.voice.frequency_hz * self.t;
        let sample = (self.voice.amplitude * angle.sin()) as i16;

        self.t += 1.0 / SAMPLE_RATE as f32;
        if self.t >= 1.0 {
            self.t -= 1.0;
        }
        sample
    }
}

impl Iterator for SampleSynthesizer {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        if let Some(sample) = self.other_channel.take() {
            return Some(sample);
        }

        if self.frames_until_poll == 0 {
            self.poll_plan();
            self.frames_until_poll = PLAN_POLL_FRAMES;
        }
        self.frames_until_poll -= 1;

        let sample = self.render_frame();
        self.other_channel = Some(sample);
        Some(sample)
    }
}

impl Source for SampleSynthesizer {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        CHANNELS
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
