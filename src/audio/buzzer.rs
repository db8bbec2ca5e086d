/// Buzzer actuator worker
///
/// A dedicated thread consumes tone requests from a bounded FIFO and blocks
/// for each tone's duration, so consecutive tones can never overlap. Sending
/// is non-blocking: a full queue silently drops the request, because audio
/// feedback is not safety-critical.
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::audio::tone::BuzzerRequest;
use crate::config::{BUZZER_GUARD_MS, BUZZER_QUEUE_LENGTH};

/// One physical tone output. The worker drives two of these in lockstep.
pub trait ToneLine: Send {
    fn start(&mut self, frequency_hz: u32);
    fn stop(&mut self);
}

/// Tone line that only logs; used when no GPIO-backed line exists.
#[derive(Default)]
pub struct LoggingToneLine {
    pub label: &'static str,
}

impl LoggingToneLine {
    pub fn new(label: &'static str) -> Self {
        Self { label }
    }
}

impl ToneLine for LoggingToneLine {
    fn start(&mut self, frequency_hz: u32) {
        tracing::debug!("buzzer {} on at {} Hz", self.label, frequency_hz);
    }

    fn stop(&mut self) {
        tracing::debug!("buzzer {} off", self.label);
    }
}

/// Producer-side handle to the buzzer queue.
#[derive(Clone)]
pub struct BuzzerHandle {
    tx: Sender<BuzzerRequest>,
}

impl BuzzerHandle {
    /// Non-blocking enqueue. Drops the request when the queue is full or the
    /// worker has exited.
    pub fn enqueue(&self, request: BuzzerRequest) {
        match self.tx.try_send(request) {
            Ok(()) => {}
            Err(TrySendError::Full(req)) => {
                tracing::debug!(
                    "buzzer queue full, dropping {} Hz / {} ms",
                    req.frequency_hz,
                    req.duration_ms
                );
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!("buzzer worker gone, request dropped");
            }
        }
    }
}

/// Worker thread state. Owns the receive side of the queue and both lines.
pub struct BuzzerActuator {
    rx: Receiver<BuzzerRequest>,
    line_a: Box<dyn ToneLine>,
    line_b: Box<dyn ToneLine>,
}

impl BuzzerActuator {
    /// Spawn the worker on its own thread. The worker exits once every
    /// handle has been dropped and the queue drained.
    pub fn spawn(
        line_a: Box<dyn ToneLine>,
        line_b: Box<dyn ToneLine>,
    ) -> (BuzzerHandle, JoinHandle<()>) {
        let (tx, rx) = bounded(BUZZER_QUEUE_LENGTH);
        let actuator = BuzzerActuator { rx, line_a, line_b };
        let join = thread::Builder::new()
            .name("buzzer".into())
            .spawn(move || actuator.run())
            .expect("spawning the buzzer thread cannot fail with a static name");
        (BuzzerHandle { tx }, join)
    }

    fn run(mut self) {
        while let Ok(request) = self.rx.recv() {
            self.serve(request);
        }
        tracing::debug!("buzzer worker shutting down");
    }

    /// Serve one request, blocking for its full duration. A positive
    /// duration with a non-positive frequency is a pure delay; everything
    /// else is a no-op.
    fn serve(&mut self, request: BuzzerRequest) {
        if request.frequency_hz > 0 && request.duration_ms > 0 {
            self.line_a.start(request.frequency_hz as u32);
            self.line_b.start(request.frequency_hz as u32);
            thread::sleep(Duration::from_millis(request.duration_ms));
            self.line_a.stop();
            self.line_b.stop();
            // Guard gap so back-to-back tones stay distinct.
            thread::sleep(Duration::from_millis(BUZZER_GUARD_MS));
        } else if request.duration_ms > 0 {
            thread::sleep(Duration::from_millis(request.duration_ms));
        }
    }
}
