/// Streamed-audio transport status
///
/// The core only needs one bit from the transport layer: whether a sink is
/// connected right now. Pairing, discovery and volume control live outside
/// this crate; the connectivity flag is shared between the scheduler (path
/// decision), the synthesizer (keep-alive vs. silence) and the lifecycle
/// code (reset on disconnect).
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct TransportStatus {
    connected: Arc<AtomicBool>,
}

impl TransportStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected() -> Self {
        let status = Self::new();
        status.set_connected(true);
        status
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }
}
