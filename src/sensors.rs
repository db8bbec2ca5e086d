/// Sensor collaborator interfaces
///
/// The core never owns sensor drivers; it polls these traits from the
/// control loop. Out-of-range readings are ordinary data and are never
/// rejected here.

/// Microphone peak tracker: `update` refreshes the device, `peak_rms`
/// returns the maximum RMS amplitude since the last reset.
pub trait MicLevelSource {
    fn update(&mut self);
    fn peak_rms(&self) -> f32;
    fn reset_peak(&mut self);
}

/// Polled 3-axis accelerometer, readings in g.
pub trait AccelSource {
    fn accel(&mut self) -> [f32; 3];
}

/// Recoil magnitude: the absolute Z-axis component, since the unit is worn
/// with Z along the recoil direction.
pub fn recoil_magnitude(accel: [f32; 3]) -> f32 {
    accel[2].abs()
}

/// One control-loop tick worth of sensor data. Read fresh each tick, never
/// retained.
#[derive(Debug, Clone, Copy)]
pub struct DetectionSample {
    pub timestamp_ms: u64,
    pub rms_peak: f32,
    pub recoil_magnitude: Option<f32>,
}
