//! Loop state and device-level error types for gluco-rs

use core::fmt::{Debug, Write};

use thiserror_no_std::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRunState {
    Uninitialized,
    /// Every peripheral came up
    Running,
    /// Clock or log store failed to initialize; measuring continues
    Degraded,
}

/// Mutable state shared between the measurement step and the display step.
///
/// Written only by the measurement pipeline, read by the display step. Both
/// run from the same loop so no synchronization is involved.
#[derive(Debug, Clone, Copy)]
pub struct MonitorState {
    pub run_state: AppRunState,
    /// `Clock::millis` at the last measurement tick
    pub last_measurement_ms: u32,
    /// Most recent scaled reading, `None` until the first measurement
    pub last_glucose: Option<u16>,
    /// Number of completed measurements since boot
    pub measurements: u32,
    /// Appends the log store rejected
    pub append_failures: u32,
    /// Ticks skipped because the sensor failed
    pub sensor_failures: u32,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorState {
    pub const fn new() -> Self {
        Self {
            run_state: AppRunState::Uninitialized,
            last_measurement_ms: 0,
            last_glucose: None,
            measurements: 0,
            append_failures: 0,
            sensor_failures: 0,
        }
    }

    /// Whether a measurement is due at `now_ms`.
    ///
    /// The difference is taken in the wrapping `u32` domain so a counter
    /// overflow does not stall the cadence.
    pub fn measurement_due(&self, now_ms: u32, interval_ms: u32) -> bool {
        now_ms.wrapping_sub(self.last_measurement_ms) >= interval_ms
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceInitError {
    #[error("RTC setup failed: {0}")]
    Clock(heapless::String<64>),
    #[error("Storage setup failed: {0}")]
    Storage(heapless::String<64>),
}

/// Render a driver error into a bounded string, truncating if it does not fit.
pub fn error_detail<E: Debug>(error: &E) -> heapless::String<64> {
    let mut detail = heapless::String::new();
    let _ = write!(detail, "{:?}", error);
    detail
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_measurement_waits_for_interval() {
        let state = MonitorState::new();
        assert!(!state.measurement_due(999, 1000));
        assert!(state.measurement_due(1000, 1000));
    }

    #[test]
    fn cadence_survives_counter_wraparound() {
        let state = MonitorState {
            last_measurement_ms: u32::MAX - 500,
            ..MonitorState::new()
        };
        // 501 ms up to and including the wrap, then 498 after it
        assert!(!state.measurement_due(498, 1000));
        assert!(state.measurement_due(499, 1000));
    }

    #[test]
    fn error_detail_truncates_long_messages() {
        let long = [b'x'; 100];
        let detail = error_detail(&long);
        assert!(detail.len() <= 64);
    }
}
