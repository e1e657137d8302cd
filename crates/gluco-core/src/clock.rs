//! Time sources
//!
//! The scheduler needs a free-running millisecond counter; the log needs
//! wall-clock seconds. On the device both come from different peripherals
//! (system timer and RTC) but they are exposed through one trait so the loop
//! only owns a single clock.

use crate::app_state::DeviceInitError;

pub trait Clock {
    /// Bring up the wall-clock source. A failure is not fatal: the monitor
    /// keeps running and [`Clock::unix_time`] is expected to return 0.
    fn begin(&mut self) -> Result<(), DeviceInitError> {
        Ok(())
    }

    /// Milliseconds since boot. Wraps around at `u32::MAX`.
    fn millis(&self) -> u32;

    /// Seconds since the Unix epoch.
    fn unix_time(&self) -> u32;
}

impl<T: Clock + ?Sized> Clock for &mut T {
    fn begin(&mut self) -> Result<(), DeviceInitError> {
        (**self).begin()
    }

    fn millis(&self) -> u32 {
        (**self).millis()
    }

    fn unix_time(&self) -> u32 {
        (**self).unix_time()
    }
}
