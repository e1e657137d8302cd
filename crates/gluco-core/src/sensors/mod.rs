//! Sensor trait and raw-to-glucose scaling
//!
//! The analog front end is an external collaborator: implementors only hand
//! back a raw ADC count. Everything after that (clamping into the declared
//! domain and the linear mapping onto mg/dL) lives here so it is identical on
//! the device and in the simulator.

use thiserror_no_std::Error;

use crate::config::MonitorConfig;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    #[error("Sensor {sensor} read failed: {details}")]
    ReadFailed {
        sensor: &'static str,
        details: &'static str,
    },
    #[error("Sensor {sensor} not ready")]
    NotReady { sensor: &'static str },
}

/// Source of raw glucose proxy readings.
pub trait GlucoseSensor {
    /// Short identifier used in log lines.
    fn name(&self) -> &'static str {
        "glucose"
    }

    /// Take one raw reading in the device-defined domain (0–1023 for a
    /// 10-bit ADC).
    fn read_raw(&mut self) -> Result<u16, SensorError>;
}

impl<T: GlucoseSensor + ?Sized> GlucoseSensor for &mut T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn read_raw(&mut self) -> Result<u16, SensorError> {
        (**self).read_raw()
    }
}

/// Integer linear interpolation of `x` from `[in_min, in_max]` onto
/// `[out_min, out_max]`, truncating toward zero.
///
/// Values outside the input range extrapolate; callers clamp when they need
/// a bounded result.
pub const fn map_range(x: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Convert a raw reading into mg/dL.
///
/// The raw value is clamped into `config.raw_min..=config.raw_max` first, so
/// the result always lies in `config.glucose_min..=config.glucose_max`.
pub fn scale_raw(raw: u16, config: &MonitorConfig) -> u16 {
    let raw = raw.clamp(config.raw_min, config.raw_max);
    let glucose = map_range(
        raw as i32,
        config.raw_min as i32,
        config.raw_max as i32,
        config.glucose_min as i32,
        config.glucose_max as i32,
    );
    glucose.clamp(config.glucose_min as i32, config.glucose_max as i32) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_endpoints() {
        let config = MonitorConfig::default();
        assert_eq!(scale_raw(0, &config), 60);
        assert_eq!(scale_raw(1023, &config), 250);
    }

    #[test]
    fn test_scale_truncates() {
        let config = MonitorConfig::default();
        // 512 * 190 / 1023 = 95.09 -> 95
        assert_eq!(scale_raw(512, &config), 155);
        // 6 * 190 / 1023 = 1.11 -> 1
        assert_eq!(scale_raw(6, &config), 61);
    }

    #[test]
    fn test_scale_monotonic_and_bounded() {
        let config = MonitorConfig::default();
        let mut previous = scale_raw(0, &config);
        for raw in 0..=config.raw_max {
            let glucose = scale_raw(raw, &config);
            assert!((60..=250).contains(&glucose), "raw {raw} -> {glucose}");
            assert!(glucose >= previous, "not monotonic at raw {raw}");
            previous = glucose;
        }
    }

    #[test]
    fn test_scale_clamps_out_of_domain_raw() {
        let config = MonitorConfig::default();
        assert_eq!(scale_raw(4095, &config), 250);
    }

    #[test]
    fn test_map_range_bar() {
        assert_eq!(map_range(60, 60, 180, 0, 7), 0);
        assert_eq!(map_range(120, 60, 180, 0, 7), 3);
        assert_eq!(map_range(180, 60, 180, 0, 7), 7);
    }
}
