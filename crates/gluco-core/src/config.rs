//! Monitor configuration
//!
//! Defaults reproduce the reference device: one measurement per second, a
//! 10 ms display loop, a 10-bit ADC mapped onto 60–250 mg/dL and alert
//! thresholds at 180 / 200 mg/dL.

use thiserror_no_std::Error;

/// Lowest glucose value the sensor scale can produce (mg/dL)
pub const GLUCOSE_MIN: u16 = 60;
/// Highest glucose value the sensor scale can produce (mg/dL)
pub const GLUCOSE_MAX: u16 = 250;

/// Values strictly above this raise a warning pulse (mg/dL)
pub const GLUCOSE_WARNING_THRESHOLD: u16 = 180;
/// Values strictly above this raise a continuous tone (mg/dL)
pub const GLUCOSE_CRITICAL_THRESHOLD: u16 = 200;

/// Raw sensor domain of a 10-bit ADC
pub const RAW_MIN: u16 = 0;
pub const RAW_MAX: u16 = 1023;

pub const MEASUREMENT_INTERVAL_MS: u32 = 1000;
pub const LOOP_INTERVAL_MS: u32 = 10;

/// Usable width of the live-mode bar in block glyphs
pub const BAR_WIDTH: u8 = 7;

/// Name of the measurement log on the storage volume
pub const LOG_FILE_NAME: &str = "glucose.csv";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("interval must be non-zero: {name}")]
    ZeroInterval { name: &'static str },
    #[error("empty range for {name}: {min}..={max}")]
    EmptyRange {
        name: &'static str,
        min: u16,
        max: u16,
    },
    #[error("warning threshold {warning} must be below critical threshold {critical}")]
    ThresholdOrder { warning: u16, critical: u16 },
}

/// Alert thresholds in mg/dL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub warning: u16,
    pub critical: u16,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warning: GLUCOSE_WARNING_THRESHOLD,
            critical: GLUCOSE_CRITICAL_THRESHOLD,
        }
    }
}

/// Runtime configuration of the monitor loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Minimum elapsed time between two measurements
    pub measurement_interval_ms: u32,
    /// Pause at the end of every loop iteration
    pub loop_interval_ms: u32,
    /// Raw sensor domain (inclusive)
    pub raw_min: u16,
    pub raw_max: u16,
    /// Glucose range the raw domain maps onto (inclusive)
    pub glucose_min: u16,
    pub glucose_max: u16,
    pub thresholds: Thresholds,
    /// Number of block glyphs a reading at the warning threshold fills
    pub bar_width: u8,
    /// Dump the whole log to the diagnostic stream after every measurement
    pub debug_dump: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            measurement_interval_ms: MEASUREMENT_INTERVAL_MS,
            loop_interval_ms: LOOP_INTERVAL_MS,
            raw_min: RAW_MIN,
            raw_max: RAW_MAX,
            glucose_min: GLUCOSE_MIN,
            glucose_max: GLUCOSE_MAX,
            thresholds: Thresholds::default(),
            bar_width: BAR_WIDTH,
            debug_dump: false,
        }
    }
}

impl MonitorConfig {
    /// Check that every range is non-empty and the thresholds are ordered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.measurement_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval {
                name: "measurement_interval_ms",
            });
        }
        if self.raw_min >= self.raw_max {
            return Err(ConfigError::EmptyRange {
                name: "raw",
                min: self.raw_min,
                max: self.raw_max,
            });
        }
        if self.glucose_min >= self.glucose_max {
            return Err(ConfigError::EmptyRange {
                name: "glucose",
                min: self.glucose_min,
                max: self.glucose_max,
            });
        }
        // The bar maps glucose_min..=warning, so it needs a non-empty span too
        if self.thresholds.warning <= self.glucose_min {
            return Err(ConfigError::EmptyRange {
                name: "bar",
                min: self.glucose_min,
                max: self.thresholds.warning,
            });
        }
        if self.thresholds.warning >= self.thresholds.critical {
            return Err(ConfigError::ThresholdOrder {
                warning: self.thresholds.warning,
                critical: self.thresholds.critical,
            });
        }
        Ok(())
    }
}
