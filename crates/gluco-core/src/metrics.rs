//! Severity assessment for glucose readings
//!
//! Maps a reading onto a clinical tier and the buzzer command that goes with
//! it. Used for both the alert output and the live display.

use crate::alert::AlertCommand;
use crate::config::Thresholds;

/// Frequency of the continuous critical tone
pub const CRITICAL_TONE_HZ: u32 = 1000;
/// Frequency of the warning pulse
pub const WARNING_TONE_HZ: u32 = 600;
/// Length of a single warning pulse
pub const WARNING_PULSE_MS: u32 = 100;

/// Severity tier of a glucose reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// At or below the warning threshold
    Normal,
    /// Above the warning threshold, at or below the critical one
    Warning,
    /// Above the critical threshold
    Critical,
}

impl Severity {
    /// Classify a reading. Both comparisons are strict: a value equal to a
    /// threshold stays in the lower tier.
    pub const fn classify(glucose: u16, thresholds: &Thresholds) -> Self {
        if glucose > thresholds.critical {
            Self::Critical
        } else if glucose > thresholds.warning {
            Self::Warning
        } else {
            Self::Normal
        }
    }

    /// Buzzer command for this tier
    pub const fn alert_command(self) -> AlertCommand {
        match self {
            Self::Critical => AlertCommand::Continuous {
                frequency_hz: CRITICAL_TONE_HZ,
            },
            Self::Warning => AlertCommand::Pulse {
                frequency_hz: WARNING_TONE_HZ,
                duration_ms: WARNING_PULSE_MS,
            },
            Self::Normal => AlertCommand::Silence,
        }
    }

    /// Display label for this tier
    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Warning => "Warning",
            Self::Critical => "Critical",
        }
    }

    /// Threshold that was crossed to reach this tier, if any
    pub const fn crossed_threshold(self, thresholds: &Thresholds) -> Option<u16> {
        match self {
            Self::Normal => None,
            Self::Warning => Some(thresholds.warning),
            Self::Critical => Some(thresholds.critical),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(glucose: u16) -> Severity {
        Severity::classify(glucose, &Thresholds::default())
    }

    #[test]
    fn boundaries_are_strict() {
        assert_eq!(classify(180), Severity::Normal);
        assert_eq!(classify(181), Severity::Warning);
        assert_eq!(classify(200), Severity::Warning);
        assert_eq!(classify(201), Severity::Critical);
    }

    #[test]
    fn range_extremes() {
        assert_eq!(classify(60), Severity::Normal);
        assert_eq!(classify(250), Severity::Critical);
    }

    #[test]
    fn alert_commands_per_tier() {
        assert_eq!(
            Severity::Critical.alert_command(),
            AlertCommand::Continuous { frequency_hz: 1000 }
        );
        assert_eq!(
            Severity::Warning.alert_command(),
            AlertCommand::Pulse {
                frequency_hz: 600,
                duration_ms: 100
            }
        );
        assert_eq!(Severity::Normal.alert_command(), AlertCommand::Silence);
    }

    #[test]
    fn crossed_threshold_matches_tier() {
        let thresholds = Thresholds::default();
        assert_eq!(Severity::Normal.crossed_threshold(&thresholds), None);
        assert_eq!(Severity::Warning.crossed_threshold(&thresholds), Some(180));
        assert_eq!(Severity::Critical.crossed_threshold(&thresholds), Some(200));
    }
}
