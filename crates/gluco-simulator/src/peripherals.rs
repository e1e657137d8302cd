//! Host stand-ins for the monitor's hardware.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin};
use gluco_core::alert::AlertOutput;
use gluco_core::clock::Clock;
use gluco_core::config::RAW_MAX;
use gluco_core::display::CharFrameBuffer;
use gluco_core::sensors::{GlucoseSensor, SensorError};
use log::{debug, info};

/// Same geometry as the 20x4 HD44780 panel the firmware drives
pub type SimulatedLcd = CharFrameBuffer<20, 4>;

/// Generates raw readings that swing slowly through the whole scale, so
/// every severity shows up within a few minutes.
pub struct MockSensor {
    started: Instant,
}

impl MockSensor {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Raw reading at `t` seconds after start
    pub fn sample_at(t: f64) -> u16 {
        let raw = 512.0 + 420.0 * (t / 90.0).sin() + 80.0 * (t / 17.0).cos();
        raw.clamp(0.0, RAW_MAX as f64) as u16
    }
}

impl Default for MockSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl GlucoseSensor for MockSensor {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn read_raw(&mut self) -> Result<u16, SensorError> {
        Ok(Self::sample_at(self.started.elapsed().as_secs_f64()))
    }
}

/// Monotonic milliseconds from [`Instant`], wall time from [`SystemTime`].
pub struct StdClock {
    boot: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            boot: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn millis(&self) -> u32 {
        // Truncation gives the same wraparound as a 32-bit hardware counter
        self.boot.elapsed().as_millis() as u32
    }

    fn unix_time(&self) -> u32 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as u32
    }
}

/// Buzzer that logs what it would play.
#[derive(Default)]
pub struct LogBuzzer {
    /// Frequency of the tone currently sounding, if continuous
    sounding: Option<u32>,
}

impl AlertOutput for LogBuzzer {
    type Error = Infallible;

    fn tone(&mut self, frequency_hz: u32, duration_ms: Option<u32>) -> Result<(), Infallible> {
        match duration_ms {
            Some(ms) => {
                self.sounding = None;
                info!("Buzzer: beep {} Hz for {} ms", frequency_hz, ms);
            }
            None if self.sounding == Some(frequency_hz) => {
                debug!("Buzzer: still sounding {} Hz", frequency_hz);
            }
            None => {
                self.sounding = Some(frequency_hz);
                info!("Buzzer: continuous {} Hz", frequency_hz);
            }
        }
        Ok(())
    }

    fn silence(&mut self) -> Result<(), Infallible> {
        if self.sounding.take().is_some() {
            info!("Buzzer: silent");
        }
        Ok(())
    }
}

/// Active-low push button whose level is set from another thread.
#[derive(Clone, Default)]
pub struct KeyboardButton {
    pressed: Arc<AtomicBool>,
}

impl KeyboardButton {
    /// Flip between held and released, returning the new state.
    pub fn toggle(&self) -> bool {
        !self.pressed.fetch_xor(true, Ordering::Relaxed)
    }
}

impl ErrorType for KeyboardButton {
    type Error = Infallible;
}

impl InputPin for KeyboardButton {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(!self.pressed.load(Ordering::Relaxed))
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(self.pressed.load(Ordering::Relaxed))
    }
}

pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns.into()));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms.into()));
    }
}

/// Render the LCD contents as a framed block of text.
pub fn render_lcd(lcd: &SimulatedLcd) -> String {
    let border = format!("+{}+", "-".repeat(20));
    let mut out = border.clone();
    for row in 0..4 {
        out.push_str(&format!("\n|{:<20}|", lcd.row_text(row).as_str()));
    }
    out.push('\n');
    out.push_str(&border);
    out
}
