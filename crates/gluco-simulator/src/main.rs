//! Desktop simulator for the gluco-rs glucose monitor.
//!
//! Runs the real monitor loop from `gluco-core` against host peripherals: a
//! synthetic sensor, the system clock, a CSV log on disk, a 20x4 LCD drawn in
//! the terminal and a buzzer that reports through the logger.
//!
//! # Controls
//!
//! | Input       | Action                                      |
//! |-------------|---------------------------------------------|
//! | Enter       | Toggle the button (held = live screen)      |
//! | q + Enter   | Quit                                        |
//!
//! # Environment
//!
//! Read after an optional `.env` file:
//! `GLUCO_LOG_PATH`, `GLUCO_MEASUREMENT_INTERVAL_MS`, `GLUCO_LOOP_INTERVAL_MS`,
//! `GLUCO_DEBUG_DUMP`. `RUST_LOG` controls log verbosity.

mod peripherals;
mod store;

use std::io::BufRead;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use gluco_core::config::{ConfigError, LOG_FILE_NAME, MonitorConfig};
use gluco_core::monitor::{Monitor, Peripherals};
use log::{info, warn};

use peripherals::{
    KeyboardButton, LogBuzzer, MockSensor, SimulatedLcd, StdClock, StdDelay, render_lcd,
};
use store::FileLogStore;

/// Simulator settings resolved from the environment
#[derive(Debug, Clone, PartialEq)]
struct Settings {
    log_path: PathBuf,
    config: MonitorConfig,
}

impl Settings {
    fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = MonitorConfig::default();

        if let Some(ms) = parse_var(&lookup, "GLUCO_MEASUREMENT_INTERVAL_MS") {
            config.measurement_interval_ms = ms;
        }
        if let Some(ms) = parse_var(&lookup, "GLUCO_LOOP_INTERVAL_MS") {
            config.loop_interval_ms = ms;
        }
        if let Some(enabled) = lookup("GLUCO_DEBUG_DUMP") {
            config.debug_dump = matches!(enabled.trim(), "1" | "true" | "yes" | "on");
        }
        config.validate()?;

        let log_path = lookup("GLUCO_LOG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(LOG_FILE_NAME));

        Ok(Self { log_path, config })
    }
}

/// Parse a variable if set; unparsable values are reported and ignored.
fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid value", name, raw);
            None
        }
    }
}

/// Read stdin on a background thread: Enter toggles the button, `q` quits.
fn spawn_keyboard(button: KeyboardButton, quit: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().eq_ignore_ascii_case("q") {
                break;
            }
            let held = button.toggle();
            info!("Button {}", if held { "held" } else { "released" });
        }
        quit.store(true, Ordering::Relaxed);
    });
}

fn main() -> Result<(), ConfigError> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to read .env: {}", e);
        }
    }
    env_logger::init();
    info!("Starting gluco-rs simulator");

    let settings = Settings::from_env()?;
    info!(
        "Log: {} | measure every {} ms | loop {} ms | debug dump {}",
        settings.log_path.display(),
        settings.config.measurement_interval_ms,
        settings.config.loop_interval_ms,
        settings.config.debug_dump
    );
    info!("Keys: Enter=toggle button  q=Quit");

    let button = KeyboardButton::default();
    let quit = Arc::new(AtomicBool::new(false));
    spawn_keyboard(button.clone(), quit.clone());

    let mut monitor = Monitor::new(
        settings.config,
        Peripherals {
            sensor: MockSensor::new(),
            clock: StdClock::new(),
            store: FileLogStore::new(settings.log_path),
            alert: LogBuzzer::default(),
            display: SimulatedLcd::new(),
            button,
        },
    );

    let mut delay = StdDelay;
    monitor.init(&mut delay);

    monitor.run(&mut delay, |monitor, _tick| {
        if monitor.display_mut().take_dirty() {
            println!("{}", render_lcd(monitor.display()));
        }
        if quit.load(Ordering::Relaxed) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });

    let state = monitor.state();
    info!(
        "Simulator exiting: {} measurements, {} sensor failures, {} append failures",
        state.measurements, state.sensor_failures, state.append_failures
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_without_environment() {
        let settings = settings(&[]).unwrap();
        assert_eq!(settings.log_path, PathBuf::from("glucose.csv"));
        assert_eq!(settings.config, MonitorConfig::default());
    }

    #[test]
    fn test_environment_overrides() {
        let settings = settings(&[
            ("GLUCO_LOG_PATH", "/tmp/gluco/log.csv"),
            ("GLUCO_MEASUREMENT_INTERVAL_MS", "250"),
            ("GLUCO_LOOP_INTERVAL_MS", " 5 "),
            ("GLUCO_DEBUG_DUMP", "true"),
        ])
        .unwrap();

        assert_eq!(settings.log_path, PathBuf::from("/tmp/gluco/log.csv"));
        assert_eq!(settings.config.measurement_interval_ms, 250);
        assert_eq!(settings.config.loop_interval_ms, 5);
        assert!(settings.config.debug_dump);
    }

    #[test]
    fn test_invalid_number_keeps_default() {
        let settings = settings(&[("GLUCO_LOOP_INTERVAL_MS", "fast")]).unwrap();
        assert_eq!(settings.config.loop_interval_ms, 10);
    }

    #[test]
    fn test_zero_measurement_interval_rejected() {
        assert_eq!(
            settings(&[("GLUCO_MEASUREMENT_INTERVAL_MS", "0")]),
            Err(ConfigError::ZeroInterval {
                name: "measurement_interval_ms"
            })
        );
    }
}
