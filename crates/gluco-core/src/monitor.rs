//! Measurement scheduler and control loop
//!
//! One cooperative loop drives everything:
//!
//! 1. If the measurement interval has elapsed on the millisecond counter,
//!    read the sensor, scale, timestamp, append to the log, then update the
//!    buzzer for the new severity.
//! 2. Poll the button and draw the live or statistics screen.
//! 3. Pause for the loop interval.
//!
//! Nothing here is fatal. Peripheral failures are logged, counted in
//! [`MonitorState`] and the loop carries on with the affected feature
//! degraded.

use core::fmt::Write;
use core::ops::ControlFlow;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use log::{debug, error, info, warn};

use crate::alert::AlertOutput;
use crate::app_state::{AppRunState, MonitorState};
use crate::clock::Clock;
use crate::config::MonitorConfig;
use crate::display::{CharDisplay, DisplayManager, DisplayMode};
use crate::metrics::Severity;
use crate::sensors::{GlucoseSensor, scale_raw};
use crate::storage::{LogStore, Record, dump_log};

/// How long the boot splash stays up
const SPLASH_MS: u32 = 100;

/// The external collaborators the monitor drives
pub struct Peripherals<S, C, L, A, D, B> {
    pub sensor: S,
    pub clock: C,
    pub store: L,
    pub alert: A,
    pub display: D,
    /// Momentary button, active-low: pressed selects the live screen
    pub button: B,
}

/// Outcome of one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Reading taken this iteration, if a measurement was due and succeeded
    pub measured: Option<u16>,
    pub mode: DisplayMode,
    /// Whether the screen was drawn (the live screen skips unchanged values)
    pub redrawn: bool,
}

pub struct Monitor<S, C, L, A, D, B>
where
    S: GlucoseSensor,
    C: Clock,
    L: LogStore,
    A: AlertOutput,
    D: CharDisplay,
    B: InputPin,
{
    config: MonitorConfig,
    state: MonitorState,
    sensor: S,
    clock: C,
    store: L,
    alert: A,
    display: DisplayManager<D>,
    button: B,
}

impl<S, C, L, A, D, B> Monitor<S, C, L, A, D, B>
where
    S: GlucoseSensor,
    C: Clock,
    L: LogStore,
    A: AlertOutput,
    D: CharDisplay,
    B: InputPin,
{
    pub fn new(config: MonitorConfig, peripherals: Peripherals<S, C, L, A, D, B>) -> Self {
        let Peripherals {
            sensor,
            clock,
            store,
            alert,
            display,
            button,
        } = peripherals;

        Self {
            config,
            state: MonitorState::new(),
            sensor,
            clock,
            store,
            alert,
            display: DisplayManager::new(display),
            button,
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn store(&self) -> &L {
        &self.store
    }

    pub fn display(&self) -> &D {
        self.display.display()
    }

    pub fn display_mut(&mut self) -> &mut D {
        self.display.display_mut()
    }

    /// Bring up the clock and log store behind a splash screen.
    ///
    /// Failures leave the monitor in [`AppRunState::Degraded`]: they are
    /// logged once and noted on the splash, and the loop still runs.
    pub fn init(&mut self, delay: &mut impl DelayNs) -> AppRunState {
        self.draw_splash_line(0, "Glucose Meter");
        let mut version = heapless::String::<16>::new();
        let _ = write!(version, "v{}", env!("CARGO_PKG_VERSION"));
        self.draw_splash_line(1, &version);

        let mut run_state = AppRunState::Running;

        if let Err(e) = self.clock.begin() {
            error!("{}", e);
            self.draw_splash_line(1, "RTC error!");
            run_state = AppRunState::Degraded;
        }
        if let Err(e) = self.store.begin() {
            error!("{}", e);
            self.draw_splash_line(1, "SD error!");
            run_state = AppRunState::Degraded;
        }

        info!("Initialized");
        if run_state == AppRunState::Degraded {
            warn!("Running degraded: timestamps or log may be unavailable");
        }

        delay.delay_ms(SPLASH_MS);
        if let Err(e) = self.display.display_mut().clear() {
            warn!("Display clear failed: {:?}", e);
        }
        self.display.invalidate();

        self.state.run_state = run_state;
        run_state
    }

    fn draw_splash_line(&mut self, row: u8, text: &str) {
        let display = self.display.display_mut();
        let result = if row == 0 {
            display.clear().and_then(|_| display.print(text))
        } else {
            display
                .set_cursor(0, row)
                .and_then(|_| display.print("                "))
                .and_then(|_| display.set_cursor(0, row))
                .and_then(|_| display.print(text))
        };
        if let Err(e) = result {
            warn!("Splash draw failed: {:?}", e);
        }
    }

    /// Take one measurement: read, scale, timestamp, log, alert.
    ///
    /// Returns `None` only when the sensor read fails.
    pub fn measure(&mut self) -> Option<u16> {
        let raw = match self.sensor.read_raw() {
            Ok(raw) => raw,
            Err(e) => {
                self.state.sensor_failures += 1;
                error!(
                    "Skipping measurement from {} ({} failures so far): {}",
                    self.sensor.name(),
                    self.state.sensor_failures,
                    e
                );
                return None;
            }
        };

        let glucose = scale_raw(raw, &self.config);
        let record = Record::new(self.clock.unix_time(), glucose);

        self.state.last_glucose = Some(glucose);
        self.state.measurements += 1;

        if let Err(e) = self.store.append(&record) {
            self.state.append_failures += 1;
            error!(
                "Failed to append {} to log ({} failures so far): {}",
                record, self.state.append_failures, e
            );
        } else {
            debug!("Logged {}", record);
        }

        let severity = Severity::classify(glucose, &self.config.thresholds);
        if let Err(e) = self.alert.apply(severity.alert_command()) {
            warn!("Alert output failed for {:?}: {:?}", severity, e);
        }

        if self.config.debug_dump {
            dump_log(&self.store);
        }

        Some(glucose)
    }

    /// Poll the button and draw the selected screen.
    pub fn draw(&mut self) -> (DisplayMode, bool) {
        let pressed = self.button.is_low().unwrap_or_else(|e| {
            debug!("Button read failed: {:?}", e);
            false
        });
        let mode = DisplayMode::from_button(pressed);

        let redrawn = self
            .display
            .render(
                mode,
                self.state.last_glucose,
                &self.store,
                self.clock.unix_time(),
                &self.config,
            )
            .unwrap_or_else(|e| {
                warn!("Display render failed: {:?}", e);
                false
            });

        (mode, redrawn)
    }

    /// One loop iteration without the trailing pause.
    pub fn tick(&mut self) -> Tick {
        let now_ms = self.clock.millis();

        let mut measured = None;
        if self
            .state
            .measurement_due(now_ms, self.config.measurement_interval_ms)
        {
            // Advanced even if the sensor fails, so a dead sensor is polled at
            // the measurement cadence rather than every loop
            self.state.last_measurement_ms = now_ms;
            measured = self.measure();
        }

        let (mode, redrawn) = self.draw();

        Tick {
            measured,
            mode,
            redrawn,
        }
    }

    /// Run the loop until `on_tick` breaks. On the device `on_tick` simply
    /// returns `ControlFlow::Continue`.
    pub fn run<F>(&mut self, delay: &mut impl DelayNs, mut on_tick: F)
    where
        F: FnMut(&mut Self, &Tick) -> ControlFlow<()>,
    {
        loop {
            let tick = self.tick();
            if on_tick(self, &tick).is_break() {
                info!("Monitor loop stopped after {} measurements", self.state.measurements);
                return;
            }
            delay.delay_ms(self.config.loop_interval_ms);
        }
    }
}
