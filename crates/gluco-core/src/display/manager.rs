//! Display manager for the live and statistics screens
//!
//! Owns the character display and the live-screen cache. The mode is picked
//! fresh every loop iteration from the button level; there is no latching,
//! so releasing the button drops straight back to statistics.

use core::fmt::Write;

use log::debug;

use super::{BLOCK_GLYPH, CharDisplay};
use crate::config::MonitorConfig;
use crate::metrics::Severity;
use crate::sensors::map_range;
use crate::storage::{LogStore, StorageError, TimeWindow, WindowAverages, summarize};

type Line = heapless::String<24>;

/// Which screen to draw this iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Last reading with severity and bar
    Live,
    /// Rolling averages from the log
    Statistics,
}

impl DisplayMode {
    /// Level-based selection: button held selects live mode.
    pub const fn from_button(pressed: bool) -> Self {
        if pressed { Self::Live } else { Self::Statistics }
    }
}

/// What the live screen currently shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiveFrame {
    /// No measurement has completed yet
    Waiting,
    Reading(u16),
}

pub struct DisplayManager<D>
where
    D: CharDisplay,
{
    display: D,
    /// Last frame drawn by the live screen; `None` forces a redraw
    last_live: Option<LiveFrame>,
}

impl<D> DisplayManager<D>
where
    D: CharDisplay,
{
    pub fn new(display: D) -> Self {
        Self {
            display,
            last_live: None,
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    /// Draw the screen selected by `mode`.
    ///
    /// Returns whether anything was drawn; only the live screen can skip.
    pub fn render<L: LogStore + ?Sized>(
        &mut self,
        mode: DisplayMode,
        last_glucose: Option<u16>,
        store: &L,
        now: u32,
        config: &MonitorConfig,
    ) -> Result<bool, D::Error> {
        match mode {
            DisplayMode::Live => self.render_live(last_glucose, config),
            DisplayMode::Statistics => {
                self.render_statistics(store, now)?;
                Ok(true)
            }
        }
    }

    /// Draw the live screen unless it already shows `glucose`.
    pub fn render_live(
        &mut self,
        glucose: Option<u16>,
        config: &MonitorConfig,
    ) -> Result<bool, D::Error> {
        let frame = match glucose {
            Some(value) => LiveFrame::Reading(value),
            None => LiveFrame::Waiting,
        };
        if self.last_live == Some(frame) {
            return Ok(false);
        }

        self.display.clear()?;
        self.display.set_cursor(0, 0)?;
        // Recorded up front: a failed draw below is not retried every 10 ms
        self.last_live = Some(frame);

        let LiveFrame::Reading(glucose) = frame else {
            self.display.print("Glucose: -- mg/dL")?;
            return Ok(true);
        };

        let mut line = Line::new();
        let _ = write!(line, "Glucose: {} mg/dL", glucose);
        self.display.print(&line)?;

        let severity = Severity::classify(glucose, &config.thresholds);
        match severity.crossed_threshold(&config.thresholds) {
            Some(threshold) => {
                line.clear();
                let _ = write!(line, "{}: ", severity.label());
                self.display.set_cursor(0, 1)?;
                self.display.print(&line)?;

                line.clear();
                let _ = write!(line, "Glucose > {} mg/dL", threshold);
                self.display.set_cursor(0, 2)?;
                self.display.print(&line)?;
            }
            None => {
                self.display.set_cursor(0, 1)?;
                for _ in 0..bar_blocks(glucose, config) {
                    self.display.write_glyph(BLOCK_GLYPH)?;
                }
            }
        }

        debug!("Live screen redrawn: {} mg/dL ({:?})", glucose, severity);
        Ok(true)
    }

    /// Replay the log and draw both rolling averages.
    ///
    /// Always invalidates the live cache so returning to live mode redraws.
    pub fn render_statistics<L: LogStore + ?Sized>(
        &mut self,
        store: &L,
        now: u32,
    ) -> Result<(), D::Error> {
        self.last_live = None;

        // One replay per frame; `summarize` reports an absent log as NotFound
        let averages = match summarize(store, now) {
            Ok(summary) => summary.averages(),
            Err(StorageError::NotFound) => {
                self.display.clear()?;
                self.display.print("No data found")?;
                return Ok(());
            }
            Err(e) => {
                debug!("Statistics replay failed: {}", e);
                WindowAverages::default()
            }
        };

        self.display.clear()?;
        self.display.set_cursor(0, 0)?;
        self.display
            .print(&statistics_line(TimeWindow::OneMinute, &averages))?;
        self.display.set_cursor(0, 1)?;
        self.display
            .print(&statistics_line(TimeWindow::OneHour, &averages))?;
        Ok(())
    }

    /// Forget what the live screen shows, forcing the next render to draw.
    pub fn invalidate(&mut self) {
        self.last_live = None;
    }
}

/// Number of block glyphs for a normal reading: `glucose_min..=warning`
/// mapped onto `0..=bar_width`.
pub fn bar_blocks(glucose: u16, config: &MonitorConfig) -> u8 {
    let blocks = map_range(
        glucose as i32,
        config.glucose_min as i32,
        config.thresholds.warning as i32,
        0,
        config.bar_width as i32,
    );
    blocks.clamp(0, config.bar_width as i32) as u8
}

fn statistics_line(window: TimeWindow, averages: &WindowAverages) -> Line {
    let mut line = Line::new();
    let _ = match averages.get(window) {
        Some(avg) => write!(line, "{} avg:{}", window.label(), avg),
        None => write!(line, "{} avg:N/A", window.label()),
    };
    line
}
