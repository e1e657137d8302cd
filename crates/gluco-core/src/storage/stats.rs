//! Rolling-window statistics rebuilt from the measurement log
//!
//! Every call replays the entire log against the supplied "now". No index or
//! running total is kept between calls, so the result only ever depends on
//! the log contents and the timestamp.

use log::debug;

use super::{LogStore, Record, StorageError, TimeWindow};

/// Running `(sum, count)` of glucose values inside one window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowAccumulator {
    pub sum: u64,
    pub count: u32,
}

impl WindowAccumulator {
    pub fn add(&mut self, glucose: u16) {
        self.sum += u64::from(glucose);
        self.count += 1;
    }

    /// Floor average, `None` when the window is empty
    pub fn average(&self) -> Option<u16> {
        if self.count == 0 {
            return None;
        }
        Some((self.sum / u64::from(self.count)) as u16)
    }
}

/// Result of one full replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowSummary {
    pub minute: WindowAccumulator,
    pub hour: WindowAccumulator,
    /// Lines that parsed into a record
    pub records: u32,
    /// Lines skipped because they did not hold two integer fields
    pub malformed: u32,
}

impl WindowSummary {
    /// Fold one record into every window it belongs to.
    pub fn add(&mut self, record: &Record, now: u32) {
        let age = record.age_at(now);
        self.records += 1;
        if TimeWindow::OneMinute.contains_age(age) {
            self.minute.add(record.glucose);
        }
        if TimeWindow::OneHour.contains_age(age) {
            self.hour.add(record.glucose);
        }
    }

    pub fn averages(&self) -> WindowAverages {
        WindowAverages {
            minute: self.minute.average(),
            hour: self.hour.average(),
        }
    }
}

/// Rolling averages for display; `None` means no data in that window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowAverages {
    pub minute: Option<u16>,
    pub hour: Option<u16>,
}

impl WindowAverages {
    pub const fn get(&self, window: TimeWindow) -> Option<u16> {
        match window {
            TimeWindow::OneMinute => self.minute,
            TimeWindow::OneHour => self.hour,
        }
    }
}

/// Replay the whole log and accumulate both windows relative to `now`.
pub fn summarize<L: LogStore + ?Sized>(store: &L, now: u32) -> Result<WindowSummary, StorageError> {
    if !store.exists() {
        return Err(StorageError::NotFound);
    }

    let mut summary = WindowSummary::default();
    store.replay(&mut |line: &str| match line.parse::<Record>() {
        Ok(record) => summary.add(&record, now),
        Err(e) => {
            debug!("Skipping malformed log line {:?}: {}", line, e);
            summary.malformed += 1;
        }
    })?;

    Ok(summary)
}

/// Rolling averages for the last minute and the last hour.
///
/// An absent or unreadable log reports no data for both windows.
pub fn aggregate<L: LogStore + ?Sized>(store: &L, now: u32) -> WindowAverages {
    match summarize(store, now) {
        Ok(summary) => summary.averages(),
        Err(StorageError::NotFound) => WindowAverages::default(),
        Err(e) => {
            debug!("Statistics replay failed: {}", e);
            WindowAverages::default()
        }
    }
}
