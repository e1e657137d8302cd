pub mod memory;
pub mod sd_card;
pub mod stats;

pub use memory::MemoryLogStore;
pub use stats::{WindowAccumulator, WindowAverages, WindowSummary, aggregate, summarize};

use core::fmt::{Display, Write};
use core::str::FromStr;

use log::{info, warn};
use thiserror_no_std::Error;

use crate::app_state::DeviceInitError;

/// Longest encoded record: 10 timestamp digits, comma, 5 glucose digits, newline
pub const MAX_RECORD_LINE: usize = 24;

/// Passed to [`LogStore::replay`] visitors in place of a line that could not
/// be decoded (oversized or not UTF-8), so it is still seen and counted as
/// malformed.
pub const UNREADABLE_LINE: &str = "\u{FFFD}";

/// Time window for rolling statistics
///
/// A record belongs to a window when its age relative to "now" is at most
/// the window duration. Windows overlap: a fresh record is counted in both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    /// Last 60 seconds
    OneMinute,
    /// Last 3600 seconds
    OneHour,
}

impl TimeWindow {
    /// Get a short label for display
    pub const fn label(self) -> &'static str {
        match self {
            Self::OneMinute => "1min",
            Self::OneHour => "1h",
        }
    }

    /// Get the duration of this window in seconds
    pub const fn duration_secs(self) -> u32 {
        match self {
            Self::OneMinute => 60,
            Self::OneHour => 3600,
        }
    }

    pub const fn contains_age(self, age_secs: u32) -> bool {
        age_secs <= self.duration_secs()
    }
}

/// One glucose measurement as stored in the log
///
/// Encoded as a single text line `timestamp,glucose\n`, both fields decimal
/// integers with no padding or header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Record {
    /// Seconds since epoch (0 when the RTC is unavailable)
    pub timestamp: u32,
    /// Scaled reading in mg/dL
    pub glucose: u16,
}

impl Record {
    pub const fn new(timestamp: u32, glucose: u16) -> Self {
        Self { timestamp, glucose }
    }

    /// Encode as a log line including the trailing newline.
    pub fn encode(&self) -> heapless::String<MAX_RECORD_LINE> {
        let mut line = heapless::String::new();
        // Cannot overflow: u32 + u16 + 2 separators fit in MAX_RECORD_LINE
        let _ = writeln!(line, "{}", self);
        line
    }

    /// Seconds elapsed between this record and `now`, in the wrapping `u32`
    /// domain. A record stamped after `now` ends up with a huge age and falls
    /// outside every window.
    pub const fn age_at(&self, now: u32) -> u32 {
        now.wrapping_sub(self.timestamp)
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{},{}", self.timestamp, self.glucose)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    #[error("missing field separator")]
    MissingSeparator,
    #[error("invalid timestamp field")]
    InvalidTimestamp,
    #[error("invalid glucose field")]
    InvalidGlucose,
}

impl FromStr for Record {
    type Err = RecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (timestamp, glucose) = line.split_once(',').ok_or(RecordError::MissingSeparator)?;
        let timestamp = timestamp
            .trim()
            .parse::<u32>()
            .map_err(|_| RecordError::InvalidTimestamp)?;
        let glucose = glucose
            .trim()
            .parse::<u16>()
            .map_err(|_| RecordError::InvalidGlucose)?;
        Ok(Self { timestamp, glucose })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("log not found")]
    NotFound,
    #[error("storage unavailable")]
    Unavailable,
    #[error("storage I/O error: {0}")]
    Io(heapless::String<64>),
}

/// Append-only durable log of measurement records.
///
/// Implementations create the log on first append and never truncate or
/// rewrite it.
pub trait LogStore {
    /// Bring up the storage device. A failure is not fatal: appends will
    /// fail individually and statistics report no data.
    fn begin(&mut self) -> Result<(), DeviceInitError> {
        Ok(())
    }

    /// Whether the log has been created yet.
    fn exists(&self) -> bool;

    /// Durably append one record.
    fn append(&mut self, record: &Record) -> Result<(), StorageError>;

    /// Visit every line of the log in append order, without the trailing
    /// newline. Lines are passed through unparsed; undecodable ones arrive as
    /// [`UNREADABLE_LINE`].
    fn replay(&self, visit: &mut dyn FnMut(&str)) -> Result<(), StorageError>;
}

impl<T: LogStore + ?Sized> LogStore for &mut T {
    fn begin(&mut self) -> Result<(), DeviceInitError> {
        (**self).begin()
    }

    fn exists(&self) -> bool {
        (**self).exists()
    }

    fn append(&mut self, record: &Record) -> Result<(), StorageError> {
        (**self).append(record)
    }

    fn replay(&self, visit: &mut dyn FnMut(&str)) -> Result<(), StorageError> {
        (**self).replay(visit)
    }
}

/// Emit a `---` separator then every log line to `emit`.
pub fn dump_lines<L: LogStore + ?Sized>(
    store: &L,
    emit: &mut dyn FnMut(&str),
) -> Result<(), StorageError> {
    emit("---");
    store.replay(emit)
}

/// Write the whole log verbatim to the diagnostic stream (`gluco::dump`
/// log target), preceded by a `---` separator.
pub fn dump_log<L: LogStore + ?Sized>(store: &L) {
    let result = dump_lines(store, &mut |line: &str| {
        info!(target: "gluco::dump", "{}", line)
    });
    if let Err(e) = result {
        warn!("Log dump failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_encoding() {
        let record = Record::new(1_700_000_000, 142);
        assert_eq!(record.encode().as_str(), "1700000000,142\n");
    }

    #[test]
    fn test_record_parse_accepts_crlf() {
        let record: Record = "1700000000,142\r\n".parse().unwrap();
        assert_eq!(record, Record::new(1_700_000_000, 142));
    }

    #[test]
    fn test_record_parse_rejects_malformed() {
        assert_eq!(
            "1700000000".parse::<Record>(),
            Err(RecordError::MissingSeparator)
        );
        assert_eq!(
            "abc,120".parse::<Record>(),
            Err(RecordError::InvalidTimestamp)
        );
        assert_eq!(
            "1700000000,".parse::<Record>(),
            Err(RecordError::InvalidGlucose)
        );
    }

    #[test]
    fn test_age_wraps_for_future_records() {
        let record = Record::new(1010, 120);
        assert_eq!(record.age_at(1000), u32::MAX - 9);
        assert!(!TimeWindow::OneHour.contains_age(record.age_at(1000)));
    }

    #[test]
    fn test_window_bounds_inclusive() {
        assert!(TimeWindow::OneMinute.contains_age(60));
        assert!(!TimeWindow::OneMinute.contains_age(61));
        assert!(TimeWindow::OneHour.contains_age(3600));
        assert!(!TimeWindow::OneHour.contains_age(3601));
    }

    #[test]
    fn test_dump_emits_separator_then_every_line() {
        let mut store = MemoryLogStore::new();
        store.append(&Record::new(1000, 120)).unwrap();
        store.append(&Record::new(1001, 121)).unwrap();

        let mut dumped = Vec::new();
        dump_lines(&store, &mut |line: &str| dumped.push(line.to_string())).unwrap();
        assert_eq!(dumped, ["---", "1000,120", "1001,121"]);

        // Does not panic with the real sink either
        dump_log(&store);
    }

    #[test]
    fn test_dump_of_absent_log() {
        let mut dumped = Vec::new();
        let result = dump_lines(&MemoryLogStore::new(), &mut |line: &str| {
            dumped.push(line.to_string())
        });
        assert_eq!(result, Err(StorageError::NotFound));
        assert_eq!(dumped, ["---"]);
    }

    #[test]
    fn test_unreadable_line_counts_as_malformed() {
        assert_eq!(
            UNREADABLE_LINE.parse::<Record>(),
            Err(RecordError::MissingSeparator)
        );
    }
}
