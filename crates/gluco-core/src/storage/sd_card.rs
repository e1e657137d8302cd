//! Measurement log on a FAT-formatted SD card
//!
//! Every operation opens the volume, root directory and log file, does its
//! work and closes them again, so a card pulled between measurements only
//! costs the operations that ran while it was missing.

use embedded_sdmmc::{Mode, SdCard, SdCardError, TimeSource, VolumeIdx, VolumeManager};
use log::{debug, warn};

use super::{LogStore, MAX_RECORD_LINE, Record, StorageError, UNREADABLE_LINE};
use crate::app_state::{DeviceInitError, error_detail};

/// Bytes read from the card per request during replay
const READ_CHUNK: usize = 64;

type SdError = embedded_sdmmc::Error<SdCardError>;

fn storage_error(e: SdError) -> StorageError {
    match e {
        embedded_sdmmc::Error::NotFound => StorageError::NotFound,
        other => StorageError::Io(error_detail(&other)),
    }
}

/// SD card operations are blocking; they share the loop with the display
/// and run between measurement ticks.
pub struct SdCardLogStore<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    volume_mgr: VolumeManager<SdCard<S, D>, T, 4, 4, 1>,
    file_name: &'static str,
}

impl<S, D, T> SdCardLogStore<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    /// Create a store for `file_name` (must be a valid 8.3 name) in the root
    /// directory of the first volume.
    pub fn new(sd_card: SdCard<S, D>, ts: T, file_name: &'static str) -> Self {
        let volume_mgr = VolumeManager::new(sd_card, ts);

        Self {
            volume_mgr,
            file_name,
        }
    }

    fn append_line(&self, line: &[u8]) -> Result<(), SdError> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;
        let file = root_dir.open_file_in_dir(self.file_name, Mode::ReadWriteCreateOrAppend)?;

        file.write(line)?;

        // Explicitly close them to surface flush errors
        file.close()?;
        root_dir.close()?;
        volume0.close()?;

        Ok(())
    }

    fn replay_lines(&self, visit: &mut dyn FnMut(&str)) -> Result<(), SdError> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;
        let file = root_dir.open_file_in_dir(self.file_name, Mode::ReadOnly)?;

        let mut chunk = [0u8; READ_CHUNK];
        let mut line = LineBuffer::new();

        while !file.is_eof() {
            let bytes_read = file.read(&mut chunk)?;
            if bytes_read == 0 {
                break;
            }
            for &byte in &chunk[..bytes_read] {
                line.push(byte, visit);
            }
        }
        line.finish(visit);

        file.close()?;
        root_dir.close()?;
        volume0.close()?;

        Ok(())
    }
}

impl<S, D, T> LogStore for SdCardLogStore<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    fn begin(&mut self) -> Result<(), DeviceInitError> {
        // Mounting the first volume proves both the card and the filesystem
        let volume0 = self
            .volume_mgr
            .open_volume(VolumeIdx(0))
            .map_err(|e| DeviceInitError::Storage(error_detail(&e)))?;
        volume0
            .close()
            .map_err(|e| DeviceInitError::Storage(error_detail(&e)))?;
        Ok(())
    }

    fn exists(&self) -> bool {
        let Ok(volume0) = self.volume_mgr.open_volume(VolumeIdx(0)) else {
            return false;
        };
        let Ok(root_dir) = volume0.open_root_dir() else {
            return false;
        };
        root_dir.find_directory_entry(self.file_name).is_ok()
    }

    fn append(&mut self, record: &Record) -> Result<(), StorageError> {
        self.append_line(record.encode().as_bytes())
            .map_err(storage_error)
    }

    fn replay(&self, visit: &mut dyn FnMut(&str)) -> Result<(), StorageError> {
        self.replay_lines(visit).map_err(storage_error)
    }
}

/// Reassembles lines from fixed-size reads. Lines that outgrow the buffer
/// or are not UTF-8 are reported as [`UNREADABLE_LINE`].
struct LineBuffer {
    bytes: heapless::Vec<u8, MAX_RECORD_LINE>,
    /// Set when the current line outgrew the buffer; its bytes are discarded
    overflowed: bool,
}

impl LineBuffer {
    fn new() -> Self {
        Self {
            bytes: heapless::Vec::new(),
            overflowed: false,
        }
    }

    fn push(&mut self, byte: u8, visit: &mut dyn FnMut(&str)) {
        if byte == b'\n' {
            self.emit(visit);
        } else if self.bytes.push(byte).is_err() {
            self.overflowed = true;
        }
    }

    fn finish(&mut self, visit: &mut dyn FnMut(&str)) {
        if !self.bytes.is_empty() || self.overflowed {
            self.emit(visit);
        }
    }

    fn emit(&mut self, visit: &mut dyn FnMut(&str)) {
        if self.overflowed {
            warn!("Oversized log line");
            visit(UNREADABLE_LINE);
        } else {
            match core::str::from_utf8(&self.bytes) {
                Ok(text) => visit(text),
                Err(_) => {
                    debug!("Non-UTF-8 log line");
                    visit(UNREADABLE_LINE);
                }
            }
        }
        self.bytes.clear();
        self.overflowed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::summarize;

    fn reassemble(chunks: &[&[u8]]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut visit = |line: &str| lines.push(line.to_string());
        feed(chunks, &mut visit);
        lines
    }

    fn feed(chunks: &[&[u8]], visit: &mut dyn FnMut(&str)) {
        let mut buffer = LineBuffer::new();
        for chunk in chunks {
            for &byte in *chunk {
                buffer.push(byte, visit);
            }
        }
        buffer.finish(visit);
    }

    /// Card contents replayed through the same line reassembly as the card
    struct ChunkedLog<'a> {
        chunks: &'a [&'a [u8]],
    }

    impl LogStore for ChunkedLog<'_> {
        fn exists(&self) -> bool {
            true
        }

        fn append(&mut self, _record: &Record) -> Result<(), StorageError> {
            Err(StorageError::Unavailable)
        }

        fn replay(&self, visit: &mut dyn FnMut(&str)) -> Result<(), StorageError> {
            feed(self.chunks, visit);
            Ok(())
        }
    }

    #[test]
    fn test_lines_split_across_reads() {
        let lines = reassemble(&[b"1000,12", b"0\n1001,", b"121\n"]);
        assert_eq!(lines, ["1000,120", "1001,121"]);
    }

    #[test]
    fn test_trailing_line_without_newline() {
        let lines = reassemble(&[b"1000,120\n1001,121"]);
        assert_eq!(lines, ["1000,120", "1001,121"]);
    }

    #[test]
    fn test_oversized_line_reported_unreadable() {
        let long = [b'9'; MAX_RECORD_LINE + 4];
        let lines = reassemble(&[&long, b"\n1000,120\n"]);
        assert_eq!(lines, [UNREADABLE_LINE, "1000,120"]);
    }

    #[test]
    fn test_undecodable_lines_counted_as_malformed() {
        let long = [b'9'; MAX_RECORD_LINE + 4];
        let chunks: [&[u8]; 4] = [b"1000,120\n", &long, b"\n\xff\xfe\n", b"1010,140\n"];
        let log = ChunkedLog { chunks: &chunks };

        let summary = summarize(&log, 1030).unwrap();
        assert_eq!(summary.records, 2);
        assert_eq!(summary.malformed, 2);
        assert_eq!(summary.averages().minute, Some(130));
    }
}
