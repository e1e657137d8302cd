//! Measurement log backed by a file on the host filesystem.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use gluco_core::app_state::{DeviceInitError, error_detail};
use gluco_core::storage::{LogStore, Record, StorageError, UNREADABLE_LINE};
use log::debug;

pub struct FileLogStore {
    path: PathBuf,
}

impl FileLogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn storage_error(e: io::Error) -> StorageError {
    match e.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound,
        _ => StorageError::Io(error_detail(&e)),
    }
}

impl LogStore for FileLogStore {
    fn begin(&mut self) -> Result<(), DeviceInitError> {
        // The log itself is created on first append, only its directory has
        // to exist up front
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| DeviceInitError::Storage(error_detail(&e)))?;
        }
        debug!("Measurement log at {}", self.path.display());
        Ok(())
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn append(&mut self, record: &Record) -> Result<(), StorageError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StorageError::Io(error_detail(&e)))?;
        file.write_all(record.encode().as_bytes())
            .map_err(|e| StorageError::Io(error_detail(&e)))?;
        file.sync_data()
            .map_err(|e| StorageError::Io(error_detail(&e)))
    }

    fn replay(&self, visit: &mut dyn FnMut(&str)) -> Result<(), StorageError> {
        let mut reader = BufReader::new(File::open(&self.path).map_err(storage_error)?);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).map_err(storage_error)? == 0 {
                return Ok(());
            }
            let line: &[u8] = &buf;
            let line = line.strip_suffix(b"\n").unwrap_or(line);
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            match std::str::from_utf8(line) {
                Ok(text) => visit(text),
                Err(_) => {
                    debug!("Non-UTF-8 line in {}", self.path.display());
                    visit(UNREADABLE_LINE);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gluco_core::storage::{aggregate, summarize};

    fn temp_store(name: &str) -> FileLogStore {
        let path = std::env::temp_dir()
            .join(format!("gluco-sim-{}", std::process::id()))
            .join(name);
        let _ = fs::remove_file(&path);
        FileLogStore::new(path)
    }

    fn lines(store: &FileLogStore) -> Vec<String> {
        let mut lines = Vec::new();
        store
            .replay(&mut |line: &str| lines.push(line.to_string()))
            .unwrap();
        lines
    }

    #[test]
    fn test_missing_log_reports_not_found() {
        let mut store = temp_store("missing.csv");
        store.begin().unwrap();

        assert!(!store.exists());
        assert_eq!(
            store.replay(&mut |_: &str| {}),
            Err(StorageError::NotFound)
        );
    }

    #[test]
    fn test_append_creates_and_extends_log() {
        let mut store = temp_store("append.csv");
        store.begin().unwrap();

        store.append(&Record::new(1_700_000_000, 155)).unwrap();
        assert!(store.exists());
        store.append(&Record::new(1_700_000_001, 156)).unwrap();

        assert_eq!(lines(&store), ["1700000000,155", "1700000001,156"]);
        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "1700000000,155\n1700000001,156\n"
        );
    }

    #[test]
    fn test_log_survives_reopen() {
        let path = {
            let mut store = temp_store("reopen.csv");
            store.begin().unwrap();
            store.append(&Record::new(1_000, 120)).unwrap();
            store.path().to_path_buf()
        };

        let store = FileLogStore::new(path);
        let summary = summarize(&store, 1_030).unwrap();
        assert_eq!(summary.records, 1);
        assert_eq!(summary.averages().minute, Some(120));
    }

    #[test]
    fn test_undecodable_line_skipped_not_fatal() {
        let mut store = temp_store("binary.csv");
        store.begin().unwrap();
        fs::write(store.path(), b"1000,120\n\xff\xfe\n1010,140\r\n").unwrap();

        let averages = aggregate(&store, 1030);
        assert_eq!(averages.minute, Some(130));
        assert_eq!(averages.hour, Some(130));

        let summary = summarize(&store, 1030).unwrap();
        assert_eq!(summary.records, 2);
        assert_eq!(summary.malformed, 1);
        assert_eq!(lines(&store), ["1000,120", UNREADABLE_LINE, "1010,140"]);
    }
}
