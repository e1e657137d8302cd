//! RAM-backed log store
//!
//! Keeps the encoded log text in a heap buffer. Used by tests and by hosts
//! without persistent storage; the contents are lost on restart.

use alloc::string::String;

use super::{LogStore, Record, StorageError};

#[derive(Debug, Default, Clone)]
pub struct MemoryLogStore {
    /// `None` until the first append creates the log
    contents: Option<String>,
}

impl MemoryLogStore {
    pub const fn new() -> Self {
        Self { contents: None }
    }

    /// Start from existing log text, e.g. to replay a captured file.
    pub fn with_contents(text: &str) -> Self {
        Self {
            contents: Some(String::from(text)),
        }
    }

    /// Raw log text, empty if the log was never created
    pub fn contents(&self) -> &str {
        self.contents.as_deref().unwrap_or("")
    }

    /// Number of lines in the log
    pub fn line_count(&self) -> usize {
        self.contents().lines().count()
    }
}

impl LogStore for MemoryLogStore {
    fn exists(&self) -> bool {
        self.contents.is_some()
    }

    fn append(&mut self, record: &Record) -> Result<(), StorageError> {
        self.contents
            .get_or_insert_with(String::new)
            .push_str(record.encode().as_str());
        Ok(())
    }

    fn replay(&self, visit: &mut dyn FnMut(&str)) -> Result<(), StorageError> {
        let contents = self.contents.as_deref().ok_or(StorageError::NotFound)?;
        for line in contents.lines() {
            visit(line);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_lazily() {
        let mut store = MemoryLogStore::new();
        assert!(!store.exists());
        assert_eq!(store.replay(&mut |_| {}), Err(StorageError::NotFound));

        store.append(&Record::new(1000, 120)).unwrap();
        assert!(store.exists());
    }

    #[test]
    fn test_append_then_replay() {
        let mut store = MemoryLogStore::new();
        store.append(&Record::new(1000, 120)).unwrap();
        store.append(&Record::new(1001, 121)).unwrap();

        let mut replayed = Vec::new();
        store
            .replay(&mut |line: &str| replayed.push(line.parse::<Record>().unwrap()))
            .unwrap();

        assert_eq!(replayed, [Record::new(1000, 120), Record::new(1001, 121)]);
        assert_eq!(store.contents(), "1000,120\n1001,121\n");
    }
}
