//! Persistent storage for the transaction set.
//!
//! The store holds one blob: a JSON array of transaction records. Reading
//! returns the raw text so that [crate::migration] can upgrade old records.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::{StorageError, transaction::Transaction};

/// Reads and writes the stored transaction records.
pub trait Store {
    /// The raw stored text, or `None` if nothing has been stored yet.
    fn read(&self) -> Result<Option<String>, StorageError>;

    /// Replace the stored records with `records`.
    fn write(&mut self, records: &[&Transaction]) -> Result<(), StorageError>;
}

fn serialize_records(records: &[&Transaction]) -> Result<String, StorageError> {
    serde_json::to_string_pretty(records)
        .map_err(|error| StorageError::Write(format!("could not serialize records: {error}")))
}

/// Stores the records as a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store backed by the file at `path`.
    ///
    /// The file and its parent directories are created on the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Store for JsonFileStore {
    fn read(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(StorageError::Read(format!(
                "could not read {}: {error}",
                self.path.display()
            ))),
        }
    }

    fn write(&mut self, records: &[&Transaction]) -> Result<(), StorageError> {
        let contents = serialize_records(records)?;
        let write_error = |error: std::io::Error| {
            StorageError::Write(format!("could not write {}: {error}", self.path.display()))
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }

        // Write to a sibling file first so a failed write never truncates the store.
        let temporary_path = self.path.with_extension("json.tmp");
        fs::write(&temporary_path, contents).map_err(write_error)?;
        fs::rename(&temporary_path, &self.path).map_err(write_error)?;

        tracing::debug!("Wrote {} records to {}", records.len(), self.path.display());

        Ok(())
    }
}

/// Keeps the stored text in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    contents: Option<String>,
    fail_writes: bool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `contents`.
    pub fn with_contents(contents: &str) -> Self {
        Self {
            contents: Some(contents.to_owned()),
            fail_writes: false,
        }
    }

    /// Make every subsequent write fail.
    pub fn fail_writes(mut self, fail_writes: bool) -> Self {
        self.fail_writes = fail_writes;
        self
    }

    /// The currently stored text.
    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl Store for MemoryStore {
    fn read(&self) -> Result<Option<String>, StorageError> {
        Ok(self.contents.clone())
    }

    fn write(&mut self, records: &[&Transaction]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Write("the store is read-only".to_owned()));
        }

        self.contents = Some(serialize_records(records)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        migration::load,
        storage::{JsonFileStore, MemoryStore, Store},
        transaction::{Kind, Transaction},
    };

    fn create_test_transaction(id: &str) -> Transaction {
        Transaction::build(4.5, Kind::Expense, "food", 1_709_640_000_000)
            .note("coffee")
            .finalize(id.to_owned())
            .unwrap()
    }

    #[test]
    fn missing_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("tally.json"));

        assert_eq!(store.read(), Ok(None));
    }

    #[test]
    fn file_store_round_trips_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("nested").join("tally.json"));
        let transaction = create_test_transaction("a");

        store.write(&[&transaction]).unwrap();
        let raw = store.read().unwrap();
        let loaded = load(raw.as_deref());

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get("a"), Some(&transaction));
        assert!(!dir.path().join("nested").join("tally.json.tmp").exists());
    }

    #[test]
    fn directory_path_fails_to_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        assert!(store.read().is_err());
    }

    #[test]
    fn memory_store_can_fail_writes() {
        let mut store = MemoryStore::with_contents("[]").fail_writes(true);

        let result = store.write(&[&create_test_transaction("a")]);

        assert!(result.is_err());
        assert_eq!(store.contents(), Some("[]"));
    }
}
