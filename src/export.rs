//! Backup export.
//!
//! A backup is the full transaction set as a pretty-printed JSON array of
//! records, newest first, with no wrapper object. The same file can be fed
//! back through [crate::merge::import_text].

use std::path::{Path, PathBuf};

use time::Date;

use crate::{Error, StorageError, transaction::TransactionSet};

/// The application name used in backup file names.
pub const APP_NAME: &str = "tally";

/// A backup ready to be written or handed to a share facility.
#[derive(Debug, Clone, PartialEq)]
pub struct Backup {
    /// The suggested file name, e.g. `tally-backup-2024-03-15.json`.
    pub file_name: String,
    /// The JSON payload.
    pub contents: String,
}

/// The file name for a backup made on `date`.
pub fn backup_file_name(app_name: &str, date: Date) -> String {
    format!("{app_name}-backup-{date}.json")
}

/// Create a backup of `transactions` dated `today`.
///
/// # Errors
///
/// Returns [Error::JSONSerializationError] if the records cannot be serialized.
pub fn create_backup(transactions: &TransactionSet, today: Date) -> Result<Backup, Error> {
    let contents = serde_json::to_string_pretty(&transactions.sorted())
        .map_err(|error| Error::JSONSerializationError(error.to_string()))?;

    Ok(Backup {
        file_name: backup_file_name(APP_NAME, today),
        contents,
    })
}

/// Write `backup` into `directory`, returning the path of the new file.
///
/// # Errors
///
/// Returns [StorageError::Write] if the directory or file cannot be written.
pub fn write_backup(directory: &Path, backup: &Backup) -> Result<PathBuf, StorageError> {
    let path = directory.join(&backup.file_name);

    std::fs::create_dir_all(directory)
        .and_then(|_| std::fs::write(&path, &backup.contents))
        .map_err(|error| StorageError::Write(format!("could not write {}: {error}", path.display())))?;

    tracing::info!("Exported backup to {}", path.display());

    Ok(path)
}
