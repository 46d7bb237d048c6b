//! Tally is a personal transaction tracker.
//!
//! This library provides the time-windowed aggregation and reconciliation
//! engine behind it:
//! - [range] resolves the day, week, month or year containing an instant,
//! - [aggregation] computes totals, category breakdowns and trend series,
//! - [merge] reconciles an imported backup with the existing transactions,
//! - [migration] upgrades records written by older versions.
//!
//! [ledger::Ledger] ties these to a [storage::Store] for the command line
//! application.

#![warn(missing_docs)]

pub mod aggregation;
pub mod calendar;
pub mod category;
pub mod config;
pub mod export;
pub mod id;
pub mod ledger;
pub mod logging;
pub mod merge;
pub mod migration;
pub mod range;
pub mod report;
pub mod storage;
pub mod transaction;

pub use aggregation::{CategoryShare, Summary, TrendBucket, ViewMode, aggregate};
pub use calendar::{LocalCalendar, Timestamp};
pub use ledger::{ImportSummary, Ledger};
pub use merge::{MergeOutcome, merge};
pub use range::{Granularity, ResolvedRange, resolve};
pub use transaction::{Kind, Transaction, TransactionBuilder, TransactionSet};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A transaction was created with an amount that is not greater than zero.
    #[error("{0} is not a valid amount, amounts must be greater than zero")]
    InvalidAmount(f64),

    /// A transaction was added with an ID that is already in use.
    #[error("a transaction with the ID {0} already exists")]
    DuplicateId(String),

    /// Tried to update a transaction that does not exist
    #[error("tried to update transaction {0}, which does not exist")]
    UpdateMissingTransaction(String),

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete transaction {0}, which does not exist")]
    DeleteMissingTransaction(String),

    /// An import was rejected. Nothing was merged.
    #[error(transparent)]
    Import(#[from] ImportError),

    /// Reading from or writing to persistent storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The configured timezone is not a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),
}

/// The reasons an imported backup is rejected.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ImportError {
    /// The file is not valid JSON.
    #[error("the file is not valid JSON: {0}")]
    Parse(String),

    /// The file is JSON, but not a list of transaction records.
    #[error("the file is not a transaction backup: {0}")]
    Format(String),
}

/// Failures of the persistent store.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum StorageError {
    /// The stored data could not be read or is malformed.
    #[error("could not load stored transactions: {0}")]
    Read(String),

    /// The transactions could not be written.
    #[error("could not save transactions: {0}")]
    Write(String),
}
