//! The host-side owner of the transaction set.
//!
//! A [Ledger] loads the stored records once, keeps the set in memory and
//! writes it back after every mutation. Write failures are logged and leave
//! the in-memory state in place until the next successful write.

use time::Date;

use crate::{
    Error,
    aggregation::{Summary, ViewMode, aggregate},
    calendar::LocalCalendar,
    export::{Backup, create_backup},
    merge::import_text,
    migration,
    range::{Granularity, ResolvedRange, resolve_date},
    storage::Store,
    transaction::{Transaction, TransactionSet},
};

/// The result of importing a backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    /// The number of records added.
    pub added: usize,
    /// The number of records skipped because their id already existed.
    pub skipped: usize,
}

impl ImportSummary {
    /// Whether the import contained nothing new.
    pub fn no_new_records(&self) -> bool {
        self.added == 0
    }
}

/// The in-memory transaction set and the store it is persisted to.
#[derive(Debug)]
pub struct Ledger<S: Store> {
    store: S,
    transactions: TransactionSet,
    calendar: LocalCalendar,
    dirty: bool,
}

impl<S: Store> Ledger<S> {
    /// Load the transactions from `store`.
    ///
    /// Read failures and malformed data are logged and produce an empty ledger.
    pub fn open(store: S, calendar: LocalCalendar) -> Self {
        let raw = store.read().unwrap_or_else(|error| {
            tracing::warn!("{error}. Starting with an empty transaction set.");
            None
        });
        let transactions = migration::load(raw.as_deref());

        tracing::info!("Loaded {} transactions.", transactions.len());

        Self {
            store,
            transactions,
            calendar,
            dirty: false,
        }
    }

    /// The transactions currently held in memory.
    pub fn transactions(&self) -> &TransactionSet {
        &self.transactions
    }

    /// The calendar periods are resolved against.
    pub fn calendar(&self) -> &LocalCalendar {
        &self.calendar
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether the last write to the store failed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Add a new transaction and persist the set.
    ///
    /// # Errors
    ///
    /// Returns [Error::DuplicateId] if the id is already in use.
    pub fn add(&mut self, transaction: Transaction) -> Result<(), Error> {
        let id = transaction.id.clone();
        self.transactions.insert(transaction)?;
        tracing::info!("Added transaction {id}.");
        self.persist();

        Ok(())
    }

    /// Replace the transaction with the same id and persist the set.
    ///
    /// # Errors
    ///
    /// Returns [Error::UpdateMissingTransaction] if no transaction has that id.
    pub fn replace(&mut self, transaction: Transaction) -> Result<Transaction, Error> {
        let previous = self.transactions.replace(transaction)?;
        tracing::info!("Updated transaction {}.", previous.id);
        self.persist();

        Ok(previous)
    }

    /// Delete the transaction with `id` and persist the set.
    ///
    /// # Errors
    ///
    /// Returns [Error::DeleteMissingTransaction] if no transaction has that id.
    pub fn delete(&mut self, id: &str) -> Result<Transaction, Error> {
        let removed = self.transactions.remove(id)?;
        tracing::info!("Deleted transaction {id}.");
        self.persist();

        Ok(removed)
    }

    /// Merge the backup in `text` into the ledger.
    ///
    /// The store is only written when at least one record was added.
    ///
    /// # Errors
    ///
    /// Returns [Error::Import] if the text is not valid JSON or not a list of
    /// transaction records. The ledger is left untouched in that case.
    pub fn import(&mut self, text: &str) -> Result<ImportSummary, Error> {
        let outcome = import_text(&self.transactions, text)?;
        let summary = ImportSummary {
            added: outcome.added,
            skipped: outcome.skipped,
        };

        if summary.no_new_records() {
            tracing::info!("Import contained no new records.");
        } else {
            self.transactions = outcome.merged;
            self.persist();
        }

        Ok(summary)
    }

    /// Create a backup of every transaction, named for `today`.
    pub fn export(&self, today: Date) -> Result<Backup, Error> {
        create_backup(&self.transactions, today)
    }

    /// Resolve the period of `granularity` containing `anchor`.
    pub fn resolve(&self, anchor: Date, granularity: Granularity) -> ResolvedRange {
        resolve_date(anchor, granularity, &self.calendar)
    }

    /// The transactions within `range`, newest first.
    pub fn transactions_in(&self, range: &ResolvedRange) -> Vec<&Transaction> {
        self.transactions
            .sorted()
            .into_iter()
            .filter(|transaction| range.contains(transaction.timestamp))
            .collect()
    }

    /// Aggregate the period of `granularity` containing `anchor`.
    pub fn summarize(
        &self,
        anchor: Date,
        granularity: Granularity,
        view_mode: ViewMode,
        today: Date,
    ) -> Summary {
        let range = self.resolve(anchor, granularity);
        aggregate(&self.transactions, &range, view_mode, today, &self.calendar)
    }

    fn persist(&mut self) {
        match self.store.write(&self.transactions.sorted()) {
            Ok(()) => self.dirty = false,
            Err(error) => {
                tracing::error!("Failed to save transactions: {error}");
                self.dirty = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{
        Error, ImportError,
        aggregation::ViewMode,
        calendar::LocalCalendar,
        ledger::Ledger,
        migration::load,
        range::Granularity,
        storage::{MemoryStore, Store},
        transaction::{Kind, Transaction},
    };

    fn create_test_transaction(id: &str, amount: f64, kind: Kind, category: &str) -> Transaction {
        // 2024-03-05T12:00:00Z
        Transaction::build(amount, kind, category, 1_709_640_000_000)
            .finalize(id.to_owned())
            .unwrap()
    }

    fn stored(ledger: &Ledger<MemoryStore>) -> usize {
        load(ledger.store().read().unwrap().as_deref()).len()
    }

    #[test]
    fn open_malformed_store_is_empty() {
        let ledger = Ledger::open(MemoryStore::with_contents("oops"), LocalCalendar::utc());

        assert!(ledger.transactions().is_empty());
    }

    #[test]
    fn mutations_are_written_to_store() {
        let mut ledger = Ledger::open(MemoryStore::new(), LocalCalendar::utc());

        ledger
            .add(create_test_transaction("a", 10.0, Kind::Expense, "food"))
            .unwrap();
        ledger
            .add(create_test_transaction("b", 20.0, Kind::Income, "salary"))
            .unwrap();
        assert_eq!(stored(&ledger), 2);

        ledger
            .replace(create_test_transaction("a", 15.0, Kind::Expense, "food"))
            .unwrap();
        ledger.delete("b").unwrap();

        let reloaded = Ledger::open(
            MemoryStore::with_contents(ledger.store().contents().unwrap()),
            LocalCalendar::utc(),
        );
        assert_eq!(reloaded.transactions().len(), 1);
        assert_eq!(
            reloaded.transactions().get("a").map(|t| t.amount),
            Some(15.0)
        );
        assert!(!ledger.is_dirty());
    }

    #[test]
    fn failed_write_keeps_memory_state() {
        let mut ledger = Ledger::open(
            MemoryStore::new().fail_writes(true),
            LocalCalendar::utc(),
        );

        ledger
            .add(create_test_transaction("a", 10.0, Kind::Expense, "food"))
            .unwrap();

        assert!(ledger.is_dirty());
        assert_eq!(ledger.transactions().len(), 1);
        assert_eq!(ledger.store().contents(), None);
    }

    #[test]
    fn deleting_missing_transaction_fails() {
        let mut ledger = Ledger::open(MemoryStore::new(), LocalCalendar::utc());

        assert_eq!(
            ledger.delete("nope").map(|t| t.id),
            Err(Error::DeleteMissingTransaction("nope".to_owned()))
        );
    }

    #[test]
    fn import_then_reimport_adds_nothing() {
        let mut ledger = Ledger::open(MemoryStore::new(), LocalCalendar::utc());
        ledger
            .add(create_test_transaction("a", 10.0, Kind::Expense, "food"))
            .unwrap();
        let backup = r#"[
            {"id": "a", "amount": 10, "type": "expense", "category": "food", "note": "", "date": 1709640000000},
            {"id": "b", "amount": 5, "category": "transport", "note": "", "date": 1709640000000}
        ]"#;

        let first = ledger.import(backup).unwrap();
        let second = ledger.import(backup).unwrap();

        assert_eq!(first.added, 1);
        assert_eq!(first.skipped, 1);
        assert!(second.no_new_records());
        assert_eq!(ledger.transactions().len(), 2);
        assert_eq!(stored(&ledger), 2);
    }

    #[test]
    fn failed_import_leaves_ledger_untouched() {
        let mut ledger = Ledger::open(MemoryStore::new(), LocalCalendar::utc());
        ledger
            .add(create_test_transaction("a", 10.0, Kind::Expense, "food"))
            .unwrap();

        let parse = ledger.import("not json");
        let format = ledger.import(r#"{"id": "b"}"#);

        assert!(matches!(parse, Err(Error::Import(ImportError::Parse(_)))));
        assert!(matches!(format, Err(Error::Import(ImportError::Format(_)))));
        assert_eq!(ledger.transactions().len(), 1);
    }

    #[test]
    fn export_round_trips_through_import() {
        let mut ledger = Ledger::open(MemoryStore::new(), LocalCalendar::utc());
        ledger
            .add(create_test_transaction("a", 10.0, Kind::Expense, "food"))
            .unwrap();

        let backup = ledger.export(date!(2024 - 03 - 05)).unwrap();
        let mut other = Ledger::open(MemoryStore::new(), LocalCalendar::utc());
        let summary = other.import(&backup.contents).unwrap();

        assert_eq!(backup.file_name, "tally-backup-2024-03-05.json");
        assert_eq!(summary.added, 1);
        assert_eq!(other.transactions(), ledger.transactions());
    }

    #[test]
    fn export_includes_transactions_from_other_days() {
        let mut ledger = Ledger::open(MemoryStore::new(), LocalCalendar::utc());
        ledger
            .add(create_test_transaction("a", 10.0, Kind::Expense, "food"))
            .unwrap();

        let backup = ledger.export(date!(2025 - 01 - 01)).unwrap();

        assert_eq!(backup.file_name, "tally-backup-2025-01-01.json");
        assert_eq!(load(Some(backup.contents.as_str())).len(), 1);
    }

    #[test]
    fn summarize_uses_ledger_calendar() {
        let mut ledger = Ledger::open(MemoryStore::new(), LocalCalendar::utc());
        ledger
            .add(create_test_transaction("a", 100.0, Kind::Expense, "food"))
            .unwrap();

        let summary = ledger.summarize(
            date!(2024 - 03 - 15),
            Granularity::Month,
            ViewMode::Expense,
            date!(2024 - 03 - 15),
        );
        let in_range = ledger.transactions_in(&summary.range);

        assert_eq!(summary.total_expense, 100.0);
        assert_eq!(summary.trend.len(), 15);
        assert_eq!(in_range.len(), 1);
    }
}
