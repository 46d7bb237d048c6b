//! The transaction model and the id-indexed transaction set.

use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{Error, calendar::Timestamp, category, id::TransactionId};

/// Whether money was spent or earned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// Money spent.
    Expense,
    /// Money earned.
    Income,
}

impl Kind {
    /// The value used for this kind in stored records and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error returned when a string is not a valid [Kind].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("\"{0}\" is not a transaction kind, expected expense or income")]
pub struct ParseKindError(pub String);

impl FromStr for Kind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            _ => Err(ParseKindError(s.to_owned())),
        }
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// Transactions are never mutated. Editing a transaction replaces it with a
/// new value that has the same id.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Opaque identifier, the sole key used when reconciling imports.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: TransactionId,
    /// The amount of money spent or earned, always positive.
    pub amount: f64,
    /// Whether the transaction is an expense or income.
    #[serde(rename = "type")]
    pub kind: Kind,
    /// The category id, see [crate::category].
    #[serde(default = "default_category")]
    pub category: String,
    /// A free text note.
    #[serde(default)]
    pub note: String,
    /// When the transaction happened, in milliseconds since the Unix epoch.
    #[serde(rename = "date", deserialize_with = "deserialize_timestamp")]
    pub timestamp: Timestamp,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        amount: f64,
        kind: Kind,
        category: &str,
        timestamp: Timestamp,
    ) -> TransactionBuilder {
        TransactionBuilder {
            amount,
            kind,
            category: category.to_owned(),
            note: String::new(),
            timestamp,
        }
    }

    /// The display metadata for this transaction's category.
    pub fn category_definition(&self) -> &'static category::CategoryDefinition {
        category::lookup(&self.category)
    }
}

fn default_category() -> String {
    category::FALLBACK.id.to_owned()
}

/// A builder for creating [Transaction] instances.
///
/// ```ignore
/// let transaction = Transaction::build(12.5, Kind::Expense, "food", 1_709_596_800_000)
///     .note("Lunch")
///     .finalize("a1b2".to_owned())?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionBuilder {
    /// The amount of money, must be greater than zero.
    pub amount: f64,
    /// Whether the transaction is an expense or income.
    pub kind: Kind,
    /// The category id. Not checked against the registry or `kind`.
    pub category: String,
    /// A free text note, empty by default.
    pub note: String,
    /// When the transaction happened.
    pub timestamp: Timestamp,
}

impl TransactionBuilder {
    /// Set the note for the transaction.
    pub fn note(mut self, note: &str) -> Self {
        self.note = note.to_owned();
        self
    }

    /// Create the transaction with the given id.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidAmount] if the amount is not a finite number
    /// greater than zero.
    pub fn finalize(self, id: TransactionId) -> Result<Transaction, Error> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(Error::InvalidAmount(self.amount));
        }

        Ok(Transaction {
            id,
            amount: self.amount,
            kind: self.kind,
            category: self.category,
            note: self.note,
            timestamp: self.timestamp,
        })
    }
}

/// Accepts string ids and the numeric ids written by older versions.
fn deserialize_id<'de, D>(deserializer: D) -> Result<TransactionId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

/// Accepts epoch milliseconds or an RFC 3339 date-time string.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Millis(i64),
        Fractional(f64),
        Text(String),
    }

    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Millis(millis) => Ok(millis),
        RawTimestamp::Fractional(millis) => Ok(millis.round() as Timestamp),
        RawTimestamp::Text(text) => OffsetDateTime::parse(&text, &Rfc3339)
            .map(crate::calendar::to_timestamp)
            .map_err(|error| serde::de::Error::custom(format!("invalid date \"{text}\": {error}"))),
    }
}

/// A collection of transactions keyed by id.
///
/// Iteration follows insertion order. Use [TransactionSet::sorted] for the
/// display order, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionSet {
    transactions: Vec<Transaction>,
    index: HashMap<TransactionId, usize>,
}

impl TransactionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of transactions in the set.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Whether the set has no transactions.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Whether a transaction with `id` is in the set.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Get the transaction with `id`.
    pub fn get(&self, id: &str) -> Option<&Transaction> {
        self.index.get(id).map(|&position| &self.transactions[position])
    }

    /// Add a transaction to the set.
    ///
    /// # Errors
    ///
    /// Returns [Error::DuplicateId] if a transaction with the same id exists.
    pub fn insert(&mut self, transaction: Transaction) -> Result<(), Error> {
        if self.contains(&transaction.id) {
            return Err(Error::DuplicateId(transaction.id));
        }

        self.index
            .insert(transaction.id.clone(), self.transactions.len());
        self.transactions.push(transaction);

        Ok(())
    }

    /// Replace the transaction that has the same id as `transaction`.
    ///
    /// Returns the transaction that was replaced.
    ///
    /// # Errors
    ///
    /// Returns [Error::UpdateMissingTransaction] if no transaction has that id.
    pub fn replace(&mut self, transaction: Transaction) -> Result<Transaction, Error> {
        let Some(&position) = self.index.get(&transaction.id) else {
            return Err(Error::UpdateMissingTransaction(transaction.id));
        };

        Ok(std::mem::replace(
            &mut self.transactions[position],
            transaction,
        ))
    }

    /// Remove the transaction with `id`, returning it.
    ///
    /// # Errors
    ///
    /// Returns [Error::DeleteMissingTransaction] if no transaction has that id.
    pub fn remove(&mut self, id: &str) -> Result<Transaction, Error> {
        let Some(position) = self.index.remove(id) else {
            return Err(Error::DeleteMissingTransaction(id.to_owned()));
        };

        let removed = self.transactions.remove(position);

        for moved in &self.transactions[position..] {
            if let Some(entry) = self.index.get_mut(&moved.id) {
                *entry -= 1;
            }
        }

        Ok(removed)
    }

    /// Iterate over the transactions in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Transaction> {
        self.transactions.iter()
    }

    /// The transactions in display order: newest first, ties in insertion order.
    pub fn sorted(&self) -> Vec<&Transaction> {
        let mut sorted: Vec<&Transaction> = self.transactions.iter().collect();
        sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        sorted
    }
}

impl<'a> IntoIterator for &'a TransactionSet {
    type Item = &'a Transaction;
    type IntoIter = std::slice::Iter<'a, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
