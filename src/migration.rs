//! Schema migration for stored and imported records.
//!
//! Records written before income tracking existed have no `type` field. They
//! are upgraded to expenses when read. The upgrade is applied at read time
//! only, never written back in the old shape, and applying it to an already
//! upgraded record changes nothing.

use serde_json::{Map, Value};

use crate::{
    StorageError,
    transaction::{Kind, Transaction, TransactionSet},
};

/// The field holding a record's [Kind].
pub const KIND_FIELD: &str = "type";

/// Upgrade a single record in place.
///
/// Returns `true` if the record was changed.
pub fn migrate_record(record: &mut Map<String, Value>) -> bool {
    if record.contains_key(KIND_FIELD) {
        return false;
    }

    record.insert(
        KIND_FIELD.to_owned(),
        Value::String(Kind::Expense.as_str().to_owned()),
    );
    true
}

/// Upgrade every record in a JSON array. Non-object elements are left untouched.
pub fn migrate_records(mut records: Value) -> Value {
    if let Value::Array(items) = &mut records {
        for item in items {
            if let Value::Object(record) = item {
                migrate_record(record);
            }
        }
    }

    records
}

/// Upgrade and decode a single raw record.
pub fn decode_record(mut record: Value) -> Result<Transaction, serde_json::Error> {
    if let Value::Object(fields) = &mut record {
        migrate_record(fields);
    }

    serde_json::from_value(record)
}

/// The id of a raw record, accepting both string and numeric ids.
pub fn record_id(record: &Value) -> Option<String> {
    match record.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Build the transaction set from the raw contents of the store.
///
/// Absent or malformed data yields an empty set. Malformed data is logged,
/// it is never an error for the caller.
pub fn load(raw: Option<&str>) -> TransactionSet {
    let Some(raw) = raw else {
        tracing::debug!("No stored transactions, starting with an empty set.");
        return TransactionSet::new();
    };

    match parse_stored(raw) {
        Ok(transactions) => transactions,
        Err(error) => {
            tracing::warn!("{error}. Starting with an empty transaction set.");
            TransactionSet::new()
        }
    }
}

/// Parse and upgrade the stored records.
///
/// Either every record is decoded or none are.
///
/// # Errors
///
/// Returns [StorageError::Read] if `raw` is not a JSON array of records.
pub fn parse_stored(raw: &str) -> Result<TransactionSet, StorageError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|error| StorageError::Read(format!("stored data is not valid JSON: {error}")))?;

    let Value::Array(records) = value else {
        return Err(StorageError::Read(
            "stored data is not a list of records".to_owned(),
        ));
    };

    let mut transactions = TransactionSet::new();
    let mut migrated = 0;

    for (position, mut record) in records.into_iter().enumerate() {
        if let Value::Object(fields) = &mut record {
            if migrate_record(fields) {
                migrated += 1;
            }
        }

        let transaction: Transaction = serde_json::from_value(record).map_err(|error| {
            StorageError::Read(format!("stored record {position} is invalid: {error}"))
        })?;

        if transactions.contains(&transaction.id) {
            tracing::warn!(
                "Ignoring stored record {position}: duplicate id {}",
                transaction.id
            );
            continue;
        }

        transactions
            .insert(transaction)
            .map_err(|error| StorageError::Read(error.to_string()))?;
    }

    if migrated > 0 {
        tracing::info!("Upgraded {migrated} stored records without a type to expenses.");
    }

    Ok(transactions)
}
