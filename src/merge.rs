//! Reconciliation of imported records with the existing transaction set.
//!
//! Records are matched by id only. A record whose id is already known is
//! skipped, so importing the same backup twice adds nothing the second time.

use serde_json::Value;

use crate::{
    ImportError,
    migration::{decode_record, record_id},
    transaction::TransactionSet,
};

/// The result of merging an import into a transaction set.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// The existing transactions plus every newly added record.
    pub merged: TransactionSet,
    /// The number of records that were added.
    pub added: usize,
    /// The number of records skipped because their id already existed.
    pub skipped: usize,
}

/// Parse `text` as JSON and merge it into `existing`.
///
/// # Errors
///
/// Returns [ImportError::Parse] if `text` is not valid JSON, otherwise see [merge].
pub fn import_text(existing: &TransactionSet, text: &str) -> Result<MergeOutcome, ImportError> {
    let incoming: Value =
        serde_json::from_str(text).map_err(|error| ImportError::Parse(error.to_string()))?;

    merge(existing, &incoming)
}

/// Merge the candidate records in `incoming` into `existing`.
///
/// Candidates are processed in order. Each one whose id is not yet in the
/// working set is upgraded (see [crate::migration]) and added, so a later
/// duplicate within the same import is skipped as well.
///
/// `existing` is never modified. On error nothing is merged.
///
/// # Errors
///
/// Returns [ImportError::Format] if `incoming` is not an array of records
/// that each have an `id` and an `amount`, or if a new record cannot be
/// decoded as a transaction.
pub fn merge(existing: &TransactionSet, incoming: &Value) -> Result<MergeOutcome, ImportError> {
    let candidates = validate_shape(incoming)?;

    let mut merged = existing.clone();
    let mut added = 0;
    let mut skipped = 0;

    for (position, (id, candidate)) in candidates.into_iter().enumerate() {
        if merged.contains(&id) {
            tracing::debug!("Skipping record {position}: id {id} already exists");
            skipped += 1;
            continue;
        }

        let transaction = decode_record(candidate.clone()).map_err(|error| {
            ImportError::Format(format!("record {position} is not a valid transaction: {error}"))
        })?;

        merged
            .insert(transaction)
            .map_err(|error| ImportError::Format(format!("record {position}: {error}")))?;
        added += 1;
    }

    tracing::info!("Merged import: {added} added, {skipped} already present.");

    Ok(MergeOutcome {
        merged,
        added,
        skipped,
    })
}

/// Check that every candidate is a record with an id and an amount.
fn validate_shape(incoming: &Value) -> Result<Vec<(String, &Value)>, ImportError> {
    let Value::Array(candidates) = incoming else {
        return Err(ImportError::Format(
            "expected a list of transaction records".to_owned(),
        ));
    };

    candidates
        .iter()
        .enumerate()
        .map(|(position, candidate)| {
            if !candidate.is_object() {
                return Err(ImportError::Format(format!(
                    "record {position} is not an object"
                )));
            }

            let id = record_id(candidate).ok_or_else(|| {
                ImportError::Format(format!("record {position} has no id"))
            })?;

            if candidate.get("amount").is_none() {
                return Err(ImportError::Format(format!(
                    "record {position} has no amount"
                )));
            }

            Ok((id, candidate))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use crate::{
        ImportError,
        merge::{import_text, merge},
        transaction::{Kind, Transaction, TransactionSet},
    };

    fn existing_set() -> TransactionSet {
        let mut set = TransactionSet::new();
        set.insert(
            Transaction::build(100.0, Kind::Expense, "food", 1_709_640_000_000)
                .finalize("1".to_owned())
                .unwrap(),
        )
        .unwrap();
        set
    }

    fn backup() -> Value {
        json!([
            {"id": "1", "amount": 999, "type": "expense", "category": "food", "note": "", "date": 1_709_640_000_000_i64},
            {"id": "2", "amount": 50, "type": "income", "category": "salary", "note": "", "date": 1_710_936_000_000_i64},
            {"id": 3, "amount": 8.5, "category": "transport", "date": 1_710_000_000_000_i64},
        ])
    }

    #[test]
    fn merge_adds_only_new_records() {
        let existing = existing_set();

        let outcome = merge(&existing, &backup()).unwrap();

        assert_eq!(outcome.added, 2);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.merged.len(), 3);
        // The existing record wins over the imported duplicate.
        assert_eq!(outcome.merged.get("1").map(|t| t.amount), Some(100.0));
        // Legacy records without a type are upgraded.
        assert_eq!(outcome.merged.get("3").map(|t| t.kind), Some(Kind::Expense));
    }

    #[test]
    fn merge_is_idempotent() {
        let first = merge(&existing_set(), &backup()).unwrap();

        let second = merge(&first.merged, &backup()).unwrap();

        assert_eq!(second.added, 0);
        assert_eq!(second.merged, first.merged);
    }

    #[test]
    fn merge_is_additive() {
        let existing = existing_set();

        let outcome = merge(&existing, &backup()).unwrap();

        assert_eq!(outcome.merged.len(), existing.len() + outcome.added);
        for transaction in &existing {
            assert_eq!(outcome.merged.get(&transaction.id), Some(transaction));
        }
    }

    #[test]
    fn duplicates_within_one_import_are_skipped() {
        let incoming = json!([
            {"id": "x", "amount": 1, "type": "expense", "date": 0},
            {"id": "x", "amount": 2, "type": "expense", "date": 0},
        ]);

        let outcome = merge(&TransactionSet::new(), &incoming).unwrap();

        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.merged.get("x").map(|t| t.amount), Some(1.0));
    }

    #[test]
    fn non_array_is_a_format_error() {
        let result = merge(&existing_set(), &json!({"transactions": []}));

        assert!(matches!(result, Err(ImportError::Format(_))));
    }

    #[test]
    fn record_without_id_or_amount_is_a_format_error() {
        for incoming in [
            json!([{"id": "9", "amount": 1, "date": 0}, {"amount": 1, "date": 0}]),
            json!([{"id": "9", "date": 0}]),
            json!([42]),
        ] {
            let result = merge(&existing_set(), &incoming);

            assert!(
                matches!(result, Err(ImportError::Format(_))),
                "{incoming} should be rejected"
            );
        }
    }

    #[test]
    fn undecodable_new_record_aborts_whole_merge() {
        let incoming = json!([
            {"id": "ok", "amount": 1, "type": "expense", "date": 0},
            {"id": "bad", "amount": "twelve", "type": "expense", "date": 0},
        ]);

        let result = merge(&TransactionSet::new(), &incoming);

        assert!(matches!(result, Err(ImportError::Format(_))));
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let result = import_text(&existing_set(), "[{\"id\": ");

        assert!(matches!(result, Err(ImportError::Parse(_))));
    }

    #[test]
    fn import_text_merges_valid_json() {
        let text = serde_json::to_string(&backup()).unwrap();

        let outcome = import_text(&existing_set(), &text).unwrap();

        assert_eq!(outcome.added, 2);
    }
}
