// Loading and persisting whole record collections

use crate::error::{Result, StoreError};
use crate::record::Record;
use crate::storage::Storage;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Records that survived validation, plus how many were dropped
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub records: Vec<T>,
    pub dropped: usize,
    /// Kept records that had missing fields filled in
    pub filled: usize,
}

/// Why a single record was rejected
#[derive(Debug, Clone, PartialEq)]
pub struct RecordError {
    pub index: usize,
    pub reason: String,
}

/// Validate a list of untrusted values
///
/// Invalid records and repeated ids are skipped with a warning. With
/// `strict` the first rejected record aborts the whole decode instead.
pub fn decode_records<T: Record>(values: &[Value], strict: bool) -> std::result::Result<Decoded<T>, RecordError> {
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(values.len());
    let mut dropped = 0;
    let mut filled = 0;

    for (index, value) in values.iter().enumerate() {
        let record = match T::from_value(value) {
            Ok(r) => r,
            Err(reason) => {
                if strict {
                    return Err(RecordError { index, reason });
                }
                warn!(key = T::storage_key(), index, reason = %reason, "Skipping invalid record");
                dropped += 1;
                continue;
            }
        };

        if !seen.insert(record.id().to_string()) {
            let reason = format!("duplicate id {}", record.id());
            if strict {
                return Err(RecordError { index, reason });
            }
            warn!(key = T::storage_key(), index, reason = %reason, "Skipping duplicate record");
            dropped += 1;
            continue;
        }

        if T::fills_missing_fields(value) {
            filled += 1;
        }
        records.push(record);
    }

    Ok(Decoded {
        records,
        dropped,
        filled,
    })
}

/// Parse a stored collection document
pub fn decode_collection<T: Record>(raw: &str) -> Result<Decoded<T>> {
    let key = T::storage_key();
    let value: Value = serde_json::from_str(raw).map_err(|e| StoreError::MalformedStorageData {
        key: key.to_string(),
        reason: e.to_string(),
    })?;

    let values = value.as_array().ok_or_else(|| StoreError::MalformedStorageData {
        key: key.to_string(),
        reason: "expected a JSON array".to_string(),
    })?;

    // Lenient decoding never fails
    let decoded = decode_records::<T>(values, false).map_err(|e| StoreError::MalformedStorageData {
        key: key.to_string(),
        reason: e.reason,
    })?;

    info!(
        key,
        count = decoded.records.len(),
        dropped = decoded.dropped,
        filled = decoded.filled,
        "Loaded records from storage"
    );

    Ok(decoded)
}

/// Load a collection; `None` when nothing has been stored yet
pub fn load<T: Record>(storage: &dyn Storage) -> Result<Option<Decoded<T>>> {
    match storage.get(T::storage_key())? {
        Some(raw) => decode_collection(&raw).map(Some),
        None => Ok(None),
    }
}

/// Write the full collection under its key
pub fn persist<T: Record>(storage: &dyn Storage, records: &[T]) -> Result<()> {
    let key = T::storage_key();
    let json = serde_json::to_string(records).map_err(|e| StoreError::MalformedStorageData {
        key: key.to_string(),
        reason: e.to_string(),
    })?;

    storage.set(key, &json)?;
    debug!(key, count = records.len(), "Persisted collection");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, TODOS_KEY, Todo};
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn raw_todo(id: &str) -> Value {
        json!({
            "id": id,
            "text": format!("Todo {}", id),
            "completed": false,
            "createdAt": "2024-01-01T08:00:00.000Z",
            "updatedAt": "2024-01-01T08:00:00.000Z"
        })
    }

    #[test]
    fn test_decode_records_skips_invalid() {
        let values = vec![raw_todo("a"), json!({"id": "b"}), raw_todo("c")];

        let decoded = decode_records::<Todo>(&values, false).unwrap();
        assert_eq!(decoded.records.len(), 2);
        assert_eq!(decoded.dropped, 1);
        assert_eq!(decoded.records[0].id, "a");
        assert_eq!(decoded.records[1].id, "c");
    }

    #[test]
    fn test_decode_records_strict_rejects() {
        let values = vec![raw_todo("a"), json!({"id": "b"})];

        let err = decode_records::<Todo>(&values, true).unwrap_err();
        assert_eq!(err.index, 1);
    }

    #[test]
    fn test_decode_records_drops_duplicate_ids() {
        let values = vec![raw_todo("a"), raw_todo("a"), raw_todo("b")];

        let decoded = decode_records::<Todo>(&values, false).unwrap();
        assert_eq!(decoded.records.len(), 2);
        assert_eq!(decoded.dropped, 1);

        assert!(decode_records::<Todo>(&values, true).is_err());
    }

    #[test]
    fn test_decode_records_counts_filled_fields() {
        let values = vec![
            json!({"id": "work", "name": "Work"}),
            json!({"id": "home", "name": "Home", "createdAt": "2024-01-01T08:00:00.000Z"}),
        ];

        let decoded = decode_records::<Category>(&values, false).unwrap();
        assert_eq!(decoded.records.len(), 2);
        assert_eq!(decoded.filled, 1);

        let todos = decode_records::<Todo>(&[raw_todo("a")], false).unwrap();
        assert_eq!(todos.filled, 0);
    }

    #[test]
    fn test_decode_collection_malformed() {
        let err = decode_collection::<Todo>("{not json").unwrap_err();
        assert!(matches!(err, StoreError::MalformedStorageData { .. }));

        let err = decode_collection::<Todo>(r#"{"todos": []}"#).unwrap_err();
        assert!(matches!(err, StoreError::MalformedStorageData { .. }));
    }

    #[test]
    fn test_load_and_persist() {
        let storage = MemoryStorage::new();
        assert_eq!(load::<Todo>(&storage).unwrap(), None);

        let todos = decode_records::<Todo>(&[raw_todo("a"), raw_todo("b")], true)
            .unwrap()
            .records;
        persist(&storage, &todos).unwrap();
        assert!(storage.raw(TODOS_KEY).is_some());

        let loaded = load::<Todo>(&storage).unwrap().unwrap();
        assert_eq!(loaded.records, todos);
        assert_eq!(loaded.filled, 0);
    }
}
