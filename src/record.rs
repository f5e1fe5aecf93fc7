// Generic record trait for collections persisted under a single storage key

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Core trait that any persisted collection member must implement
pub trait Record: Serialize + Clone + 'static {
    /// Unique identifier for this record
    fn id(&self) -> &str;

    /// Storage key the whole collection is written under
    fn storage_key() -> &'static str
    where
        Self: Sized;

    /// Build a record from untrusted JSON, repairing what can be repaired
    ///
    /// Returns the reason the value was rejected otherwise.
    fn from_value(value: &Value) -> Result<Self, String>
    where
        Self: Sized;

    /// True when `from_value` fills in a field the stored copy lacks, so the
    /// collection must be written back to keep the value stable
    fn fills_missing_fields(_value: &Value) -> bool
    where
        Self: Sized,
    {
        false
    }
}

/// Read a required, non-empty id field; legacy numeric ids become strings
pub(crate) fn required_id(obj: &serde_json::Map<String, Value>) -> Result<String, String> {
    match obj.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err("missing id".to_string()),
    }
}

pub(crate) fn required_str<'a>(obj: &'a serde_json::Map<String, Value>, field: &str) -> Result<&'a str, String> {
    obj.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing string field {}", field))
}

pub(crate) fn optional_str(obj: &serde_json::Map<String, Value>, field: &str) -> Option<String> {
    obj.get(field).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn required_timestamp(obj: &serde_json::Map<String, Value>, field: &str) -> Result<DateTime<Utc>, String> {
    let raw = required_str(obj, field)?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp in {}: {}", field, e))
}
