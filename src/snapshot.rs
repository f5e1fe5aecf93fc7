// Versioned export/import envelope

use crate::collection::decode_records;
use crate::config::ImportPolicy;
use crate::error::{Result, StoreError};
use crate::models::{Todo, now};
use crate::settings::Settings;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

pub const SNAPSHOT_VERSION: &str = "1.0";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    todos: &'a [Todo],
    #[serde(skip_serializing_if = "Option::is_none")]
    settings: Option<&'a Settings>,
    exported_at: DateTime<Utc>,
    version: &'static str,
}

/// A parsed import file
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub todos: Vec<Todo>,
    pub settings: Option<Settings>,
    pub exported_at: Option<DateTime<Utc>>,
    pub version: Option<String>,
    /// Records skipped under `ImportPolicy::DropInvalid`
    pub dropped: usize,
}

/// Serialize todos (and optionally settings) into a pretty-printed envelope
pub fn export(todos: &[Todo], settings: Option<&Settings>) -> Result<String> {
    let envelope = Envelope {
        todos,
        settings,
        exported_at: now(),
        version: SNAPSHOT_VERSION,
    };

    serde_json::to_string_pretty(&envelope).map_err(export_error)
}

fn export_error(err: serde_json::Error) -> StoreError {
    StoreError::Export(format!("failed to serialize snapshot: {}", err))
}

/// Validate an import blob
///
/// Structural problems always fail. Invalid todo records are dropped or
/// fail the import depending on `policy`.
pub fn parse(blob: &str, policy: ImportPolicy) -> Result<Snapshot> {
    let value: Value = serde_json::from_str(blob).map_err(|e| StoreError::Import(e.to_string()))?;

    let obj = value
        .as_object()
        .ok_or_else(|| StoreError::Import("Invalid todo data format".to_string()))?;
    let items = obj
        .get("todos")
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::Import("Invalid todo data format".to_string()))?;

    let strict = policy == ImportPolicy::RejectAll;
    let decoded = decode_records::<Todo>(items, strict)
        .map_err(|e| StoreError::Import(format!("invalid todo at index {}: {}", e.index, e.reason)))?;

    let settings = match obj.get("settings") {
        None | Some(Value::Null) => None,
        Some(raw) => match serde_json::from_value::<Settings>(raw.clone()) {
            Ok(settings) => Some(settings),
            Err(e) if strict => return Err(StoreError::Import(format!("invalid settings: {}", e))),
            Err(e) => {
                warn!(error = %e, "Ignoring invalid settings in import");
                None
            }
        },
    };

    // Older exports wrote exportDate
    let exported_at = obj
        .get("exportedAt")
        .or_else(|| obj.get("exportDate"))
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    info!(
        count = decoded.records.len(),
        dropped = decoded.dropped,
        has_settings = settings.is_some(),
        "Parsed snapshot"
    );

    Ok(Snapshot {
        todos: decoded.records,
        settings,
        exported_at,
        version: obj.get("version").and_then(Value::as_str).map(str::to_string),
        dropped: decoded.dropped,
    })
}

/// Download name for an export made on `date`
pub fn file_name(date: NaiveDate) -> String {
    format!("todo-backup-{}.json", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Theme;
    use serde_json::json;

    fn sample_todos() -> Vec<Todo> {
        let created = now();
        vec![
            Todo {
                id: "a".to_string(),
                text: "Buy milk".to_string(),
                completed: true,
                created_at: created,
                updated_at: created,
                category: Some("shopping".to_string()),
            },
            Todo {
                id: "b".to_string(),
                text: "Walk dog".to_string(),
                completed: false,
                created_at: created,
                updated_at: created,
                category: None,
            },
        ]
    }

    #[test]
    fn test_export_envelope_shape() {
        let blob = export(&sample_todos(), None).unwrap();
        let value: Value = serde_json::from_str(&blob).unwrap();

        assert_eq!(value["version"], "1.0");
        assert!(value["exportedAt"].is_string());
        assert_eq!(value["todos"].as_array().unwrap().len(), 2);
        assert!(value.get("settings").is_none());
    }

    #[test]
    fn test_export_then_parse_preserves_todos() {
        let todos = sample_todos();
        let settings = Settings {
            theme: Theme::Dark,
            ..Settings::default()
        };

        let blob = export(&todos, Some(&settings)).unwrap();
        let snapshot = parse(&blob, ImportPolicy::DropInvalid).unwrap();

        assert_eq!(snapshot.todos, todos);
        assert_eq!(snapshot.settings, Some(settings));
        assert_eq!(snapshot.version.as_deref(), Some(SNAPSHOT_VERSION));
        assert!(snapshot.exported_at.is_some());
        assert_eq!(snapshot.dropped, 0);
    }

    #[test]
    fn test_serialization_failure_is_an_export_error() {
        let cause = serde_json::from_str::<Value>("{").unwrap_err();
        let err = export_error(cause);

        assert!(matches!(err, StoreError::Export(_)));
        assert!(err.to_string().starts_with("Failed to export todos"));
    }

    #[test]
    fn test_parse_rejects_structural_errors() {
        for blob in ["not json", "[]", r#"{"version":"1.0"}"#, r#"{"todos":{}}"#] {
            let err = parse(blob, ImportPolicy::DropInvalid).unwrap_err();
            assert!(matches!(err, StoreError::Import(_)), "accepted {}", blob);
        }
    }

    #[test]
    fn test_parse_drops_invalid_records() {
        let blob = json!({
            "todos": [
                {"id": "a", "text": "ok", "completed": false,
                 "createdAt": "2024-01-01T00:00:00.000Z", "updatedAt": "2024-01-01T00:00:00.000Z"},
                {"id": "b", "text": 42, "completed": false,
                 "createdAt": "2024-01-01T00:00:00.000Z", "updatedAt": "2024-01-01T00:00:00.000Z"},
                {"text": "no id", "completed": false,
                 "createdAt": "2024-01-01T00:00:00.000Z", "updatedAt": "2024-01-01T00:00:00.000Z"}
            ],
            "exportDate": "2024-02-01T00:00:00.000Z",
            "version": "1.0"
        })
        .to_string();

        let snapshot = parse(&blob, ImportPolicy::DropInvalid).unwrap();
        assert_eq!(snapshot.todos.len(), 1);
        assert_eq!(snapshot.todos[0].id, "a");
        assert_eq!(snapshot.dropped, 2);
        assert!(snapshot.exported_at.is_some());

        let err = parse(&blob, ImportPolicy::RejectAll).unwrap_err();
        assert!(matches!(err, StoreError::Import(_)));
    }

    #[test]
    fn test_parse_invalid_settings() {
        let blob = r#"{"todos": [], "settings": {"theme": "ocean"}}"#;

        let snapshot = parse(blob, ImportPolicy::DropInvalid).unwrap();
        assert_eq!(snapshot.settings, None);

        assert!(parse(blob, ImportPolicy::RejectAll).is_err());
    }

    #[test]
    fn test_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(file_name(date), "todo-backup-2024-03-07.json");
    }
}
