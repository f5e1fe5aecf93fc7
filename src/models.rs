// Data models for todos and categories

use crate::record::{Record, optional_str, required_id, required_str, required_timestamp};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TODOS_KEY: &str = "glassmorphism_todos";
pub const CATEGORIES_KEY: &str = "glassmorphism_categories";
pub const SETTINGS_KEY: &str = "glassmorphism_preferences";

/// Category that todos fall back to when theirs is absent or deleted
pub const FALLBACK_CATEGORY_ID: &str = "personal";

/// A single task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Todo {
    /// Category id this todo counts towards
    pub fn category_id(&self) -> &str {
        self.category.as_deref().unwrap_or(FALLBACK_CATEGORY_ID)
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = stamp_after(self.updated_at);
    }
}

impl Record for Todo {
    fn id(&self) -> &str {
        &self.id
    }

    fn storage_key() -> &'static str {
        TODOS_KEY
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        let obj = value.as_object().ok_or("todo is not an object")?;

        let id = required_id(obj)?;
        let text = required_str(obj, "text")?;
        if text.trim().is_empty() {
            return Err("empty text".to_string());
        }
        let completed = obj
            .get("completed")
            .and_then(Value::as_bool)
            .ok_or("missing boolean field completed")?;
        let created_at = required_timestamp(obj, "createdAt")?;
        let updated_at = required_timestamp(obj, "updatedAt")?;

        Ok(Todo {
            id,
            text: text.to_string(),
            completed,
            created_at,
            // Clock skew in old data must not break updatedAt >= createdAt
            updated_at: updated_at.max(created_at),
            category: optional_str(obj, "category"),
        })
    }
}

/// A user-defined grouping label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

pub const DEFAULT_CATEGORY_COLOR: &str = "bg-gradient-to-r from-gray-500 to-slate-500";

impl Record for Category {
    fn id(&self) -> &str {
        &self.id
    }

    fn storage_key() -> &'static str {
        CATEGORIES_KEY
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        let obj = value.as_object().ok_or("category is not an object")?;

        let id = required_id(obj)?;
        let name = required_str(obj, "name")?;
        if name.trim().is_empty() {
            return Err("empty name".to_string());
        }
        // Built-in categories were stored without a creation time
        let created_at = match obj.get("createdAt") {
            None => now(),
            Some(_) => required_timestamp(obj, "createdAt")?,
        };

        Ok(Category {
            id,
            name: name.to_string(),
            description: optional_str(obj, "description"),
            color: optional_str(obj, "color").unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
            created_at,
        })
    }

    fn fills_missing_fields(value: &Value) -> bool {
        value.get("createdAt").is_none()
    }
}

/// The categories seeded into an empty store
pub fn default_categories() -> Vec<Category> {
    const BUILTIN: [(&str, &str, &str, &str); 8] = [
        (
            "personal",
            "Personal",
            "bg-gradient-to-r from-purple-500 to-pink-500",
            "Personal tasks and activities",
        ),
        (
            "work",
            "Work",
            "bg-gradient-to-r from-blue-500 to-cyan-500",
            "Professional and work-related tasks",
        ),
        (
            "shopping",
            "Shopping",
            "bg-gradient-to-r from-green-500 to-emerald-500",
            "Shopping lists and purchases",
        ),
        (
            "health",
            "Health",
            "bg-gradient-to-r from-red-500 to-orange-500",
            "Health and fitness related tasks",
        ),
        (
            "education",
            "Education",
            "bg-gradient-to-r from-indigo-500 to-purple-500",
            "Learning and educational activities",
        ),
        (
            "finance",
            "Finance",
            "bg-gradient-to-r from-yellow-500 to-orange-500",
            "Financial planning and money management",
        ),
        (
            "home",
            "Home",
            "bg-gradient-to-r from-teal-500 to-green-500",
            "Household chores and home maintenance",
        ),
        (
            "travel",
            "Travel",
            "bg-gradient-to-r from-sky-500 to-blue-500",
            "Travel planning and trip organization",
        ),
    ];

    let created_at = now();
    BUILTIN
        .iter()
        .map(|(id, name, color, description)| Category {
            id: id.to_string(),
            name: name.to_string(),
            description: Some(description.to_string()),
            color: color.to_string(),
            created_at,
        })
        .collect()
}

/// Aggregate counts over a todo list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub completion_rate_percent: u32,
}

impl Stats {
    pub fn from_todos(todos: &[Todo]) -> Self {
        let total = todos.len();
        let completed = todos.iter().filter(|t| t.completed).count();
        let completion_rate_percent = if total == 0 {
            0
        } else {
            (100.0 * completed as f64 / total as f64).round() as u32
        };

        Self {
            total,
            completed,
            pending: total - completed,
            completion_rate_percent,
        }
    }
}

/// Current time at the millisecond precision timestamps are stored with
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// A fresh timestamp strictly later than `previous`
pub fn stamp_after(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now();
    if now > previous {
        now
    } else {
        previous + Duration::milliseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn todo(id: &str, completed: bool) -> Todo {
        let ts = now();
        Todo {
            id: id.to_string(),
            text: format!("Todo {}", id),
            completed,
            created_at: ts,
            updated_at: ts,
            category: None,
        }
    }

    #[test]
    fn test_todo_serializes_camel_case() {
        let todo = todo("a", false);
        let json = serde_json::to_value(&todo).unwrap();

        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
        assert!(json.get("category").is_none());
    }

    #[test]
    fn test_todo_from_value_valid() {
        let value = json!({
            "id": "t1",
            "text": "Buy milk",
            "completed": true,
            "createdAt": "2024-01-01T08:00:00.000Z",
            "updatedAt": "2024-01-02T08:00:00.000Z",
            "category": "shopping"
        });

        let todo = Todo::from_value(&value).unwrap();
        assert_eq!(todo.id, "t1");
        assert_eq!(todo.text, "Buy milk");
        assert!(todo.completed);
        assert_eq!(todo.category_id(), "shopping");
    }

    #[test]
    fn test_todo_from_value_rejects_missing_fields() {
        let base = json!({
            "id": "t1",
            "text": "Buy milk",
            "completed": false,
            "createdAt": "2024-01-01T08:00:00.000Z",
            "updatedAt": "2024-01-01T08:00:00.000Z"
        });

        for field in ["id", "text", "completed", "createdAt", "updatedAt"] {
            let mut value = base.clone();
            value.as_object_mut().unwrap().remove(field);
            assert!(Todo::from_value(&value).is_err(), "accepted todo without {}", field);
        }

        let mut value = base.clone();
        value["completed"] = json!("yes");
        assert!(Todo::from_value(&value).is_err());
    }

    #[test]
    fn test_todo_from_value_repairs_updated_before_created() {
        let value = json!({
            "id": "t1",
            "text": "Skewed",
            "completed": false,
            "createdAt": "2024-01-02T08:00:00.000Z",
            "updatedAt": "2024-01-01T08:00:00.000Z"
        });

        let todo = Todo::from_value(&value).unwrap();
        assert_eq!(todo.updated_at, todo.created_at);
    }

    #[test]
    fn test_category_from_value_without_created_at() {
        let value = json!({"id": "work", "name": "Work", "color": "blue"});
        let category = Category::from_value(&value).unwrap();
        assert_eq!(category.name, "Work");
        assert_eq!(category.description, None);
        assert!(Category::fills_missing_fields(&value));

        let stamped = json!({"id": "work", "name": "Work", "createdAt": "2024-01-01T08:00:00.000Z"});
        assert!(!Category::fills_missing_fields(&stamped));

        assert!(Category::from_value(&json!({"id": "x", "name": "  "})).is_err());
    }

    #[test]
    fn test_default_categories_include_fallback() {
        let categories = default_categories();
        assert_eq!(categories.len(), 8);
        assert!(categories.iter().any(|c| c.id == FALLBACK_CATEGORY_ID));
    }

    #[test]
    fn test_stats_empty() {
        let stats = Stats::from_todos(&[]);
        assert_eq!(
            stats,
            Stats {
                total: 0,
                completed: 0,
                pending: 0,
                completion_rate_percent: 0
            }
        );
    }

    #[test]
    fn test_stats_rounding() {
        let todos = vec![todo("a", true), todo("b", false), todo("c", false), todo("d", false)];
        let stats = Stats::from_todos(&todos);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 3);
        assert_eq!(stats.completion_rate_percent, 25);

        let todos = vec![todo("a", true), todo("b", true), todo("c", false)];
        assert_eq!(Stats::from_todos(&todos).completion_rate_percent, 67);
    }

    #[test]
    fn test_stamp_after_is_strictly_later() {
        let far_future = now() + Duration::days(1);
        let stamped = stamp_after(far_future);
        assert_eq!(stamped, far_future + Duration::milliseconds(1));

        let past = now() - Duration::days(1);
        assert!(stamp_after(past) > past);
    }
}
