// glasstodo - Todo list state management with pluggable key-value persistence

pub mod category;
pub mod collection;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod record;
pub mod settings;
pub mod snapshot;
pub mod sqlite;
pub mod storage;
pub mod store;

// Re-export main types for convenience
pub use category::CategoryStore;
pub use config::{DEFAULT_MAX_TEXT_LEN, EDIT_DIALOG_MAX_TEXT_LEN, ImportPolicy, StoreConfig};
pub use error::{Result, StoreError};
pub use filter::{SortOrder, TodoFilter, TodoQuery};
pub use models::{Category, FALLBACK_CATEGORY_ID, Stats, Todo};
pub use record::Record;
pub use settings::{Settings, SettingsStore, Theme};
pub use snapshot::Snapshot;
pub use sqlite::SqliteStorage;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::TodoStore;
