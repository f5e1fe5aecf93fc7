// Error taxonomy for the todo, category and settings stores

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the stores
///
/// Validation variants are returned to the caller of a mutation. Storage
/// variants are normally kept as a warning on the store (see `take_warning`)
/// rather than failing the operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Todo text cannot be empty")]
    EmptyText,

    #[error("Todo text is too long: {len} characters (max {max})")]
    TextTooLong { len: usize, max: usize },

    #[error("No record with id {0}")]
    NotFound(String),

    #[error("Category name cannot be empty")]
    EmptyName,

    #[error("Category {0} is the fallback category and cannot be removed")]
    ProtectedCategory(String),

    #[error("Invalid value for setting {name}: {reason}")]
    InvalidSetting { name: String, reason: String },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Malformed data under key {key}: {reason}")]
    MalformedStorageData { key: String, reason: String },

    #[error("Failed to import todos: {0}")]
    Import(String),

    #[error("Failed to export todos: {0}")]
    Export(String),
}
