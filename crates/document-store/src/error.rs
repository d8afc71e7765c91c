use thiserror::Error;

use crate::{DocumentKey, Version};

/// Errors that can occur when interacting with the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write expected a different version than the one stored.
    ///
    /// `actual` is `None` when the document does not exist.
    #[error("Concurrency conflict for {key}: expected {expected}, found {}", display_actual(.actual))]
    ConcurrencyConflict {
        key: DocumentKey,
        expected: String,
        actual: Option<Version>,
    },

    /// The batch was rejected before touching storage.
    #[error("Invalid write batch: {0}")]
    InvalidBatch(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true if the error is a lost optimistic-concurrency race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::ConcurrencyConflict { .. })
    }
}

fn display_actual(actual: &Option<Version>) -> String {
    match actual {
        Some(version) => format!("version {version}"),
        None => "no document".to_string(),
    }
}

/// Result type for document store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
