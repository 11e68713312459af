use thiserror::Error;

use crate::LessonId;

/// Errors that can occur when interacting with the datastore.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The datastore could not be reached.
    #[error("Datastore unavailable: {0}")]
    Unavailable(String),

    /// A stored document violates the data model (e.g. a negative seat count).
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Adding seats back would push a lesson's counter past the column limit.
    #[error("Seat count overflow on lesson {0}")]
    SpaceOverflow(LessonId),
}

impl StoreError {
    /// Returns true if the failure is an infrastructure hiccup that the
    /// caller may retry (timeouts, dropped connections, unreachable store).
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            _ => false,
        }
    }
}

/// Result type for datastore operations.
pub type Result<T> = std::result::Result<T, StoreError>;
