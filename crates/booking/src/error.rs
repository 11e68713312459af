//! Booking error types.

use common::IdParseError;
use store::{LessonId, OrderId, StoreError};
use thiserror::Error;

use crate::validation::FieldError;

/// Errors that can occur during booking operations.
#[derive(Debug, Error)]
pub enum BookingError {
    /// The request was malformed. Every offending field is listed.
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    /// A path or body id is not a well-formed datastore id.
    #[error("{0}")]
    InvalidId(#[from] IdParseError),

    /// A referenced lesson does not exist.
    #[error("Lesson not found with id {0}")]
    LessonNotFound(LessonId),

    /// A lesson has fewer seats than the request needs.
    #[error("Not enough space in lesson {topic}: requested {requested}, available {available}")]
    InsufficientCapacity {
        lesson_id: LessonId,
        topic: String,
        requested: u64,
        available: u32,
    },

    /// The order does not exist (or was already cancelled).
    #[error("Order not found with id {0}")]
    OrderNotFound(OrderId),

    /// A multi-step operation failed part-way and could not be undone.
    /// Operators must reconcile the listed lessons by hand.
    #[error("Inconsistent state after {operation}: {detail}")]
    Inconsistency {
        operation: &'static str,
        order_id: Option<OrderId>,
        lessons: Vec<LessonId>,
        detail: String,
    },

    /// Datastore failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl BookingError {
    /// Returns true if the caller may retry the request unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, BookingError::Store(e) if e.is_transient())
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::FieldErrorKind;

    #[test]
    fn validation_message_joins_field_messages() {
        let err = BookingError::Validation(vec![
            FieldError::new("name", FieldErrorKind::Format, "Name must contain only letters"),
            FieldError::new("numberOfSpace", FieldErrorKind::Range, "Too few"),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: Name must contain only letters; Too few"
        );
    }

    #[test]
    fn only_transient_store_errors_are_retryable() {
        assert!(BookingError::Store(StoreError::Unavailable("down".into())).is_transient());
        assert!(!BookingError::OrderNotFound(OrderId::new()).is_transient());
        assert!(
            !BookingError::Store(StoreError::InvalidDocument("bad".into())).is_transient()
        );
    }
}
