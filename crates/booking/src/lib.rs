//! Booking layer for the lesson booking backend.
//!
//! This crate provides:
//! - the order validator, a pure check of a raw booking request
//! - the capacity reservation engine, the only place seat counts change
//! - order cancellation, which restores seats exactly once
//! - read-side services for listing/searching lessons and listing orders

pub mod catalog;
pub mod error;
pub mod lessons;
pub mod orders;
pub mod reservation;
pub mod validation;

pub use error::BookingError;
pub use lessons::{LessonService, LessonUpdate};
pub use orders::{OrderService, OrderWithLessons};
pub use reservation::ReservationEngine;
pub use validation::{BookingRequest, FieldError, FieldErrorKind, ValidatedBooking, validate};

/// Convenience type alias for booking results.
pub type Result<T> = std::result::Result<T, BookingError>;
