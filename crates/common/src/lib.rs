//! Shared types for the lesson booking backend.

pub mod types;

pub use types::{IdParseError, LessonId, OrderId};
