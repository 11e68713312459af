use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{LessonId, OrderId};

/// A persisted booking. Its existence means `number_of_space` seats were
/// taken from every lesson in `lesson_ids`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub name: String,
    pub phone_number: String,
    pub lesson_ids: Vec<LessonId>,
    /// Seats reserved against each referenced lesson.
    pub number_of_space: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for inserting an order. The store assigns the id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub name: String,
    pub phone_number: String,
    pub lesson_ids: Vec<LessonId>,
    pub number_of_space: u32,
}
