//! Wire representations of lessons and orders.
//!
//! Every handler maps through these types so each entity has exactly one
//! JSON shape.

use booking::OrderWithLessons;
use chrono::{DateTime, Utc};
use serde::Serialize;
use store::{Lesson, Order};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDto {
    pub id: String,
    pub topic: String,
    pub location: String,
    pub price: f64,
    pub space: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl From<Lesson> for LessonDto {
    fn from(lesson: Lesson) -> Self {
        Self {
            id: lesson.id.to_string(),
            topic: lesson.topic,
            location: lesson.location,
            price: lesson.price,
            space: lesson.space,
            icon: lesson.icon,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    pub id: String,
    pub name: String,
    pub phone_number: String,
    pub lesson_ids: Vec<String>,
    pub number_of_space: u32,
    /// Present only on reads that join the referenced lessons.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lessons: Option<Vec<LessonDto>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderDto {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_string(),
            name: order.name,
            phone_number: order.phone_number,
            lesson_ids: order.lesson_ids.iter().map(ToString::to_string).collect(),
            number_of_space: order.number_of_space,
            lessons: None,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

impl From<OrderWithLessons> for OrderDto {
    fn from(joined: OrderWithLessons) -> Self {
        Self {
            lessons: Some(joined.lessons.into_iter().map(LessonDto::from).collect()),
            ..Self::from(joined.order)
        }
    }
}
