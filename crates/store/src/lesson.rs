use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::LessonId;

/// Largest seat count a client may set on a lesson or request in one order.
/// Leaves headroom under the 32-bit column limit for seats handed back by
/// cancellations after an admin lowers the count.
pub const MAX_SPACE: u32 = 1_000_000;

/// A bookable lesson as persisted in the `lessons` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub topic: String,
    pub location: String,
    pub price: f64,
    /// Remaining bookable seats. Never negative.
    pub space: u32,
    /// Optional image file name served from the static images directory.
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for inserting a lesson. The store assigns the id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLesson {
    pub topic: String,
    pub location: String,
    pub price: f64,
    pub space: u32,
    pub icon: Option<String>,
}

impl NewLesson {
    /// Creates a lesson payload without an icon.
    pub fn new(
        topic: impl Into<String>,
        location: impl Into<String>,
        price: f64,
        space: u32,
    ) -> Self {
        Self {
            topic: topic.into(),
            location: location.into(),
            price,
            space,
            icon: None,
        }
    }

    /// Sets the icon file name.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// Partial update of a lesson. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LessonPatch {
    pub topic: Option<String>,
    pub location: Option<String>,
    pub price: Option<f64>,
    pub space: Option<u32>,
    pub icon: Option<String>,
}

impl LessonPatch {
    /// Returns true if the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        self.topic.is_none()
            && self.location.is_none()
            && self.price.is_none()
            && self.space.is_none()
            && self.icon.is_none()
    }

    /// Applies the patch to a lesson in place and bumps `updated_at`.
    pub fn apply_to(&self, lesson: &mut Lesson, now: DateTime<Utc>) {
        if let Some(ref topic) = self.topic {
            lesson.topic = topic.clone();
        }
        if let Some(ref location) = self.location {
            lesson.location = location.clone();
        }
        if let Some(price) = self.price {
            lesson.price = price;
        }
        if let Some(space) = self.space {
            lesson.space = space;
        }
        if let Some(ref icon) = self.icon {
            lesson.icon = Some(icon.clone());
        }
        lesson.updated_at = now;
    }
}
