//! Lesson catalog: listing, search and admin updates.

use serde::{Deserialize, Serialize};
use store::{Datastore, Lesson, LessonId, LessonPatch, LessonSearch, MAX_SPACE, NewLesson};

use crate::validation::{FieldError, FieldErrorKind};
use crate::{BookingError, Result};

/// Partial lesson update as sent by a client.
///
/// Unknown fields are rejected so that a typo does not silently do nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LessonUpdate {
    pub topic: Option<String>,
    pub location: Option<String>,
    pub price: Option<f64>,
    pub space: Option<i64>,
    pub icon: Option<String>,
}

impl LessonUpdate {
    /// Checks the update against the lesson data model and converts it into
    /// a store patch.
    pub fn into_patch(self) -> Result<LessonPatch> {
        let mut errors = Vec::new();

        let topic = non_empty("topic", "Topic", self.topic, &mut errors);
        let location = non_empty("location", "Location", self.location, &mut errors);

        if let Some(price) = self.price
            && !(price.is_finite() && price >= 0.0)
        {
            errors.push(FieldError::new(
                "price",
                FieldErrorKind::Range,
                "Price cannot be negative",
            ));
        }

        let space = match self.space {
            None => None,
            Some(space) if space < 0 => {
                errors.push(FieldError::new(
                    "space",
                    FieldErrorKind::Range,
                    "Space cannot be negative",
                ));
                None
            }
            Some(space) => match u32::try_from(space).ok().filter(|s| *s <= MAX_SPACE) {
                Some(space) => Some(space),
                None => {
                    errors.push(FieldError::new(
                        "space",
                        FieldErrorKind::Range,
                        format!("Space must not exceed {MAX_SPACE}"),
                    ));
                    None
                }
            },
        };

        if !errors.is_empty() {
            return Err(BookingError::Validation(errors));
        }

        let patch = LessonPatch {
            topic,
            location,
            price: self.price,
            space,
            icon: self.icon,
        };
        if patch.is_empty() {
            return Err(BookingError::Validation(vec![FieldError::new(
                "body",
                FieldErrorKind::Required,
                "At least one field must be provided",
            )]));
        }
        Ok(patch)
    }
}

fn non_empty(
    field: &str,
    label: &str,
    value: Option<String>,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(FieldError::new(
            field,
            FieldErrorKind::Required,
            format!("{label} cannot be empty"),
        ));
        return None;
    }
    Some(trimmed.to_string())
}

/// Read-through access to lessons plus the admin update path.
#[derive(Clone)]
pub struct LessonService<S: Datastore> {
    store: S,
}

impl<S: Datastore> LessonService<S> {
    /// Creates a new lesson service.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Lists every lesson.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Lesson>> {
        Ok(self.store.list_lessons().await?)
    }

    /// Searches lessons by topic/location substring, or by exact price or
    /// space when the query is numeric. A missing or blank query lists all.
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, query: Option<&str>) -> Result<Vec<Lesson>> {
        let search = query.map(LessonSearch::parse).unwrap_or_else(LessonSearch::all);
        let lessons = self.store.search_lessons(&search).await?;
        tracing::debug!(matches = lessons.len(), "lesson search");
        Ok(lessons)
    }

    /// Loads one lesson.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Lesson> {
        let id = LessonId::parse(id)?;
        self.store
            .get_lesson(id)
            .await?
            .ok_or(BookingError::LessonNotFound(id))
    }

    /// Applies an admin update. Setting `space` here overrides the counter
    /// directly and bypasses the reservation engine.
    #[tracing::instrument(skip(self, update))]
    pub async fn update(&self, id: &str, update: LessonUpdate) -> Result<Lesson> {
        let id = LessonId::parse(id)?;
        let patch = update.into_patch()?;
        if let Some(space) = patch.space {
            tracing::info!(%id, space, "lesson space overridden by admin update");
        }
        self.store
            .update_lesson(id, patch)
            .await?
            .ok_or(BookingError::LessonNotFound(id))
    }

    /// Inserts the given lessons if the collection is empty. Returns how many
    /// were inserted.
    #[tracing::instrument(skip(self, lessons), fields(candidates = lessons.len()))]
    pub async fn seed_if_empty(&self, lessons: Vec<NewLesson>) -> Result<usize> {
        if self.store.count_lessons().await? > 0 {
            tracing::debug!("lessons already present; skipping seed");
            return Ok(0);
        }
        let count = lessons.len();
        for lesson in lessons {
            self.store.insert_lesson(lesson).await?;
        }
        tracing::info!(count, "seeded lessons");
        Ok(count)
    }
}
