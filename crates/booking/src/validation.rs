//! Order validator.
//!
//! Checks the shape of a booking request before anything touches the
//! datastore. Every rule runs independently and every violation is reported;
//! whether the lessons exist or have room is decided later, against live data.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use store::{LessonId, MAX_SPACE};

use crate::BookingError;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\s]+$").expect("valid name pattern"));

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("valid phone pattern"));

/// Largest seat count a single order may request per lesson.
pub const MAX_SEATS_PER_LESSON: i64 = MAX_SPACE as i64;

/// A booking request exactly as the client sent it.
///
/// Fields hold raw JSON so that a missing or wrong-typed field becomes a
/// validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub name: Option<Value>,
    pub phone_number: Option<Value>,
    pub lesson_ids: Option<Value>,
    pub number_of_space: Option<Value>,
}

/// Which rule a field violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    /// The field is missing or empty.
    Required,
    /// The field is present but does not match the expected format.
    Format,
    /// The field is a number outside the allowed range.
    Range,
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field name as it appears in the request body.
    pub field: String,
    pub kind: FieldErrorKind,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }
}

/// A booking request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedBooking {
    pub name: String,
    pub phone_number: String,
    /// Lessons to reserve against, in request order. Duplicates reserve once
    /// per occurrence.
    pub lesson_ids: Vec<LessonId>,
    /// Seats reserved against each lesson.
    pub seats: u32,
}

/// Validates a raw booking request, returning every violation found.
///
/// An empty result means the request may proceed to reservation.
pub fn validate(request: &BookingRequest) -> Vec<FieldError> {
    request.check().err().unwrap_or_default()
}

impl BookingRequest {
    /// Validates the request and converts it into its typed form.
    pub fn validated(&self) -> Result<ValidatedBooking, BookingError> {
        self.check().map_err(BookingError::Validation)
    }

    fn check(&self) -> Result<ValidatedBooking, Vec<FieldError>> {
        let mut errors = Vec::new();

        let name = check_name(self.name.as_ref(), &mut errors);
        let phone_number = check_phone(self.phone_number.as_ref(), &mut errors);
        let lesson_ids = check_lesson_ids(self.lesson_ids.as_ref(), &mut errors);
        let seats = check_seats(self.number_of_space.as_ref(), &mut errors);

        match (name, phone_number, lesson_ids, seats) {
            (Some(name), Some(phone_number), Some(lesson_ids), Some(seats))
                if errors.is_empty() =>
            {
                Ok(ValidatedBooking {
                    name,
                    phone_number,
                    lesson_ids,
                    seats,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Reads a text field, trimmed. A missing field reads as empty; any other
/// JSON type is a format error.
fn text<'a>(
    value: Option<&'a Value>,
    field: &str,
    label: &str,
    errors: &mut Vec<FieldError>,
) -> Option<&'a str> {
    match value {
        None => Some(""),
        Some(Value::String(text)) => Some(text.trim()),
        Some(_) => {
            errors.push(FieldError::new(
                field,
                FieldErrorKind::Format,
                format!("{label} must be a string"),
            ));
            None
        }
    }
}

fn check_name(name: Option<&Value>, errors: &mut Vec<FieldError>) -> Option<String> {
    let name = text(name, "name", "Name", errors)?;
    if name.is_empty() {
        errors.push(FieldError::new(
            "name",
            FieldErrorKind::Required,
            "Name is required",
        ));
        return None;
    }
    if !NAME_PATTERN.is_match(name) {
        errors.push(FieldError::new(
            "name",
            FieldErrorKind::Format,
            "Name must contain only letters and spaces",
        ));
        return None;
    }
    Some(name.to_string())
}

fn check_phone(phone: Option<&Value>, errors: &mut Vec<FieldError>) -> Option<String> {
    let phone = text(phone, "phoneNumber", "Phone number", errors)?;
    if phone.is_empty() {
        errors.push(FieldError::new(
            "phoneNumber",
            FieldErrorKind::Required,
            "Phone number is required",
        ));
        return None;
    }
    if !PHONE_PATTERN.is_match(phone) {
        errors.push(FieldError::new(
            "phoneNumber",
            FieldErrorKind::Format,
            "Phone number must contain only numbers",
        ));
        return None;
    }
    Some(phone.to_string())
}

fn check_lesson_ids(ids: Option<&Value>, errors: &mut Vec<FieldError>) -> Option<Vec<LessonId>> {
    let ids = match ids {
        Some(Value::Array(ids)) if !ids.is_empty() => ids,
        None | Some(Value::Array(_)) => {
            errors.push(FieldError::new(
                "lessonIds",
                FieldErrorKind::Required,
                "At least one lesson ID is required",
            ));
            return None;
        }
        Some(_) => {
            errors.push(FieldError::new(
                "lessonIds",
                FieldErrorKind::Format,
                "Lesson IDs must be an array",
            ));
            return None;
        }
    };

    let mut parsed = Vec::with_capacity(ids.len());
    let mut valid = true;
    for (index, raw) in ids.iter().enumerate() {
        let id = match raw {
            Value::String(raw) => {
                LessonId::parse(raw).map_err(|_| format!("Invalid lesson id '{raw}'"))
            }
            _ => Err("Lesson ID must be a string".to_string()),
        };
        match id {
            Ok(id) => parsed.push(id),
            Err(message) => {
                valid = false;
                errors.push(FieldError::new(
                    format!("lessonIds[{index}]"),
                    FieldErrorKind::Format,
                    message,
                ));
            }
        }
    }
    valid.then_some(parsed)
}

fn check_seats(seats: Option<&Value>, errors: &mut Vec<FieldError>) -> Option<u32> {
    let Some(seats) = seats else {
        errors.push(FieldError::new(
            "numberOfSpace",
            FieldErrorKind::Required,
            "Number of spaces is required",
        ));
        return None;
    };
    // Integers beyond i64 are still whole numbers, just out of range.
    let seats = match (seats.as_i64(), seats.as_u64()) {
        (Some(seats), _) => seats,
        (None, Some(_)) => i64::MAX,
        (None, None) => {
            errors.push(FieldError::new(
                "numberOfSpace",
                FieldErrorKind::Format,
                "Number of spaces must be a whole number",
            ));
            return None;
        }
    };
    if seats < 1 {
        errors.push(FieldError::new(
            "numberOfSpace",
            FieldErrorKind::Range,
            "Number of spaces must be at least 1",
        ));
        return None;
    }
    if seats > MAX_SEATS_PER_LESSON {
        errors.push(FieldError::new(
            "numberOfSpace",
            FieldErrorKind::Range,
            format!("Number of spaces must not exceed {MAX_SEATS_PER_LESSON}"),
        ));
        return None;
    }
    u32::try_from(seats).ok()
}
