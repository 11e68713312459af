//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use booking::{BookingError, FieldError};
use serde_json::{Value, json};

/// API-level error type that maps to HTTP responses.
///
/// Every variant renders as `{"success": false, "error", "code", "details"?}`.
/// Infrastructure failures are logged here in full and returned with a
/// generic message.
#[derive(Debug)]
pub enum ApiError {
    /// Request fields failed validation.
    Validation(Vec<FieldError>),
    /// A path or body id is not well-formed.
    InvalidId(String),
    /// Malformed request body or parameters.
    BadRequest(String),
    /// Resource not found.
    NotFound(String),
    /// Not enough seats on a lesson.
    InsufficientCapacity { message: String, details: Value },
    /// A partially applied operation could not be undone.
    Inconsistent { message: String, details: Value },
    /// The datastore is unreachable or timed out.
    Unavailable(String),
    /// Internal server error.
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::InvalidId(_)
            | ApiError::BadRequest(_)
            | ApiError::InsufficientCapacity { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Inconsistent { .. } | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::InvalidId(_) => "INVALID_ID",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InsufficientCapacity { .. } => "INSUFFICIENT_CAPACITY",
            ApiError::Inconsistent { .. } => "INCONSISTENT_STATE",
            ApiError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, details) = match self {
            ApiError::Validation(errors) => (
                "Validation failed".to_string(),
                Some(serde_json::to_value(errors).unwrap_or(Value::Null)),
            ),
            ApiError::InvalidId(msg) | ApiError::BadRequest(msg) | ApiError::NotFound(msg) => {
                (msg, None)
            }
            ApiError::InsufficientCapacity { message, details } => (message, Some(details)),
            ApiError::Inconsistent { message, details } => {
                tracing::error!(%message, %details, "inconsistent state requires reconciliation");
                (
                    "Operation left data in an inconsistent state and needs reconciliation"
                        .to_string(),
                    Some(details),
                )
            }
            ApiError::Unavailable(msg) => {
                tracing::warn!(error = %msg, "datastore unavailable");
                ("Service temporarily unavailable, please retry".to_string(), None)
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                ("Internal server error".to_string(), None)
            }
        };

        let mut body = json!({ "success": false, "error": message, "code": code });
        if let Some(details) = details {
            body["details"] = details;
        }
        (status, axum::Json(body)).into_response()
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        if err.is_transient() {
            return ApiError::Unavailable(err.to_string());
        }
        match err {
            BookingError::Validation(errors) => ApiError::Validation(errors),
            BookingError::InvalidId(e) => ApiError::InvalidId(e.to_string()),
            BookingError::LessonNotFound(_) | BookingError::OrderNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            BookingError::InsufficientCapacity {
                lesson_id,
                ref topic,
                requested,
                available,
            } => ApiError::InsufficientCapacity {
                message: format!("Not enough space in lesson {topic}"),
                details: json!({
                    "lessonId": lesson_id,
                    "topic": topic,
                    "requested": requested,
                    "available": available,
                }),
            },
            BookingError::Inconsistency {
                operation,
                order_id,
                ref lessons,
                ref detail,
            } => ApiError::Inconsistent {
                message: detail.clone(),
                details: json!({
                    "operation": operation,
                    "orderId": order_id,
                    "lessonIds": lessons,
                }),
            },
            BookingError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
