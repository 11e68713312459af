//! HTTP route handlers and the state they share.

pub mod health;
pub mod lessons;
pub mod metrics;
pub mod orders;

use axum::Json;
use axum::http::{Method, StatusCode, Uri};
use booking::{LessonService, OrderService};
use serde_json::{Value, json};
use store::Datastore;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Datastore> {
    pub lessons: LessonService<S>,
    pub orders: OrderService<S>,
    pub store: S,
}

impl<S: Datastore> AppState<S> {
    /// Builds the services over one datastore handle.
    pub fn new(store: S) -> Self {
        Self {
            lessons: LessonService::new(store.clone()),
            orders: OrderService::new(store.clone()),
            store,
        }
    }
}

/// Fallback for unmatched routes.
pub async fn not_found(method: Method, uri: Uri) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": "Route not found",
            "path": uri.path(),
            "method": method.as_str(),
        })),
    )
}
