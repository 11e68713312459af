//! Prometheus metrics endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use store::{Datastore, LessonStore};

/// State for the scrape endpoint: the recorder handle plus the store whose
/// seat counts are sampled on each scrape.
pub struct MetricsState<S: Datastore> {
    pub handle: PrometheusHandle,
    pub store: S,
}

/// GET /metrics: samples seat gauges, then returns Prometheus-formatted metrics.
pub async fn get<S: Datastore>(State(state): State<Arc<MetricsState<S>>>) -> impl IntoResponse {
    sample_gauges(&state.store).await;
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.handle.render(),
    )
}

async fn sample_gauges<S: Datastore>(store: &S) {
    match store.list_lessons().await {
        Ok(lessons) => {
            for lesson in lessons {
                metrics::gauge!(
                    "lesson_space_available",
                    "lesson_id" => lesson.id.to_string(),
                    "topic" => lesson.topic
                )
                .set(f64::from(lesson.space));
            }
        }
        Err(e) => tracing::warn!(error = %e, "could not sample lesson space"),
    }
}
