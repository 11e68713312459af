//! HTTP API server with observability for the lesson booking backend.
//!
//! Provides REST endpoints for the lesson catalog and for placing, listing
//! and cancelling orders, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod dto;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, header};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use store::Datastore;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use config::Config;
use routes::AppState;
use routes::metrics::MetricsState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Datastore>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
    config: &Config,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get::<S>))
        .with_state(Arc::new(MetricsState {
            handle: metrics_handle,
            store: state.store.clone(),
        }));

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/lessons", get(routes::lessons::list::<S>))
        .route("/lessons/search", get(routes::lessons::search::<S>))
        .route(
            "/lessons/{id}",
            get(routes::lessons::get::<S>)
                .put(routes::lessons::update::<S>)
                .patch(routes::lessons::update::<S>),
        )
        .route(
            "/orders",
            get(routes::orders::list::<S>).post(routes::orders::create::<S>),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S>).delete(routes::orders::cancel::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .nest_service("/images", ServeDir::new(&config.static_dir))
        .fallback(routes::not_found)
        .layer(cors_layer(&config.cors_allowed_origins))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over the given datastore.
pub fn create_state<S: Datastore>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store))
}

/// Allows the configured origins, or any origin when none are configured.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
