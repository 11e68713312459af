//! Order placement, cancellation and listing endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use booking::BookingRequest;
use serde::Serialize;
use store::Datastore;

use super::AppState;
use crate::dto::OrderDto;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct OrderEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub data: OrderDto,
}

#[derive(Serialize)]
pub struct OrderListResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<OrderDto>,
}

/// POST /orders: validate, reserve seats and record the order.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: Datastore>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderEnvelope>), ApiError> {
    let Json(request) = payload?;
    let order = state.orders.place_order(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(OrderEnvelope {
            success: true,
            message: None,
            data: order.into(),
        }),
    ))
}

/// GET /orders: all orders, newest first, joined with their lessons.
#[tracing::instrument(skip(state))]
pub async fn list<S: Datastore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let data: Vec<OrderDto> = state
        .orders
        .list_orders()
        .await?
        .into_iter()
        .map(OrderDto::from)
        .collect();
    Ok(Json(OrderListResponse {
        success: true,
        count: data.len(),
        data,
    }))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Datastore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderEnvelope>, ApiError> {
    let order = state.orders.get_order(&id).await?;
    Ok(Json(OrderEnvelope {
        success: true,
        message: None,
        data: order.into(),
    }))
}

/// DELETE /orders/{id}: cancel the order and give its seats back.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: Datastore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderEnvelope>, ApiError> {
    let order = state.orders.cancel_order(&id).await?;
    Ok(Json(OrderEnvelope {
        success: true,
        message: Some("Order cancelled and seats restored"),
        data: order.into(),
    }))
}
