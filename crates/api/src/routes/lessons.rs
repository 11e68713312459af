//! Lesson listing, search and admin update endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use booking::LessonUpdate;
use serde::{Deserialize, Serialize};
use store::Datastore;

use super::AppState;
use crate::dto::LessonDto;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Serialize)]
pub struct LessonEnvelope {
    pub success: bool,
    pub data: LessonDto,
}

/// GET /lessons: every lesson as a bare array.
#[tracing::instrument(skip(state))]
pub async fn list<S: Datastore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<LessonDto>>, ApiError> {
    let lessons = state.lessons.list().await?;
    Ok(Json(lessons.into_iter().map(LessonDto::from).collect()))
}

/// GET /lessons/search?q=: lessons matching the query; empty `q` lists all.
#[tracing::instrument(skip(state))]
pub async fn search<S: Datastore>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<LessonDto>>, ApiError> {
    let lessons = state.lessons.search(params.q.as_deref()).await?;
    Ok(Json(lessons.into_iter().map(LessonDto::from).collect()))
}

/// GET /lessons/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Datastore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<LessonEnvelope>, ApiError> {
    let lesson = state.lessons.get(&id).await?;
    Ok(Json(LessonEnvelope {
        success: true,
        data: lesson.into(),
    }))
}

/// PUT|PATCH /lessons/{id}: partial update of the given fields.
#[tracing::instrument(skip(state, payload))]
pub async fn update<S: Datastore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    payload: Result<Json<LessonUpdate>, JsonRejection>,
) -> Result<Json<LessonEnvelope>, ApiError> {
    let Json(update) = payload?;
    let lesson = state.lessons.update(&id, update).await?;
    Ok(Json(LessonEnvelope {
        success: true,
        data: lesson.into(),
    }))
}
