//! HTTP handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use crate::api::types::{GenerationResponse, HealthResponse, ResultsResponse, VideoResponse};
use crate::error::{AppError, Result};
use crate::studio::{AnimateImage, CreateImage, EditImage};
use crate::AppState;

/// Unwrap a JSON body, reporting malformed input as a validation error
fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

/// POST /api/generate-image
pub async fn generate_image(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<CreateImage>, JsonRejection>,
) -> Result<Json<GenerationResponse>> {
    let request = body(payload)?;
    let generation = state.studio.create_image(request).await?;

    Ok(Json(GenerationResponse::created(generation)))
}

/// POST /api/edit-image
pub async fn edit_image(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<EditImage>, JsonRejection>,
) -> Result<Json<GenerationResponse>> {
    let request = body(payload)?;
    let generation = state.studio.edit_image(request).await?;

    Ok(Json(GenerationResponse::edited(generation)))
}

/// POST /api/generate-video
pub async fn generate_video(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<AnimateImage>, JsonRejection>,
) -> Result<Json<VideoResponse>> {
    let request = body(payload)?;
    let animation = state.studio.animate_image(request).await?;

    Ok(Json(animation.into()))
}

/// GET /api/results
pub async fn list_results(State(state): State<Arc<AppState>>) -> Result<Json<ResultsResponse>> {
    let results = state.studio.list_results().await?;

    Ok(Json(ResultsResponse {
        results: results.into_iter().map(Into::into).collect(),
    }))
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
