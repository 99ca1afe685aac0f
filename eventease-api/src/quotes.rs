use axum::{
    extract::{Path, State},
    routing::post,
    Extension, Json, Router,
};
use eventease_core::{Caller, Decision, Inquiry};
use eventease_lifecycle::query::redact_for;
use eventease_lifecycle::QuoteSubmission;
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub decision: Decision,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/inquiries/{id}/quote", post(submit_quote))
        .route("/v1/inquiries/{id}/response", post(respond_to_quote))
}

/// POST /v1/inquiries/{id}/quote
/// Attach an organizer's quote; `expected_revision` guards against stale views
pub async fn submit_quote(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(inquiry_id): Path<Uuid>,
    Json(req): Json<QuoteSubmission>,
) -> Result<Json<Inquiry>, AppError> {
    let inquiry = state.engine.submit_quote(&caller, inquiry_id, req).await?;
    Ok(Json(redact_for(&caller, inquiry)))
}

/// POST /v1/inquiries/{id}/response
/// The owning client accepts or declines the quote
pub async fn respond_to_quote(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(inquiry_id): Path<Uuid>,
    Json(req): Json<RespondRequest>,
) -> Result<Json<Inquiry>, AppError> {
    let inquiry = state
        .engine
        .respond_to_quote(&caller, inquiry_id, req.decision)
        .await?;
    Ok(Json(redact_for(&caller, inquiry)))
}
