use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use eventease_core::{Caller, Inquiry, NewInquiry};
use eventease_lifecycle::query::redact_for;
use eventease_lifecycle::{InquirySummary, OrganizerTab};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub tab: OrganizerTab,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/inquiries", post(create_inquiry).get(list_inquiries))
        .route("/v1/inquiries/{id}", get(get_inquiry))
        .route("/v1/inquiries/{id}/cancel", post(cancel_inquiry))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/inquiries
/// Submit a new event inquiry (clients only)
pub async fn create_inquiry(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<NewInquiry>,
) -> Result<(StatusCode, Json<Inquiry>), AppError> {
    let inquiry = state.engine.create_inquiry(&caller, req).await?;
    Ok((StatusCode::CREATED, Json(inquiry)))
}

/// GET /v1/inquiries?tab=new|quoted|accepted|all
/// Everything the caller may see, newest first
pub async fn list_inquiries(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<InquirySummary>>, AppError> {
    let inquiries = state.queries.list_tab(&caller, query.tab).await?;
    let summaries = inquiries
        .into_iter()
        .map(|inquiry| state.queries.summarize(inquiry))
        .collect();
    Ok(Json(summaries))
}

/// GET /v1/inquiries/{id}
pub async fn get_inquiry(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(inquiry_id): Path<Uuid>,
) -> Result<Json<InquirySummary>, AppError> {
    let inquiry = state.queries.get_visible(&caller, inquiry_id).await?;
    Ok(Json(state.queries.summarize(inquiry)))
}

/// POST /v1/inquiries/{id}/cancel
/// Withdraw a new or quoted inquiry (owning client or admin)
pub async fn cancel_inquiry(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(inquiry_id): Path<Uuid>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<Inquiry>, AppError> {
    let inquiry = state.engine.cancel_inquiry(&caller, inquiry_id, req.reason).await?;
    Ok(Json(redact_for(&caller, inquiry)))
}
