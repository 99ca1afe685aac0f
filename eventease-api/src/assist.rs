use axum::{extract::State, routing::post, Extension, Json, Router};
use eventease_core::enhance::{enhance_or_original, EnhancementContext, EnhancementOutcome};
use eventease_core::Caller;
use serde::Deserialize;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct EnhanceRequest {
    pub text: String,
    #[serde(flatten)]
    pub context: EnhancementContext,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/assist/description", post(enhance_description))
}

/// POST /v1/assist/description
/// Polish an inquiry description before it is submitted. Never fails just
/// because the enhancer did; the original text comes back instead.
pub async fn enhance_description(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<EnhanceRequest>,
) -> Result<Json<EnhancementOutcome>, AppError> {
    let outcome = enhance_or_original(state.enhancer.as_ref(), &req.text, &req.context).await?;
    tracing::debug!(caller = %caller.id, enhanced = outcome.enhanced, "Description enhancement");
    Ok(Json(outcome))
}
