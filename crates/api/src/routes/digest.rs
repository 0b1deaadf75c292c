//! Digest routes — manual trigger for the daily HR-question digest.

use axum::extract::{Query, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use herald_common::error::AppError;
use herald_digest::scheduler::DigestOutcome;

use crate::middleware::auth::AuthAdmin;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/digest/run", post(run_digest))
}

#[derive(Debug, Deserialize)]
pub struct RunQuery {
    /// Re-send even when today's digest was already sent.
    #[serde(default)]
    pub force: bool,
}

/// POST /api/digest/run?force= — Run today's digest now.
async fn run_digest(
    State(state): State<AppState>,
    auth: AuthAdmin,
    Query(query): Query<RunQuery>,
) -> Result<Json<DigestOutcome>, AppError> {
    let scheduler = state
        .digest
        .as_ref()
        .ok_or_else(|| AppError::Config("Digest mail is not configured".to_string()))?;

    tracing::info!(admin_id = %auth.admin.id, force = query.force, "Manual digest run requested");

    let outcome = scheduler.run_once(query.force).await?;
    Ok(Json(outcome))
}
