//! Dispatch routes — send jobs, browse the audit trail, inspect inboxes.

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::identity::derive_subscriber_id;
use herald_common::types::{AdminRole, AuditRecord, Employee};
use herald_directory::visible_employees;
use herald_dispatch::audit::AuditSink;
use herald_dispatch::roster::RosterService;
use herald_dispatch::service::{
    EventParams, NotificationParams, OnboardingParams, SendOutcome, SurveyParams,
};
use herald_gateway::GatewayMessage;

use crate::middleware::auth::AuthAdmin;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/dispatch/notification", post(send_notification))
        .route("/api/dispatch/survey", post(send_survey))
        .route("/api/dispatch/event", post(send_event))
        .route("/api/dispatch/onboarding", post(send_onboarding))
        .route("/api/dispatch/records", get(list_records))
        .route("/api/dispatch/records/{id}", delete(delete_record))
        .route("/api/employees/{id}/messages", get(list_employee_messages))
}

/// POST /api/dispatch/notification — Send a notification to selected employees.
async fn send_notification(
    State(state): State<AppState>,
    auth: AuthAdmin,
    Json(params): Json<NotificationParams>,
) -> Result<Json<SendOutcome>, AppError> {
    let outcome = state
        .dispatch
        .send_notification(&state.pool, &auth.admin, params)
        .await?;
    Ok(Json(outcome))
}

/// POST /api/dispatch/survey — Send a survey (app channel).
async fn send_survey(
    State(state): State<AppState>,
    auth: AuthAdmin,
    Json(params): Json<SurveyParams>,
) -> Result<Json<SendOutcome>, AppError> {
    let outcome = state
        .dispatch
        .send_survey(&state.pool, &auth.admin, params)
        .await?;
    Ok(Json(outcome))
}

/// POST /api/dispatch/event — Send an event invitation, expanding recurrences.
async fn send_event(
    State(state): State<AppState>,
    auth: AuthAdmin,
    Json(params): Json<EventParams>,
) -> Result<Json<SendOutcome>, AppError> {
    let outcome = state
        .dispatch
        .send_event(&state.pool, &auth.admin, params)
        .await?;
    Ok(Json(outcome))
}

/// POST /api/dispatch/onboarding — Send onboarding credentials (SMS + email).
async fn send_onboarding(
    State(state): State<AppState>,
    auth: AuthAdmin,
    Json(params): Json<OnboardingParams>,
) -> Result<Json<SendOutcome>, AppError> {
    let outcome = state
        .dispatch
        .send_onboarding(&state.pool, &auth.admin, params)
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    /// Filter by message kind (notification, survey, event, onboarding).
    pub kind: Option<String>,
}

/// GET /api/dispatch/records — List audit records, newest first.
async fn list_records(
    State(state): State<AppState>,
    _auth: AuthAdmin,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<Vec<AuditRecord>>, AppError> {
    let records = AuditSink::list_records(&state.pool, query.kind.as_deref()).await?;
    Ok(Json(records))
}

/// DELETE /api/dispatch/records/{id} — Delete an audit record and its
/// gateway-side message.
async fn delete_record(
    State(state): State<AppState>,
    _auth: AuthAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let record = AuditSink::delete_record(&state.pool, state.gateway.as_ref(), id).await?;
    Ok(Json(serde_json::json!({
        "deleted": true,
        "id": record.id,
    })))
}

/// GET /api/employees/{id}/messages — Messages the gateway holds for one
/// employee. Scoped: a manager can only inspect employees they can see.
async fn list_employee_messages(
    State(state): State<AppState>,
    auth: AuthAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<GatewayMessage>>, AppError> {
    let employee: Employee = sqlx::query_as("SELECT * FROM employees WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", id)))?;

    if auth.admin.role != AdminRole::Root {
        let directory = RosterService::all_employees(&state.pool).await?;
        let visible = visible_employees(&auth.admin, &directory);
        if !visible.iter().any(|e| e.id == id) {
            return Err(AppError::NotAuthorized(format!(
                "Employee {} is outside your visible subtree",
                id
            )));
        }
    }

    let subscriber_id = derive_subscriber_id(&employee.first_name, &employee.last_name);
    let messages = state.gateway.list(&subscriber_id).await?;
    Ok(Json(messages))
}
