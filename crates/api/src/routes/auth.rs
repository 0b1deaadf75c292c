//! Authentication routes — admin credential login and API key rotation.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use herald_common::error::AppError;
use herald_dispatch::roster::RosterService;

use crate::middleware::auth::{AuthAdmin, encode_jwt};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/api-keys", post(rotate_api_key))
}

/// Request body for admin login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub api_key: String,
}

/// Response for successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub admin_id: Uuid,
    pub role: String,
}

/// Response for API key rotation.
#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub api_key: String,
}

/// POST /api/auth/login — Verify the admin's API key, return a JWT.
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let admin = RosterService::find_admin_by_email(&state.pool, &req.email)
        .await?
        .ok_or_else(|| AppError::Auth("Invalid credentials".to_string()))?;

    // Constant error message: don't reveal whether the email exists
    if admin.api_key.as_deref() != Some(req.api_key.as_str()) {
        return Err(AppError::Auth("Invalid credentials".to_string()));
    }

    let token = encode_jwt(
        admin.id,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    tracing::info!(
        admin_id = %admin.id,
        role = %admin.role,
        "Admin authenticated"
    );

    Ok(Json(LoginResponse {
        token,
        admin_id: admin.id,
        role: admin.role.to_string(),
    }))
}

/// POST /api/auth/api-keys — Rotate the authenticated admin's API key.
async fn rotate_api_key(
    State(state): State<AppState>,
    auth: AuthAdmin,
) -> Result<Json<ApiKeyResponse>, AppError> {
    let api_key = format!("hr_{}", Uuid::new_v4().to_string().replace('-', ""));

    sqlx::query("UPDATE admins SET api_key = $1 WHERE id = $2")
        .bind(&api_key)
        .bind(auth.admin.id)
        .execute(&state.pool)
        .await?;

    tracing::info!(
        admin_id = %auth.admin.id,
        "API key rotated"
    );

    Ok(Json(ApiKeyResponse { api_key }))
}
