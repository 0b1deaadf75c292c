pub mod auth;
pub mod digest;
pub mod dispatch;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(dispatch::router())
        .merge(digest::router())
        .with_state(state)
}
