pub mod health;
pub mod webhook;

use axum::Router;

use crate::state::AppState;

/// Build the complete router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(webhook::router())
        .with_state(state)
}
