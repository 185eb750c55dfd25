use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

/// All auth routes are public and self-validating; they inspect the bearer
/// token themselves instead of sitting behind the auth middleware.
pub fn auth_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/validate", post(handlers::validate_token))
        .route("/verify", get(handlers::verify_token))
        .route("/route-decision", get(handlers::route_decision))
        .with_state(state)
}
