use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn therapist_routes(state: Arc<AppConfig>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/", get(handlers::list_experts))
        .route("/{therapist_id}/availability", get(handlers::get_availability))
        .route("/{therapist_id}/schedule", get(handlers::get_week_schedule));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/availability", put(handlers::set_availability))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
