use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn profile_routes(state: Arc<AppConfig>) -> Router {
    // Every profile route requires an authenticated session.
    Router::new()
        .route(
            "/me",
            get(handlers::get_my_profile).patch(handlers::update_my_profile),
        )
        .route("/{user_id}", get(handlers::get_profile))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
