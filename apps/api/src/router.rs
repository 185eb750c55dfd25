use std::sync::Arc;

use axum::{routing::get, Router};

use auth_cell::router::auth_routes;
use booking_cell::router::booking_routes;
use profile_cell::router::profile_routes;
use shared_config::AppConfig;
use therapist_cell::router::therapist_routes;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "MindHaven API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/therapists", therapist_routes(state.clone()))
        .nest("/profiles", profile_routes(state.clone()))
        .nest("/bookings", booking_routes(state))
}
