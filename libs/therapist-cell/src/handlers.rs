use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::UserRole;

use crate::models::{TherapistError, UpsertAvailabilityRequest};
use crate::services::{AvailabilityService, DirectoryService};

#[derive(Debug, Deserialize)]
pub struct DirectoryQuery {
    pub role: Option<UserRole>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

fn map_therapist_error(err: TherapistError) -> AppError {
    match err {
        TherapistError::NotFound => AppError::NotFound("Therapist not found".to_string()),
        TherapistError::ValidationError(msg) => AppError::ValidationError(msg),
        TherapistError::AuthorizationError(msg) => AppError::Auth(msg),
        TherapistError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn list_experts(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DirectoryQuery>,
) -> Result<Json<Value>, AppError> {
    let directory_service = DirectoryService::new(&state);

    let experts = directory_service
        .list_experts(query.role, query.limit, query.offset)
        .await
        .map_err(map_therapist_error)?;

    Ok(Json(json!({
        "therapists": experts,
        "total": experts.len()
    })))
}

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<AppConfig>>,
    Path(therapist_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(&state);

    let windows = availability_service
        .get_availability(therapist_id, None)
        .await
        .map_err(map_therapist_error)?;

    Ok(Json(json!({
        "therapist_id": therapist_id,
        "windows": windows
    })))
}

#[axum::debug_handler]
pub async fn get_week_schedule(
    State(state): State<Arc<AppConfig>>,
    Path(therapist_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(&state);

    let schedule = availability_service
        .get_week_schedule(therapist_id, None)
        .await
        .map_err(map_therapist_error)?;

    Ok(Json(json!({
        "therapist_id": therapist_id,
        "schedule": schedule
    })))
}

// ==============================================================================
// PROTECTED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn set_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpsertAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    // Availability belongs to the session user; there is no editing on behalf
    // of another therapist.
    let therapist_id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Session user id is not a valid UUID".to_string()))?;

    let availability_service = AvailabilityService::new(&state);

    let windows = availability_service
        .set_availability(therapist_id, request, token)
        .await
        .map_err(map_therapist_error)?;

    Ok(Json(json!({
        "success": true,
        "therapist_id": therapist_id,
        "windows": windows,
        "message": "Availability updated"
    })))
}
