use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{ProfileError, UpdateProfileRequest};
use crate::services::ProfileService;

fn map_profile_error(err: ProfileError) -> AppError {
    match err {
        ProfileError::NotFound => AppError::NotFound("Profile not found".to_string()),
        ProfileError::ValidationError(msg) => AppError::ValidationError(msg),
        ProfileError::DatabaseError(msg) => AppError::Database(msg),
    }
}

fn session_user_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Session user id is not a valid UUID".to_string()))
}

#[axum::debug_handler]
pub async fn get_my_profile(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = session_user_id(&user)?;
    let service = ProfileService::new(&state);

    let profile = service
        .get_profile(user_id, auth.token())
        .await
        .map_err(map_profile_error)?;

    Ok(Json(json!({ "profile": profile })))
}

#[axum::debug_handler]
pub async fn update_my_profile(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = session_user_id(&user)?;
    let service = ProfileService::new(&state);

    let profile = service
        .update_profile(user_id, request, auth.token())
        .await
        .map_err(map_profile_error)?;

    Ok(Json(json!({
        "success": true,
        "profile": profile,
        "message": "Profile updated"
    })))
}

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = ProfileService::new(&state);

    let profile = service
        .get_profile(user_id, auth.token())
        .await
        .map_err(map_profile_error)?;

    Ok(Json(json!({ "profile": profile })))
}
