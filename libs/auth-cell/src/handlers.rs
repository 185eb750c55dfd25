use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::TokenResponse;
use shared_models::error::AppError;
use shared_utils::jwt;

use crate::models::{RouteDecision, RouteDecisionQuery};
use crate::services::guard::{decide, parse_allow_list, GuardService};

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(AppError::Auth(
            "Invalid authorization header format".to_string(),
        ));
    }

    Ok(auth_value[7..].to_string())
}

/// Validate a raw access token and echo back the session claims.
pub async fn validate_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = extract_bearer_token(&headers)?;

    match jwt::validate_token(&token, &config.supabase_jwt_secret) {
        Ok(user) => Ok(Json(TokenResponse {
            valid: true,
            user_id: user.id,
            email: user.email,
            role: user.role,
        })),
        Err(err) => Err(AppError::Auth(err)),
    }
}

/// Soft verification: a bad token is a `valid: false` body, not an error.
pub async fn verify_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    debug!("Verifying session");

    let token = extract_bearer_token(&headers)?;

    match jwt::validate_token(&token, &config.supabase_jwt_secret) {
        Ok(user) => Ok(Json(json!({ "valid": true, "user": user }))),
        Err(_) => Ok(Json(json!({ "valid": false }))),
    }
}

/// Resolve the caller's session and apply the route guard to the requested
/// path. Self-validating: no auth middleware, a missing or bad token simply
/// resolves to the unauthenticated state.
pub async fn route_decision(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<RouteDecisionQuery>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    if !query.path.starts_with('/') {
        return Err(AppError::ValidationError(
            "Path must start with '/'".to_string(),
        ));
    }

    let allow = parse_allow_list(query.allow.as_deref()).map_err(AppError::ValidationError)?;

    let token = extract_bearer_token(&headers).ok();
    let service = GuardService::new(&config);
    let state = service
        .resolve_state(token.as_deref(), &config.supabase_jwt_secret)
        .await;

    debug!("Route decision for {} resolved", query.path);

    Ok(Json(match decide(&state, &query.path, &allow) {
        RouteDecision::Allow => json!({ "action": "allow" }),
        RouteDecision::Wait => json!({ "action": "wait" }),
        RouteDecision::Redirect(location) => {
            json!({ "action": "redirect", "location": location })
        }
    }))
}
