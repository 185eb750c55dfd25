// libs/profile-cell/tests/handlers_test.rs

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{authorization::Bearer, Authorization};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use profile_cell::handlers::*;
use profile_cell::models::*;
use shared_config::AppConfig;
use shared_models::{auth::User, error::AppError};
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn create_test_config() -> AppConfig {
    TestConfig::default().to_app_config()
}

fn mock_config(mock_server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: mock_server.uri(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
    }
}

fn create_test_user_extension(role: &str, id: &str) -> Extension<User> {
    Extension(User {
        id: id.to_string(),
        email: Some(format!("{}@example.com", role)),
        role: Some(role.to_string()),
        metadata: None,
        created_at: Some(Utc::now()),
    })
}

fn create_auth_header(token: &str) -> TypedHeader<Authorization<Bearer>> {
    let auth = Authorization::bearer(token).unwrap();
    TypedHeader(auth)
}

#[tokio::test]
async fn test_get_my_profile_returns_row() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let patient_user = TestUser::patient("patient@example.com");
    let token =
        JwtTestUtils::create_test_token(&patient_user, &config.supabase_jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", format!("eq.{}", patient_user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::profile_row(&patient_user.id, "Alex Chen", "patient")
        ])))
        .mount(&mock_server)
        .await;

    let result = get_my_profile(
        State(Arc::new(config)),
        create_auth_header(&token),
        create_test_user_extension("patient", &patient_user.id),
    )
    .await;

    assert!(result.is_ok(), "Expected profile fetch to succeed, but got error: {:?}", result.err());
    let response = result.unwrap().0;
    assert_eq!(response["profile"]["full_name"], "Alex Chen");
    assert_eq!(response["profile"]["role"], "patient");
}

#[tokio::test]
async fn test_get_my_profile_missing_row_is_not_found() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let patient_user = TestUser::patient("patient@example.com");
    let token =
        JwtTestUtils::create_test_token(&patient_user, &config.supabase_jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let result = get_my_profile(
        State(Arc::new(config)),
        create_auth_header(&token),
        create_test_user_extension("patient", &patient_user.id),
    )
    .await;

    assert!(result.is_err());
    match result.unwrap_err() {
        AppError::NotFound(msg) => assert!(msg.contains("Profile not found")),
        other => panic!("Expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_update_profile_changes_full_name() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let patient_user = TestUser::patient("patient@example.com");
    let token =
        JwtTestUtils::create_test_token(&patient_user, &config.supabase_jwt_secret, Some(24));

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", format!("eq.{}", patient_user.id)))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({ "full_name": "Alexandra Chen" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::profile_row(&patient_user.id, "Alexandra Chen", "patient")
        ])))
        .mount(&mock_server)
        .await;

    let result = update_my_profile(
        State(Arc::new(config)),
        create_auth_header(&token),
        create_test_user_extension("patient", &patient_user.id),
        Json(UpdateProfileRequest {
            full_name: Some("Alexandra Chen".to_string()),
            avatar_path: None,
        }),
    )
    .await;

    assert!(result.is_ok(), "Expected update to succeed, but got error: {:?}", result.err());
    let response = result.unwrap().0;
    assert_eq!(response["success"], true);
    assert_eq!(response["profile"]["full_name"], "Alexandra Chen");
    assert_eq!(response["message"], "Profile updated");
}

#[tokio::test]
async fn test_update_profile_rejects_blank_name() {
    let config = Arc::new(create_test_config());
    let patient_user = TestUser::patient("patient@example.com");
    let token =
        JwtTestUtils::create_test_token(&patient_user, &config.supabase_jwt_secret, Some(24));

    let result = update_my_profile(
        State(config),
        create_auth_header(&token),
        create_test_user_extension("patient", &patient_user.id),
        Json(UpdateProfileRequest {
            full_name: Some("   ".to_string()),
            avatar_path: None,
        }),
    )
    .await;

    assert!(result.is_err());
    match result.unwrap_err() {
        AppError::ValidationError(msg) => assert!(msg.contains("cannot be empty")),
        other => panic!("Expected ValidationError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_update_profile_rejects_empty_update() {
    let config = Arc::new(create_test_config());
    let patient_user = TestUser::patient("patient@example.com");
    let token =
        JwtTestUtils::create_test_token(&patient_user, &config.supabase_jwt_secret, Some(24));

    let result = update_my_profile(
        State(config),
        create_auth_header(&token),
        create_test_user_extension("patient", &patient_user.id),
        Json(UpdateProfileRequest {
            full_name: None,
            avatar_path: None,
        }),
    )
    .await;

    assert!(result.is_err());
    match result.unwrap_err() {
        AppError::ValidationError(msg) => assert!(msg.contains("No profile fields")),
        other => panic!("Expected ValidationError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_update_profile_resolves_avatar_path_to_public_url() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let patient_user = TestUser::patient("patient@example.com");
    let token =
        JwtTestUtils::create_test_token(&patient_user, &config.supabase_jwt_secret, Some(24));

    let expected_url = format!(
        "{}/storage/v1/object/public/avatars/{}/pic.png",
        mock_server.uri(),
        patient_user.id
    );

    let mut updated_row =
        MockSupabaseResponses::profile_row(&patient_user.id, "Alex Chen", "patient");
    updated_row["avatar_url"] = json!(expected_url);

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/profiles"))
        .and(body_partial_json(json!({ "avatar_url": expected_url })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([updated_row])))
        .mount(&mock_server)
        .await;

    let result = update_my_profile(
        State(Arc::new(config)),
        create_auth_header(&token),
        create_test_user_extension("patient", &patient_user.id),
        Json(UpdateProfileRequest {
            full_name: None,
            avatar_path: Some(format!("{}/pic.png", patient_user.id)),
        }),
    )
    .await;

    assert!(result.is_ok(), "Expected update to succeed, but got error: {:?}", result.err());
    let response = result.unwrap().0;
    assert_eq!(response["profile"]["avatar_url"], expected_url);
}

#[tokio::test]
async fn test_get_profile_by_id_returns_other_user() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let patient_user = TestUser::patient("patient@example.com");
    let token =
        JwtTestUtils::create_test_token(&patient_user, &config.supabase_jwt_secret, Some(24));

    let therapist_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", format!("eq.{}", therapist_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::profile_row(
                &therapist_id.to_string(),
                "Dana Rivers",
                "therapist"
            )
        ])))
        .mount(&mock_server)
        .await;

    let result = get_profile(
        State(Arc::new(config)),
        create_auth_header(&token),
        create_test_user_extension("patient", &patient_user.id),
        Path(therapist_id),
    )
    .await;

    assert!(result.is_ok(), "Expected profile fetch to succeed, but got error: {:?}", result.err());
    let response = result.unwrap().0;
    assert_eq!(response["profile"]["full_name"], "Dana Rivers");
    assert_eq!(response["profile"]["role"], "therapist");
}
