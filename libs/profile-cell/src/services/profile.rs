use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{ProfileError, UpdateProfileRequest, UserProfile};

pub struct ProfileService {
    supabase: SupabaseClient,
}

impl ProfileService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_profile(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<UserProfile, ProfileError> {
        debug!("Fetching profile: {}", user_id);

        let path = format!("/rest/v1/profiles?id=eq.{}", user_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ProfileError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(ProfileError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| ProfileError::DatabaseError(format!("Failed to parse profile: {}", e)))
    }

    /// Patch the caller's own row. Only whitelisted fields are written; role
    /// and status never appear in the update payload.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
        auth_token: &str,
    ) -> Result<UserProfile, ProfileError> {
        debug!("Updating profile: {}", user_id);

        let mut update_data = serde_json::Map::new();

        if let Some(full_name) = request.full_name {
            let full_name = full_name.trim().to_string();
            if full_name.is_empty() {
                return Err(ProfileError::ValidationError(
                    "Full name cannot be empty".to_string(),
                ));
            }
            update_data.insert("full_name".to_string(), json!(full_name));
        }

        if let Some(avatar_path) = request.avatar_path {
            let avatar_url = self.avatar_public_url(&avatar_path)?;
            update_data.insert("avatar_url".to_string(), json!(avatar_url));
        }

        if update_data.is_empty() {
            return Err(ProfileError::ValidationError(
                "No profile fields to update".to_string(),
            ));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/profiles?id=eq.{}", user_id);
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(headers),
            )
            .await
            .map_err(|e| ProfileError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(ProfileError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| ProfileError::DatabaseError(format!("Failed to parse profile: {}", e)))
    }

    /// Public storage URL for an object in the `avatars` bucket.
    fn avatar_public_url(&self, avatar_path: &str) -> Result<String, ProfileError> {
        let trimmed = avatar_path.trim().trim_start_matches('/');
        if trimmed.is_empty() {
            return Err(ProfileError::ValidationError(
                "Avatar path cannot be empty".to_string(),
            ));
        }
        Ok(self.supabase.get_public_url(&format!("avatars/{}", trimmed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_utils::test_utils::TestConfig;

    fn service() -> ProfileService {
        ProfileService::new(&TestConfig::default().to_app_config())
    }

    #[test]
    fn avatar_urls_point_into_the_public_avatars_bucket() {
        let url = service().avatar_public_url("u1/pic.png").unwrap();
        assert_eq!(
            url,
            "http://localhost:54321/storage/v1/object/public/avatars/u1/pic.png"
        );
    }

    #[test]
    fn leading_slashes_do_not_double_up() {
        let url = service().avatar_public_url("/u1/pic.png").unwrap();
        assert!(!url.contains("avatars//"));
    }

    #[test]
    fn blank_avatar_path_is_rejected() {
        assert!(matches!(
            service().avatar_public_url("   "),
            Err(ProfileError::ValidationError(_))
        ));
    }
}
