use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::UserRole;

use crate::models::{ExpertProfile, TherapistError};

pub struct DirectoryService {
    supabase: SupabaseClient,
}

impl DirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Active expert profiles, optionally narrowed to one role.
    pub async fn list_experts(
        &self,
        role: Option<UserRole>,
        limit: Option<i32>,
        offset: Option<i32>,
    ) -> Result<Vec<ExpertProfile>, TherapistError> {
        debug!("Listing experts (role filter: {:?})", role);

        let role_filter = match role {
            Some(role) if !role.is_expert() => {
                return Err(TherapistError::ValidationError(format!(
                    "{} is not an expert role",
                    role
                )));
            }
            Some(role) => format!("role=eq.{}", role),
            None => {
                let names: Vec<&str> = UserRole::expert_roles()
                    .iter()
                    .map(|r| r.as_str())
                    .collect();
                format!("role=in.({})", names.join(","))
            }
        };

        let mut path = format!(
            "/rest/v1/profiles?{}&status=eq.active&select=id,full_name,role,status,avatar_url&order=full_name.asc",
            role_filter
        );
        if let Some(limit) = limit {
            path.push_str(&format!("&limit={}", limit));
        }
        if let Some(offset) = offset {
            path.push_str(&format!("&offset={}", offset));
        }

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| TherapistError::DatabaseError(e.to_string()))?;

        let experts: Vec<ExpertProfile> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<ExpertProfile>, _>>()
            .map_err(|e| {
                TherapistError::DatabaseError(format!("Failed to parse profiles: {}", e))
            })?;

        Ok(experts)
    }

    /// One expert profile by id; non-expert profiles are not exposed here.
    pub async fn get_expert(&self, therapist_id: Uuid) -> Result<ExpertProfile, TherapistError> {
        let path = format!(
            "/rest/v1/profiles?id=eq.{}&select=id,full_name,role,status,avatar_url",
            therapist_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| TherapistError::DatabaseError(e.to_string()))?;

        let row = result.first().ok_or(TherapistError::NotFound)?;
        let expert: ExpertProfile = serde_json::from_value(row.clone())
            .map_err(|e| TherapistError::DatabaseError(format!("Failed to parse profile: {}", e)))?;

        if !expert.role.is_expert() {
            return Err(TherapistError::NotFound);
        }

        Ok(expert)
    }
}
