use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::UserRole;
use shared_utils::jwt;

use crate::models::{GuardState, RouteDecision};

/// Ordered decision table for a guarded client path. First match wins:
///
/// 1. session still loading        -> wait
/// 2. no session                   -> redirect /login
/// 3. session but no profile yet   -> wait
/// 4. expert on a /patient path    -> redirect /therapist
/// 5. non-expert on a /therapist path -> redirect /patient
/// 6. role not in the allow list   -> redirect to the role's home
/// 7. otherwise                    -> allow
///
/// The area redirects (4 and 5) run before the allow-list check (6), so a
/// user in the wrong area of the app is always sent to their own home first.
pub fn decide(state: &GuardState, path: &str, allow: &[UserRole]) -> RouteDecision {
    match state {
        GuardState::Loading => RouteDecision::Wait,
        GuardState::Unauthenticated => RouteDecision::Redirect("/login".to_string()),
        GuardState::MissingProfile => RouteDecision::Wait,
        GuardState::Ready(role) => decide_for_role(*role, path, allow),
    }
}

fn decide_for_role(role: UserRole, path: &str, allow: &[UserRole]) -> RouteDecision {
    if role.is_expert() && path.starts_with("/patient") {
        return RouteDecision::Redirect("/therapist".to_string());
    }
    if !role.is_expert() && path.starts_with("/therapist") {
        return RouteDecision::Redirect("/patient".to_string());
    }
    if !allow.is_empty() && !allow.contains(&role) {
        return RouteDecision::Redirect(role.home_path().to_string());
    }
    RouteDecision::Allow
}

/// Parse a comma-separated allow list. Missing input or an all-whitespace
/// list means any role; an unknown role name is an error rather than a
/// silently widened gate.
pub fn parse_allow_list(allow: Option<&str>) -> Result<Vec<UserRole>, String> {
    let Some(allow) = allow else {
        return Ok(vec![]);
    };

    allow
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

pub struct GuardService {
    supabase: SupabaseClient,
}

impl GuardService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Resolve a raw bearer token into a guard state: token -> session ->
    /// profile role. A failed profile lookup resolves to `MissingProfile`
    /// (the profile is not known yet), not to an error.
    pub async fn resolve_state(&self, token: Option<&str>, jwt_secret: &str) -> GuardState {
        let Some(token) = token else {
            return GuardState::Unauthenticated;
        };

        let user = match jwt::validate_token(token, jwt_secret) {
            Ok(user) => user,
            Err(reason) => {
                debug!("Session token rejected: {}", reason);
                return GuardState::Unauthenticated;
            }
        };

        match self.fetch_role(&user.id, token).await {
            Ok(Some(role)) => GuardState::Ready(role),
            Ok(None) => GuardState::MissingProfile,
            Err(e) => {
                warn!("Profile lookup failed for {}: {}", user.id, e);
                GuardState::MissingProfile
            }
        }
    }

    async fn fetch_role(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> anyhow::Result<Option<UserRole>> {
        let path = format!("/rest/v1/profiles?id=eq.{}&select=role", user_id);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };

        let role: UserRole = serde_json::from_value(row["role"].clone())?;
        Ok(Some(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_session_waits() {
        assert_eq!(
            decide(&GuardState::Loading, "/patient", &[]),
            RouteDecision::Wait
        );
    }

    #[test]
    fn unauthenticated_redirects_to_login() {
        assert_eq!(
            decide(&GuardState::Unauthenticated, "/therapist/schedule", &[]),
            RouteDecision::Redirect("/login".to_string())
        );
    }

    #[test]
    fn missing_profile_waits() {
        assert_eq!(
            decide(&GuardState::MissingProfile, "/patient", &[]),
            RouteDecision::Wait
        );
    }

    #[test]
    fn expert_on_patient_path_goes_home_regardless_of_allow_list() {
        // The area redirect outranks the allow list: even an allow list
        // naming the therapist cannot keep them on a /patient path.
        let state = GuardState::Ready(UserRole::Therapist);
        assert_eq!(
            decide(&state, "/patient", &[UserRole::Therapist]),
            RouteDecision::Redirect("/therapist".to_string())
        );
        assert_eq!(
            decide(&state, "/patient/profile", &[]),
            RouteDecision::Redirect("/therapist".to_string())
        );
    }

    #[test]
    fn every_expert_role_is_redirected_off_patient_paths() {
        for role in UserRole::expert_roles() {
            assert_eq!(
                decide(&GuardState::Ready(role), "/patient/book", &[]),
                RouteDecision::Redirect("/therapist".to_string()),
                "{} should be redirected off /patient",
                role
            );
        }
    }

    #[test]
    fn patient_on_therapist_path_redirects_to_patient() {
        assert_eq!(
            decide(&GuardState::Ready(UserRole::Patient), "/therapist", &[]),
            RouteDecision::Redirect("/patient".to_string())
        );
    }

    #[test]
    fn disallowed_role_in_own_area_goes_home() {
        // A patient on a /patient path that only allows therapists fails the
        // allow-list check, not the area check.
        assert_eq!(
            decide(
                &GuardState::Ready(UserRole::Patient),
                "/patient/profile",
                &[UserRole::Therapist]
            ),
            RouteDecision::Redirect("/patient".to_string())
        );
    }

    #[test]
    fn allowed_role_renders_the_view() {
        assert_eq!(
            decide(
                &GuardState::Ready(UserRole::Therapist),
                "/therapist/schedule",
                &[UserRole::Therapist]
            ),
            RouteDecision::Allow
        );
    }

    #[test]
    fn empty_allow_list_admits_any_role_in_its_area() {
        assert_eq!(
            decide(&GuardState::Ready(UserRole::DatingCoach), "/therapist", &[]),
            RouteDecision::Allow
        );
        assert_eq!(
            decide(&GuardState::Ready(UserRole::Patient), "/patient", &[]),
            RouteDecision::Allow
        );
    }

    #[test]
    fn allow_list_parses_names_and_trims_whitespace() {
        let allow = parse_allow_list(Some(" therapist , dating_coach ")).unwrap();
        assert_eq!(allow, vec![UserRole::Therapist, UserRole::DatingCoach]);
    }

    #[test]
    fn missing_or_blank_allow_list_is_empty() {
        assert!(parse_allow_list(None).unwrap().is_empty());
        assert!(parse_allow_list(Some("  ")).unwrap().is_empty());
    }

    #[test]
    fn unknown_allow_entry_is_an_error() {
        let err = parse_allow_list(Some("patient,admin")).unwrap_err();
        assert!(err.contains("admin"));
    }
}
