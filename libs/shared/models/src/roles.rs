use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Application role stored on the profile row. Set at registration and not
/// user-mutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Patient,
    Therapist,
    RelationshipExpert,
    FinancialExpert,
    DatingCoach,
    HealthWellnessCoach,
}

impl UserRole {
    /// Every non-patient role is a professional ("expert") role.
    pub fn is_expert(&self) -> bool {
        !matches!(self, UserRole::Patient)
    }

    /// The client area a role lands on after login.
    pub fn home_path(&self) -> &'static str {
        if self.is_expert() {
            "/therapist"
        } else {
            "/patient"
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Patient => "patient",
            UserRole::Therapist => "therapist",
            UserRole::RelationshipExpert => "relationship_expert",
            UserRole::FinancialExpert => "financial_expert",
            UserRole::DatingCoach => "dating_coach",
            UserRole::HealthWellnessCoach => "health_wellness_coach",
        }
    }

    pub fn expert_roles() -> [UserRole; 5] {
        [
            UserRole::Therapist,
            UserRole::RelationshipExpert,
            UserRole::FinancialExpert,
            UserRole::DatingCoach,
            UserRole::HealthWellnessCoach,
        ]
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(UserRole::Patient),
            "therapist" => Ok(UserRole::Therapist),
            "relationship_expert" => Ok(UserRole::RelationshipExpert),
            "financial_expert" => Ok(UserRole::FinancialExpert),
            "dating_coach" => Ok(UserRole::DatingCoach),
            "health_wellness_coach" => Ok(UserRole::HealthWellnessCoach),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}
