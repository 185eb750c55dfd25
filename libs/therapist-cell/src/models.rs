use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::UserRole;

/// A recurring weekly availability window configured by a therapist.
/// One set of windows exists per (therapist, day_of_week); writes replace
/// the whole day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub id: Uuid,
    pub therapist_id: Uuid,
    pub day_of_week: i32, // 0 = Sunday, 1 = Monday, etc.
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One weekday of expanded one-hour slot starts, attached to the next
/// calendar date that weekday falls on. Derived data, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySchedule {
    pub day: String,
    pub day_of_week: i32,
    pub date: NaiveDate,
    pub slot_starts: Vec<NaiveTime>,
}

/// Expert profile as listed in the public directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertProfile {
    pub id: Uuid,
    pub full_name: String,
    pub role: UserRole,
    pub status: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowSpan {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct DayWindows {
    pub day_of_week: i32,
    pub windows: Vec<WindowSpan>,
}

/// Whole-day replacement write for the caller's own availability.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertAvailabilityRequest {
    pub days: Vec<DayWindows>,
}

#[derive(Error, Debug)]
pub enum TherapistError {
    #[error("Therapist not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not authorized: {0}")]
    AuthorizationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
