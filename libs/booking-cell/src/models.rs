use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use shared_models::UserRole;

/// A booked session between a patient and a therapist. Rows are created with
/// `status=pending` and only ever move through status transitions; nothing in
/// the booking flow hard-deletes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub therapist_id: Uuid,
    pub patient_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored spelling is `cancelled`; the single-l form is accepted on input
/// because older rows carry it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    #[serde(alias = "canceled")]
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    /// Pending and confirmed appointments block their slot; terminal
    /// statuses do not.
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A patient's booking submission. The slot is identified by calendar date
/// plus start time; the end is always one hour later.
#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub therapist_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListAppointmentsQuery {
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

/// Minimal profile row fetched during booking, enough for the expert-role
/// check and the notification text.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileSummary {
    pub id: Uuid,
    pub full_name: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    Booked,
}

/// One expanded slot with its booked/available classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotView {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: SlotStatus,
}

/// A day of classified slots for a therapist's bookable schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySlots {
    pub day: String,
    pub day_of_week: i32,
    pub date: NaiveDate,
    pub slots: Vec<SlotView>,
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Slot is no longer available")]
    SlotUnavailable,

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not authorized: {0}")]
    AuthorizationError(String),

    #[error("Availability error: {0}")]
    AvailabilityError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
