// libs/booking-cell/src/services/conflict.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;
use therapist_cell::{slot_duration, SLOT_DURATION_MINUTES};

use crate::models::{Appointment, BookingError, SlotStatus, SlotView};

pub struct ConflictDetectionService {
    supabase: Arc<SupabaseClient>,
}

impl ConflictDetectionService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Fetch the blocking (pending or confirmed) appointments for a therapist
    /// whose start falls inside [from, to).
    pub async fn get_blocking_appointments(
        &self,
        therapist_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        auth_token: Option<&str>,
    ) -> Result<Vec<Appointment>, BookingError> {
        debug!(
            "Fetching blocking appointments for therapist {} from {} to {}",
            therapist_id, from, to
        );

        let from_encoded = urlencoding::encode(&from.to_rfc3339()).into_owned();
        let to_encoded = urlencoding::encode(&to.to_rfc3339()).into_owned();
        let path = format!(
            "/rest/v1/appointments?therapist_id=eq.{}&status=in.(pending,confirmed)&start_time=gte.{}&start_time=lt.{}&order=start_time.asc",
            therapist_id, from_encoded, to_encoded
        );

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        Ok(parse_appointment_rows(rows))
    }
}

/// Rows that fail to parse are dropped with a warning rather than failing
/// the whole schedule; one bad timestamp should not blank a therapist's
/// calendar.
pub fn parse_appointment_rows(rows: Vec<Value>) -> Vec<Appointment> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<Appointment>(row) {
            Ok(appointment) => Some(appointment),
            Err(e) => {
                warn!("Skipping malformed appointment row: {}", e);
                None
            }
        })
        .collect()
}

/// The subset of appointments starting on the given calendar date.
pub fn appointments_on_date(appointments: &[Appointment], date: NaiveDate) -> Vec<&Appointment> {
    appointments
        .iter()
        .filter(|apt| apt.start_time.date_naive() == date)
        .collect()
}

fn minutes_since_midnight(time: NaiveTime) -> i64 {
    time.hour() as i64 * 60 + time.minute() as i64
}

/// Whether the one-hour slot starting at `slot_start` overlaps any blocking
/// appointment on the same day. Intervals are compared as minutes since
/// midnight, inclusive start and exclusive end, covering three shapes:
/// the slot starts inside an appointment, the slot ends inside one, or the
/// slot fully contains one.
pub fn slot_is_booked(slot_start: NaiveTime, day_appointments: &[&Appointment]) -> bool {
    let slot_start_min = minutes_since_midnight(slot_start);
    let slot_end_min = slot_start_min + SLOT_DURATION_MINUTES;

    day_appointments.iter().any(|apt| {
        if !apt.status.is_blocking() {
            return false;
        }

        let apt_start = minutes_since_midnight(apt.start_time.time());
        let apt_end = minutes_since_midnight(apt.end_time.time());

        let starts_inside = slot_start_min >= apt_start && slot_start_min < apt_end;
        let ends_inside = slot_end_min > apt_start && slot_end_min <= apt_end;
        let contains = slot_start_min <= apt_start && slot_end_min >= apt_end;

        starts_inside || ends_inside || contains
    })
}

/// Classify each slot start against the day's appointments.
pub fn classify_slots(slot_starts: &[NaiveTime], day_appointments: &[&Appointment]) -> Vec<SlotView> {
    slot_starts
        .iter()
        .map(|&start| SlotView {
            start_time: start,
            end_time: start + slot_duration(),
            status: if slot_is_booked(start, day_appointments) {
                SlotStatus::Booked
            } else {
                SlotStatus::Available
            },
        })
        .collect()
}
