// libs/booking-cell/src/services/booking.rs
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use therapist_cell::models::AvailabilityWindow;
use therapist_cell::{
    build_week_schedule, day_of_week_label, expand_day, slot_duration, weekday_to_day_of_week,
    AvailabilityService, DaySchedule,
};

use crate::models::{
    Appointment, AppointmentStatus, BookAppointmentRequest, BookingError, DaySlots,
    ListAppointmentsQuery, ProfileSummary,
};
use crate::services::conflict::{appointments_on_date, classify_slots, ConflictDetectionService};
use crate::services::holds::{slot_holds, SlotHoldRegistry};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::notify::{NotificationRequest, NotificationService};

pub struct BookingService {
    supabase: Arc<SupabaseClient>,
    conflict_service: ConflictDetectionService,
    lifecycle_service: AppointmentLifecycleService,
    notification_service: NotificationService,
    availability_service: AvailabilityService,
    holds: &'static SlotHoldRegistry,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_holds(config, slot_holds())
    }

    /// Construct against a specific hold registry. Production code uses the
    /// process-wide registry; tests pass their own.
    pub fn with_holds(config: &AppConfig, holds: &'static SlotHoldRegistry) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self {
            conflict_service: ConflictDetectionService::new(Arc::clone(&supabase)),
            lifecycle_service: AppointmentLifecycleService::new(),
            notification_service: NotificationService::new(Arc::clone(&supabase)),
            availability_service: AvailabilityService::new(config),
            holds,
            supabase,
        }
    }

    /// Submit a booking for a one-hour slot.
    ///
    /// The hold on (therapist, start) blocks a second submission of the same
    /// slot from this process while the first is in flight, and is released
    /// on every exit path. Nothing guards the slot across processes: the
    /// availability check callers run beforehand is not atomic with this
    /// insert, so two callers can both land the same slot.
    pub async fn book_appointment(
        &self,
        patient_id: Uuid,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        info!(
            "Booking appointment for patient {} with therapist {}",
            patient_id, request.therapist_id
        );

        let start_time = request.date.and_time(request.start_time).and_utc();
        let end_time = start_time + slot_duration();

        if !self.holds.try_acquire(request.therapist_id, start_time) {
            warn!(
                "Slot already held for therapist {} at {}",
                request.therapist_id, start_time
            );
            return Err(BookingError::SlotUnavailable);
        }

        match self
            .submit_booking(patient_id, &request, start_time, end_time, auth_token)
            .await
        {
            Ok((appointment, therapist_name, patient_name)) => {
                self.notify_booking_parties(&appointment, &therapist_name, &patient_name, auth_token)
                    .await;
                self.holds.release(request.therapist_id, start_time);
                info!(
                    "Appointment {} booked for patient {}",
                    appointment.id, patient_id
                );
                Ok(appointment)
            }
            Err(e) => {
                // The held set goes back to exactly its pre-submission state.
                self.holds.release(request.therapist_id, start_time);
                Err(e)
            }
        }
    }

    /// Fetch an appointment the caller is a party to.
    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        caller_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let appointment = self.fetch_appointment(appointment_id, auth_token).await?;

        if appointment.patient_id != caller_id && appointment.therapist_id != caller_id {
            return Err(BookingError::AuthorizationError(
                "You are not a party to this appointment".to_string(),
            ));
        }

        Ok(appointment)
    }

    /// The caller's appointments, as patient or as therapist, newest first.
    pub async fn list_appointments(
        &self,
        caller_id: Uuid,
        query: ListAppointmentsQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, BookingError> {
        debug!("Listing appointments for user {}", caller_id);

        let mut query_parts = vec![format!(
            "or=(patient_id.eq.{},therapist_id.eq.{})",
            caller_id, caller_id
        )];

        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(from_date) = query.from_date {
            let encoded = urlencoding::encode(&from_date.to_rfc3339()).into_owned();
            query_parts.push(format!("start_time=gte.{}", encoded));
        }
        if let Some(to_date) = query.to_date {
            let encoded = urlencoding::encode(&to_date.to_rfc3339()).into_owned();
            query_parts.push(format!("start_time=lte.{}", encoded));
        }

        let mut path = format!(
            "/rest/v1/appointments?{}&order=start_time.desc",
            query_parts.join("&")
        );
        if let Some(limit) = query.limit {
            path.push_str(&format!("&limit={}", limit));
        }
        if let Some(offset) = query.offset {
            path.push_str(&format!("&offset={}", offset));
        }

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        Ok(crate::services::conflict::parse_appointment_rows(rows))
    }

    /// Move an appointment to a new status. Only the therapist side may do
    /// this; patients go through cancellation.
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        caller_id: Uuid,
        new_status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let appointment = self.fetch_appointment(appointment_id, auth_token).await?;

        if appointment.therapist_id != caller_id {
            return Err(BookingError::AuthorizationError(
                "Only the therapist can change an appointment's status".to_string(),
            ));
        }

        self.lifecycle_service
            .validate_status_transition(&appointment.status, &new_status)?;

        self.patch_status(appointment_id, new_status, auth_token).await
    }

    /// Cancel an appointment. Either party may cancel their own; the row is
    /// kept with `status=cancelled`, never deleted.
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        caller_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let appointment = self.fetch_appointment(appointment_id, auth_token).await?;

        if appointment.patient_id != caller_id && appointment.therapist_id != caller_id {
            return Err(BookingError::AuthorizationError(
                "You are not a party to this appointment".to_string(),
            ));
        }

        self.lifecycle_service
            .validate_status_transition(&appointment.status, &AppointmentStatus::Cancelled)?;

        let cancelled = self
            .patch_status(appointment_id, AppointmentStatus::Cancelled, auth_token)
            .await?;

        info!("Appointment {} cancelled by {}", appointment_id, caller_id);
        Ok(cancelled)
    }

    /// The bookable schedule for a therapist: expanded one-hour slots per
    /// weekday, each classified booked or available against that day's
    /// pending and confirmed appointments. With no `date` the next
    /// occurrence of each configured weekday is used; with one, just that
    /// calendar day.
    pub async fn get_slot_schedule(
        &self,
        therapist_id: Uuid,
        date: Option<NaiveDate>,
        auth_token: Option<&str>,
    ) -> Result<Vec<DaySlots>, BookingError> {
        let windows = self
            .availability_service
            .get_availability(therapist_id, auth_token)
            .await
            .map_err(|e| BookingError::AvailabilityError(e.to_string()))?;

        let (schedule, from_date, to_date) = match date {
            Some(target) => (
                single_day_schedule(&windows, target),
                target,
                target + Duration::days(1),
            ),
            None => {
                let today = Utc::now().date_naive();
                (
                    build_week_schedule(&windows, today),
                    today,
                    today + Duration::days(8),
                )
            }
        };

        if schedule.is_empty() {
            return Ok(vec![]);
        }

        let from = from_date.and_time(NaiveTime::MIN).and_utc();
        let to = to_date.and_time(NaiveTime::MIN).and_utc();
        let appointments = self
            .conflict_service
            .get_blocking_appointments(therapist_id, from, to, auth_token)
            .await?;

        Ok(schedule
            .into_iter()
            .map(|day| {
                let day_appointments = appointments_on_date(&appointments, day.date);
                DaySlots {
                    day: day.day,
                    day_of_week: day.day_of_week,
                    date: day.date,
                    slots: classify_slots(&day.slot_starts, &day_appointments),
                }
            })
            .collect())
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    /// The booking flow is deliberately serial: therapist profile, patient
    /// profile, then the insert, awaited one after another.
    async fn submit_booking(
        &self,
        patient_id: Uuid,
        request: &BookAppointmentRequest,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<(Appointment, String, String), BookingError> {
        let therapist = self.require_profile(request.therapist_id, auth_token).await?;
        if !therapist.role.is_expert() {
            return Err(BookingError::ValidationError(
                "Selected profile is not a bookable expert account".to_string(),
            ));
        }

        let patient = self.require_profile(patient_id, auth_token).await?;

        let appointment = self
            .insert_appointment(patient_id, request, start_time, end_time, auth_token)
            .await?;

        Ok((appointment, therapist.full_name, patient.full_name))
    }

    async fn require_profile(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<ProfileSummary, BookingError> {
        let path = format!("/rest/v1/profiles?id=eq.{}&select=id,full_name,role", user_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let Some(row) = result.into_iter().next() else {
            return Err(BookingError::ValidationError(format!(
                "Profile {} not found",
                user_id
            )));
        };

        serde_json::from_value(row)
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse profile: {}", e)))
    }

    async fn insert_appointment(
        &self,
        patient_id: Uuid,
        request: &BookAppointmentRequest,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let now = Utc::now();
        let appointment_data = json!({
            "therapist_id": request.therapist_id,
            "patient_id": patient_id,
            "title": request.title,
            "description": request.description,
            "start_time": start_time.to_rfc3339(),
            "end_time": end_time.to_rfc3339(),
            "status": AppointmentStatus::Pending.to_string(),
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(appointment_data),
                Some(headers),
            )
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(BookingError::DatabaseError(
                "Failed to create appointment".to_string(),
            ));
        }

        serde_json::from_value(result[0].clone()).map_err(|e| {
            BookingError::DatabaseError(format!("Failed to parse created appointment: {}", e))
        })
    }

    async fn fetch_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(BookingError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }

    async fn patch_status(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let update_data = json!({
            "status": new_status.to_string(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(update_data),
                Some(headers),
            )
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(BookingError::DatabaseError(
                "Failed to update appointment".to_string(),
            ));
        }

        serde_json::from_value(result[0].clone()).map_err(|e| {
            BookingError::DatabaseError(format!("Failed to parse updated appointment: {}", e))
        })
    }

    /// Both parties are told about the new booking. Delivery is best-effort;
    /// nothing here can fail the committed appointment.
    async fn notify_booking_parties(
        &self,
        appointment: &Appointment,
        therapist_name: &str,
        patient_name: &str,
        auth_token: &str,
    ) {
        let when = appointment.start_time.format("%Y-%m-%d %H:%M").to_string();

        self.notification_service
            .send(
                NotificationRequest {
                    user_id: appointment.therapist_id,
                    title: "New booking request".to_string(),
                    message: format!("{} requested a session on {} UTC", patient_name, when),
                },
                auth_token,
            )
            .await;

        self.notification_service
            .send(
                NotificationRequest {
                    user_id: appointment.patient_id,
                    title: "Booking received".to_string(),
                    message: format!(
                        "Your session with {} on {} UTC is pending confirmation",
                        therapist_name, when
                    ),
                },
                auth_token,
            )
            .await;
    }
}

/// Expanded slot starts for one specific calendar day.
fn single_day_schedule(windows: &[AvailabilityWindow], target: NaiveDate) -> Vec<DaySchedule> {
    let day_of_week = weekday_to_day_of_week(target.weekday());
    let day_windows: Vec<&AvailabilityWindow> = windows
        .iter()
        .filter(|w| w.day_of_week == day_of_week)
        .collect();

    let slot_starts = expand_day(&day_windows);
    if slot_starts.is_empty() {
        return vec![];
    }

    vec![DaySchedule {
        day: day_of_week_label(day_of_week).to_string(),
        day_of_week,
        date: target,
        slot_starts,
    }]
}
