use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{BookAppointmentRequest, BookingError, ListAppointmentsQuery, UpdateStatusRequest};
use crate::services::BookingService;

#[derive(Debug, Deserialize)]
pub struct SlotScheduleQuery {
    pub date: Option<NaiveDate>,
}

fn map_booking_error(err: BookingError) -> AppError {
    match err {
        BookingError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        BookingError::SlotUnavailable => {
            AppError::Conflict("Slot is no longer available".to_string())
        }
        BookingError::InvalidStatusTransition { .. } => AppError::ValidationError(err.to_string()),
        BookingError::ValidationError(msg) => AppError::ValidationError(msg),
        BookingError::AuthorizationError(msg) => AppError::Auth(msg),
        BookingError::AvailabilityError(msg) => AppError::Database(msg),
        BookingError::DatabaseError(msg) => AppError::Database(msg),
    }
}

fn session_user_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Session user id is not a valid UUID".to_string()))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    // Bookings are always made by the session user as the patient.
    let patient_id = session_user_id(&user)?;

    let booking_service = BookingService::new(&state);

    let appointment = booking_service
        .book_appointment(patient_id, request, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Booking submitted"
    })))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ListAppointmentsQuery>,
) -> Result<Json<Value>, AppError> {
    let caller_id = session_user_id(&user)?;

    let booking_service = BookingService::new(&state);

    let appointments = booking_service
        .list_appointments(caller_id, query, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let caller_id = session_user_id(&user)?;

    let booking_service = BookingService::new(&state);

    let appointment = booking_service
        .get_appointment(appointment_id, caller_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({ "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn update_status(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let caller_id = session_user_id(&user)?;

    let booking_service = BookingService::new(&state);

    let appointment = booking_service
        .update_status(appointment_id, caller_id, request.status, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Status updated"
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let caller_id = session_user_id(&user)?;

    let booking_service = BookingService::new(&state);

    let appointment = booking_service
        .cancel_appointment(appointment_id, caller_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled"
    })))
}

#[axum::debug_handler]
pub async fn get_slot_schedule(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(therapist_id): Path<Uuid>,
    Query(query): Query<SlotScheduleQuery>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);

    let days = booking_service
        .get_slot_schedule(therapist_id, query.date, Some(auth.token()))
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "therapist_id": therapist_id,
        "days": days
    })))
}
