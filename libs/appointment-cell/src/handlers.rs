// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::actor::Actor;
use shared_models::error::AppError;

use crate::models::{
    AppointmentSearchQuery, AppointmentStatus, BookAppointmentRequest, BookingContext,
    RescheduleAppointmentRequest, TransitionRequest,
};
use crate::services::booking::AppointmentBookingService;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AppointmentQueryParams {
    pub vet_id: Option<Uuid>,
    pub room_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub pet_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl From<AppointmentQueryParams> for AppointmentSearchQuery {
    fn from(params: AppointmentQueryParams) -> Self {
        Self {
            vet_id: params.vet_id,
            room_id: params.room_id,
            owner_id: params.owner_id,
            pet_id: params.pet_id,
            status: params.status,
            from: params.from,
            to: params.to,
            limit: params.limit,
            offset: params.offset,
        }
    }
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

pub async fn book_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let context = BookingContext::direct(actor.is_privileged(), actor.id);
    let appointment = service.book_appointment(request, context).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "appointment": appointment,
            "message": "Appointment booked"
        })),
    ))
}

pub async fn get_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = service.get_appointment(appointment_id).await?;

    Ok(Json(json!({ "appointment": appointment })))
}

pub async fn list_appointments(
    State(service): State<Arc<AppointmentBookingService>>,
    Query(params): Query<AppointmentQueryParams>,
) -> Result<Json<Value>, AppError> {
    let appointments = service.list_appointments(params.into()).await?;

    Ok(Json(json!({
        "total": appointments.len(),
        "appointments": appointments
    })))
}

pub async fn reschedule_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = service
        .reschedule_appointment(appointment_id, request, actor.id)
        .await?;

    Ok(Json(json!({
        "appointment": appointment,
        "message": "Appointment rescheduled"
    })))
}

pub async fn transition_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = service
        .transition_appointment(appointment_id, request, actor.id)
        .await?;

    Ok(Json(json!({ "appointment": appointment })))
}

/// Next statuses reachable from the appointment's current status.
pub async fn get_allowed_transitions(
    State(service): State<Arc<AppointmentBookingService>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = service.get_appointment(appointment_id).await?;
    let allowed = service.allowed_transitions(appointment.status);

    Ok(Json(json!({
        "appointment_id": appointment_id,
        "status": appointment.status,
        "allowed_transitions": allowed
    })))
}
