use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::actor::Actor;
use shared_models::error::AppError;

use crate::models::{AvailabilityQuery, CreateScheduleEntryRequest, UpdateScheduleEntryRequest};
use crate::services::{AvailabilityService, ScheduleService};

pub struct ScheduleState {
    pub schedules: Arc<ScheduleService>,
    pub availability: Arc<AvailabilityService>,
}

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityParams {
    pub start_at: DateTime<Utc>,
    pub duration_min: i32,
    pub room_id: Option<Uuid>,
    pub exclude_appointment_id: Option<Uuid>,
}

// ==============================================================================
// SCHEDULE ENTRY HANDLERS
// ==============================================================================

pub async fn create_entry(
    State(state): State<Arc<ScheduleState>>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateScheduleEntryRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let entry = state.schedules.create_entry(request, actor.id).await?;

    Ok((StatusCode::CREATED, Json(json!({ "entry": entry }))))
}

pub async fn get_entry(
    State(state): State<Arc<ScheduleState>>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let entry = state.schedules.get_entry(entry_id).await?;

    Ok(Json(json!({ "entry": entry })))
}

pub async fn update_entry(
    State(state): State<Arc<ScheduleState>>,
    Extension(actor): Extension<Actor>,
    Path(entry_id): Path<Uuid>,
    Json(request): Json<UpdateScheduleEntryRequest>,
) -> Result<Json<Value>, AppError> {
    let entry = state.schedules.update_entry(entry_id, request, actor.id).await?;

    Ok(Json(json!({ "entry": entry })))
}

pub async fn delete_entry(
    State(state): State<Arc<ScheduleState>>,
    Extension(actor): Extension<Actor>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let entry = state.schedules.delete_entry(entry_id, actor.id).await?;

    Ok(Json(json!({
        "deleted": true,
        "entry_id": entry.id,
        "version": entry.version
    })))
}

pub async fn get_entry_history(
    State(state): State<Arc<ScheduleState>>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let revisions = state.schedules.entry_history(entry_id).await?;

    Ok(Json(json!({
        "entry_id": entry_id,
        "revisions": revisions,
        "total": revisions.len()
    })))
}

pub async fn list_employee_entries(
    State(state): State<Arc<ScheduleState>>,
    Path(employee_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let entries = state.schedules.entries_for_employee(employee_id).await;

    Ok(Json(json!({
        "employee_id": employee_id,
        "entries": entries,
        "total": entries.len()
    })))
}

// ==============================================================================
// RESOLUTION HANDLERS
// ==============================================================================

pub async fn get_effective_day(
    State(state): State<Arc<ScheduleState>>,
    Path(employee_id): Path<Uuid>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Value>, AppError> {
    let day = state.availability.effective_day(employee_id, query.date).await?;

    Ok(Json(json!(day)))
}

pub async fn get_effective_range(
    State(state): State<Arc<ScheduleState>>,
    Path(employee_id): Path<Uuid>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Value>, AppError> {
    let days = state
        .availability
        .effective_range(employee_id, query.from, query.to)
        .await?;

    Ok(Json(json!({
        "employee_id": employee_id,
        "from": query.from,
        "to": query.to,
        "days": days
    })))
}

pub async fn check_availability(
    State(state): State<Arc<ScheduleState>>,
    Path(employee_id): Path<Uuid>,
    Query(params): Query<AvailabilityParams>,
) -> Result<Json<Value>, AppError> {
    let query = AvailabilityQuery {
        employee_id,
        room_id: params.room_id,
        start_at: params.start_at,
        duration_min: params.duration_min,
        exclude_appointment_id: params.exclude_appointment_id,
    };

    let result = state.availability.is_available(&query).await?;

    Ok(Json(json!(result)))
}
