use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::actor::Actor;
use shared_models::error::AppError;

use crate::models::{
    CancelDigitalRequest, ConfirmDigitalRequest, RejectDigitalRequest, SubmitDigitalRequest,
};
use crate::services::TriageService;

#[derive(Debug, Deserialize)]
pub struct AvailabilityOverride {
    pub vet_id: Option<Uuid>,
    pub room_id: Option<Uuid>,
}

pub async fn submit_request(
    State(service): State<Arc<TriageService>>,
    Json(request): Json<SubmitDigitalRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let request = service.submit(request).await?;

    Ok((StatusCode::CREATED, Json(json!({ "request": request }))))
}

pub async fn list_pending_requests(
    State(service): State<Arc<TriageService>>,
) -> Result<Json<Value>, AppError> {
    let requests = service.list_pending().await;

    Ok(Json(json!({
        "total": requests.len(),
        "requests": requests
    })))
}

pub async fn get_request(
    State(service): State<Arc<TriageService>>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let request = service.get_request(request_id).await?;

    Ok(Json(json!({ "request": request })))
}

pub async fn review_request(
    State(service): State<Arc<TriageService>>,
    Extension(actor): Extension<Actor>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let request = service.mark_in_review(request_id, reviewer(&actor)?).await?;

    Ok(Json(json!({ "request": request })))
}

pub async fn check_request_availability(
    State(service): State<Arc<TriageService>>,
    Path(request_id): Path<Uuid>,
    Query(overrides): Query<AvailabilityOverride>,
) -> Result<Json<Value>, AppError> {
    let result = service
        .check_availability(request_id, overrides.vet_id, overrides.room_id)
        .await?;

    Ok(Json(json!(result)))
}

pub async fn confirm_request(
    State(service): State<Arc<TriageService>>,
    Extension(actor): Extension<Actor>,
    Path(request_id): Path<Uuid>,
    Json(confirmation): Json<ConfirmDigitalRequest>,
) -> Result<Json<Value>, AppError> {
    let request = service.confirm(request_id, confirmation, actor.id).await?;

    Ok(Json(json!({
        "request": request,
        "appointment_id": request.linked_appointment_id
    })))
}

pub async fn reject_request(
    State(service): State<Arc<TriageService>>,
    Extension(actor): Extension<Actor>,
    Path(request_id): Path<Uuid>,
    Json(rejection): Json<RejectDigitalRequest>,
) -> Result<Json<Value>, AppError> {
    let request = service.reject(request_id, reviewer(&actor)?, rejection).await?;

    Ok(Json(json!({ "request": request })))
}

pub async fn cancel_request(
    State(service): State<Arc<TriageService>>,
    Extension(actor): Extension<Actor>,
    Path(request_id): Path<Uuid>,
    Json(cancellation): Json<CancelDigitalRequest>,
) -> Result<Json<Value>, AppError> {
    let request = service.cancel(request_id, cancellation, actor.id).await?;

    Ok(Json(json!({ "request": request })))
}

fn reviewer(actor: &Actor) -> Result<Uuid, AppError> {
    actor.id.ok_or_else(|| {
        AppError::ValidationError("Reviewing a request requires an x-actor-id".to_string())
    })
}
