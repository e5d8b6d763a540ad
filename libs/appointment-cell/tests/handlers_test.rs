// libs/appointment-cell/tests/handlers_test.rs

mod common;

use assert_matches::assert_matches;
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use appointment_cell::handlers::*;
use appointment_cell::models::{AppointmentStatus, RescheduleAppointmentRequest, TransitionRequest};
use common::{request, Ledger};
use shared_models::actor::Actor;
use shared_models::error::AppError;
use shared_utils::test_utils::{utc, TestActor};

fn no_filters() -> AppointmentQueryParams {
    AppointmentQueryParams {
        vet_id: None,
        room_id: None,
        owner_id: None,
        pet_id: None,
        status: None,
        from: None,
        to: None,
        limit: None,
        offset: None,
    }
}

#[tokio::test]
async fn test_book_status_follows_actor_role() {
    let ledger = Ledger::new();
    let vet = ledger.monday_vet().await;

    let (status, Json(body)) = book_appointment(
        State(ledger.booking.clone()),
        Extension(TestActor::staff()),
        Json(request(vet, None, utc(2024, 6, 3, 9, 0), 30)),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["appointment"]["status"], "pending");
    assert_eq!(body["appointment"]["source"]["kind"], "direct");

    let (_, Json(body)) = book_appointment(
        State(ledger.booking.clone()),
        Extension(TestActor::scheduler()),
        Json(request(vet, None, utc(2024, 6, 3, 10, 0), 30)),
    )
    .await
    .unwrap();
    assert_eq!(body["appointment"]["status"], "confirmed");
}

#[tokio::test]
async fn test_conflict_maps_to_409_with_reasons() {
    let ledger = Ledger::new();
    let vet = ledger.monday_vet().await;

    let result = book_appointment(
        State(ledger.booking.clone()),
        Extension(Actor::anonymous()),
        Json(request(vet, None, utc(2024, 6, 4, 9, 0), 30)),
    )
    .await;

    let Err(error) = result else {
        panic!("expected a conflict");
    };
    assert_eq!(error.status_code(), StatusCode::CONFLICT);
    assert_matches!(
        &error,
        AppError::SchedulingConflict { conflicts, .. } if conflicts[0]["reason"] == "not_scheduled"
    );
}

#[tokio::test]
async fn test_get_list_and_transitions() {
    let ledger = Ledger::new();
    let vet = ledger.monday_vet().await;
    let (_, Json(body)) = book_appointment(
        State(ledger.booking.clone()),
        Extension(TestActor::staff()),
        Json(request(vet, None, utc(2024, 6, 3, 9, 0), 30)),
    )
    .await
    .unwrap();
    let id: Uuid = serde_json::from_value(body["appointment"]["id"].clone()).unwrap();

    let Json(body) = get_appointment(State(ledger.booking.clone()), Path(id)).await.unwrap();
    assert_eq!(body["appointment"]["vet_id"], vet.to_string());

    let Json(body) = list_appointments(
        State(ledger.booking.clone()),
        Query(AppointmentQueryParams {
            vet_id: Some(vet),
            ..no_filters()
        }),
    )
    .await
    .unwrap();
    assert_eq!(body["total"], 1);

    let Json(body) = get_allowed_transitions(State(ledger.booking.clone()), Path(id))
        .await
        .unwrap();
    assert_eq!(body["status"], "pending");
    assert_eq!(
        body["allowed_transitions"],
        serde_json::json!(["confirmed", "cancelled", "no_show"])
    );

    let Json(body) = transition_appointment(
        State(ledger.booking.clone()),
        Extension(TestActor::scheduler()),
        Path(id),
        Json(TransitionRequest {
            status: AppointmentStatus::Confirmed,
            reason: None,
        }),
    )
    .await
    .unwrap();
    assert_eq!(body["appointment"]["status"], "confirmed");
    assert_eq!(body["appointment"]["status_history"][1]["from"], "pending");

    let result = transition_appointment(
        State(ledger.booking.clone()),
        Extension(TestActor::scheduler()),
        Path(id),
        Json(TransitionRequest {
            status: AppointmentStatus::Completed,
            reason: None,
        }),
    )
    .await;
    assert_matches!(result, Err(AppError::InvalidTransition(_)));
}

#[tokio::test]
async fn test_reschedule_handler() {
    let ledger = Ledger::new();
    let vet = ledger.monday_vet().await;
    let (_, Json(body)) = book_appointment(
        State(ledger.booking.clone()),
        Extension(TestActor::staff()),
        Json(request(vet, None, utc(2024, 6, 3, 9, 0), 30)),
    )
    .await
    .unwrap();
    let id: Uuid = serde_json::from_value(body["appointment"]["id"].clone()).unwrap();

    let Json(body) = reschedule_appointment(
        State(ledger.booking.clone()),
        Extension(TestActor::scheduler()),
        Path(id),
        Json(RescheduleAppointmentRequest {
            new_start_at: utc(2024, 6, 3, 14, 0),
            new_duration_min: Some(45),
            reason: None,
        }),
    )
    .await
    .unwrap();
    assert_eq!(body["appointment"]["duration_min"], 45);
    assert_eq!(body["appointment"]["reschedule_history"][0]["previous_duration_min"], 30);

    let missing = get_appointment(State(ledger.booking.clone()), Path(Uuid::new_v4())).await;
    assert_matches!(missing, Err(AppError::NotFound(_)));
}
