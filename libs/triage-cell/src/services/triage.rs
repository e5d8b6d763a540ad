use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use appointment_cell::models::{
    AppointmentError, AppointmentSource, BookAppointmentRequest, BookingContext,
};
use appointment_cell::services::{AppointmentBookingService, AppointmentLifecycleService};
use schedule_cell::models::{AvailabilityQuery, AvailabilityResult};
use schedule_cell::services::AvailabilityService;
use shared_config::AppConfig;
use shared_database::{InMemoryTable, KeyedLocks, LockSet, StoreError};

use crate::models::{
    CancelDigitalRequest, ConfirmDigitalRequest, DigitalRequest, RejectDigitalRequest,
    RequestStatus, SubmitDigitalRequest, TriageError,
};

/// Staff review pipeline for digital requests. Confirmation goes through the
/// same ledger booking a direct scheduler action uses.
pub struct TriageService {
    requests: InMemoryTable<Uuid, DigitalRequest>,
    booking: Arc<AppointmentBookingService>,
    availability: Arc<AvailabilityService>,
    locks: KeyedLocks<Uuid>,
    lifecycle: AppointmentLifecycleService,
    confirms_as_scheduler: bool,
}

impl TriageService {
    pub fn new(
        config: &AppConfig,
        booking: Arc<AppointmentBookingService>,
        availability: Arc<AvailabilityService>,
    ) -> Self {
        Self {
            requests: InMemoryTable::new("digital_requests"),
            booking,
            availability,
            locks: KeyedLocks::new(StdDuration::from_millis(config.booking_lock_timeout_ms)),
            lifecycle: AppointmentLifecycleService::new(),
            confirms_as_scheduler: config.triage_confirms_as_scheduler,
        }
    }

    pub async fn submit(&self, request: SubmitDigitalRequest) -> Result<DigitalRequest, TriageError> {
        debug!("Submitting digital request for pet {}", request.pet_id);

        // Requests are held to the same limits as the booking they become.
        self.lifecycle
            .validate_duration(request.estimated_duration_min)
            .map_err(intake_error)?;
        let notes = self
            .lifecycle
            .validate_notes(request.notes)
            .map_err(intake_error)?;

        let now = Utc::now();
        let digital_request = DigitalRequest {
            id: Uuid::new_v4(),
            requested_at: now,
            pet_id: request.pet_id,
            requester_id: request.requester_id,
            preferred_vet_id: request.preferred_vet_id,
            preferred_room_id: request.preferred_room_id,
            requested_start_at: request.requested_start_at,
            estimated_duration_min: request.estimated_duration_min,
            appointment_type: request.appointment_type,
            notes,
            status: RequestStatus::Pending,
            reviewed_by: None,
            rejection_reason: None,
            cancellation_reason: None,
            linked_appointment_id: None,
            updated_at: now,
        };

        self.requests
            .insert(digital_request.id, digital_request.clone())
            .await
            .map_err(|e| TriageError::Storage(e.to_string()))?;

        info!(
            target: "audit",
            request_id = %digital_request.id,
            requester_id = %digital_request.requester_id,
            "digital request submitted"
        );

        Ok(digital_request)
    }

    /// Pending and in-review requests, oldest first.
    pub async fn list_pending(&self) -> Vec<DigitalRequest> {
        let mut pending = self.requests.scan(|r| !r.status.is_terminal()).await;
        pending.sort_by(|a, b| {
            a.requested_at
                .cmp(&b.requested_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        pending
    }

    pub async fn get_request(&self, request_id: Uuid) -> Result<DigitalRequest, TriageError> {
        self.requests
            .get(&request_id)
            .await
            .ok_or(TriageError::NotFound(request_id))
    }

    pub async fn mark_in_review(
        &self,
        request_id: Uuid,
        reviewer_id: Uuid,
    ) -> Result<DigitalRequest, TriageError> {
        let _lock = self.lock(request_id).await?;

        let updated = self
            .update(request_id, |request| {
                request.status.ensure_can_move_to(RequestStatus::InReview)?;
                request.status = RequestStatus::InReview;
                request.reviewed_by = Some(reviewer_id);
                Ok(())
            })
            .await?;

        info!(
            target: "audit",
            request_id = %request_id,
            reviewer_id = %reviewer_id,
            to = %updated.status,
            "digital request taken into review"
        );

        Ok(updated)
    }

    /// Advisory check against the current schedule. Changes nothing; the
    /// booking made on confirmation is the authority.
    pub async fn check_availability(
        &self,
        request_id: Uuid,
        override_vet_id: Option<Uuid>,
        override_room_id: Option<Uuid>,
    ) -> Result<AvailabilityResult, TriageError> {
        let request = self.get_request(request_id).await?;

        let vet_id = override_vet_id.or(request.preferred_vet_id).ok_or_else(|| {
            TriageError::ValidationError(
                "No vet given and the request has no preferred vet".to_string(),
            )
        })?;

        let result = self
            .availability
            .is_available(&AvailabilityQuery {
                employee_id: vet_id,
                room_id: override_room_id.or(request.preferred_room_id),
                start_at: request.requested_start_at,
                duration_min: request.estimated_duration_min,
                exclude_appointment_id: None,
            })
            .await?;

        Ok(result)
    }

    /// Books the request on the ledger. On a booking failure the request stays
    /// in review and the ledger's error is returned as is.
    pub async fn confirm(
        &self,
        request_id: Uuid,
        confirmation: ConfirmDigitalRequest,
        actor_id: Option<Uuid>,
    ) -> Result<DigitalRequest, TriageError> {
        let _lock = self.lock(request_id).await?;

        let request = self.get_request(request_id).await?;
        request.status.ensure_can_move_to(RequestStatus::Confirmed)?;

        let booking_request = BookAppointmentRequest {
            pet_id: request.pet_id,
            owner_id: request.requester_id,
            vet_id: confirmation.vet_id,
            room_id: confirmation.room_id,
            appointment_type: request.appointment_type,
            start_at: confirmation.start_at,
            duration_min: confirmation.duration_min,
            notes: request.notes.clone(),
        };
        let context = BookingContext {
            privileged: self.confirms_as_scheduler,
            actor_id,
            source: AppointmentSource::DigitalRequest { request_id },
        };

        let appointment = match self.booking.book_appointment(booking_request, context).await {
            Ok(appointment) => appointment,
            Err(e) => {
                warn!("Confirmation of digital request {} failed: {}", request_id, e);
                return Err(TriageError::Booking(e));
            }
        };

        let appointment_id = appointment.id;
        let updated = self
            .update(request_id, |request| {
                request.status = RequestStatus::Confirmed;
                request.linked_appointment_id = Some(appointment_id);
                if request.reviewed_by.is_none() {
                    request.reviewed_by = actor_id;
                }
                Ok(())
            })
            .await?;

        info!(
            target: "audit",
            request_id = %request_id,
            appointment_id = %appointment_id,
            actor = ?actor_id,
            "digital request confirmed"
        );

        Ok(updated)
    }

    pub async fn reject(
        &self,
        request_id: Uuid,
        reviewer_id: Uuid,
        rejection: RejectDigitalRequest,
    ) -> Result<DigitalRequest, TriageError> {
        let reason = normalize(Some(rejection.reason)).ok_or_else(|| {
            TriageError::ValidationError("A reason is required to reject a request".to_string())
        })?;

        let _lock = self.lock(request_id).await?;

        let updated = self
            .update(request_id, |request| {
                request.status.ensure_can_move_to(RequestStatus::Rejected)?;
                request.status = RequestStatus::Rejected;
                request.rejection_reason = Some(reason.clone());
                request.reviewed_by = Some(reviewer_id);
                Ok(())
            })
            .await?;

        info!(
            target: "audit",
            request_id = %request_id,
            reviewer_id = %reviewer_id,
            reason = %reason,
            "digital request rejected"
        );

        Ok(updated)
    }

    pub async fn cancel(
        &self,
        request_id: Uuid,
        cancellation: CancelDigitalRequest,
        actor_id: Option<Uuid>,
    ) -> Result<DigitalRequest, TriageError> {
        let reason = normalize(cancellation.reason);
        let _lock = self.lock(request_id).await?;

        let updated = self
            .update(request_id, |request| {
                request.status.ensure_can_move_to(RequestStatus::Cancelled)?;
                request.status = RequestStatus::Cancelled;
                request.cancellation_reason = reason.clone();
                Ok(())
            })
            .await?;

        info!(
            target: "audit",
            request_id = %request_id,
            actor = ?actor_id,
            reason = ?reason,
            "digital request cancelled"
        );

        Ok(updated)
    }

    async fn update<F>(&self, request_id: Uuid, f: F) -> Result<DigitalRequest, TriageError>
    where
        F: FnOnce(&mut DigitalRequest) -> Result<(), TriageError>,
    {
        let now = Utc::now();
        self.requests
            .modify(&request_id, |request| -> Result<DigitalRequest, TriageError> {
                f(request)?;
                request.updated_at = now;
                Ok(request.clone())
            })
            .await
            .ok_or(TriageError::NotFound(request_id))?
            .map_err(|e| {
                warn!("Rejected change to digital request {}: {}", request_id, e);
                e
            })
    }

    async fn lock(&self, request_id: Uuid) -> Result<LockSet<Uuid>, TriageError> {
        self.locks.acquire([request_id]).await.map_err(|e| match e {
            StoreError::LockTimeout { .. } => TriageError::ResourceBusy(format!(
                "Digital request {} is being handled by someone else, please retry",
                request_id
            )),
            other => TriageError::Storage(other.to_string()),
        })
    }
}

fn intake_error(error: AppointmentError) -> TriageError {
    match error {
        AppointmentError::ValidationError(message) => TriageError::ValidationError(message),
        other => TriageError::Booking(other),
    }
}

fn normalize(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}
