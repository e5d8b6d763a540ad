// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use schedule_cell::models::AvailabilityQuery;
use schedule_cell::services::AvailabilityService;
use shared_config::AppConfig;
use shared_database::{KeyedLocks, LockSet, StoreError};

use crate::models::{
    Appointment, AppointmentError, AppointmentSearchQuery, AppointmentStatus,
    BookAppointmentRequest, BookingContext, RescheduleAppointmentRequest, SlotChange,
    StatusChange, TransitionRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::repository::AppointmentRepository;

/// Lock keys for booking-affecting operations. The derived order is the
/// acquisition order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKey {
    Appointment(Uuid),
    Vet(Uuid, NaiveDate),
    Room(Uuid, NaiveDate),
}

pub struct AppointmentBookingService {
    repository: Arc<AppointmentRepository>,
    availability: Arc<AvailabilityService>,
    lifecycle: AppointmentLifecycleService,
    locks: KeyedLocks<ResourceKey>,
}

impl AppointmentBookingService {
    pub fn new(
        config: &AppConfig,
        repository: Arc<AppointmentRepository>,
        availability: Arc<AvailabilityService>,
    ) -> Self {
        Self {
            repository,
            availability,
            lifecycle: AppointmentLifecycleService::new(),
            locks: KeyedLocks::new(StdDuration::from_millis(config.booking_lock_timeout_ms)),
        }
    }

    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
        context: BookingContext,
    ) -> Result<Appointment, AppointmentError> {
        debug!(
            "Booking vet {} (room {:?}) at {} for {} min",
            request.vet_id, request.room_id, request.start_at, request.duration_min
        );

        self.lifecycle.validate_duration(request.duration_min)?;
        let notes = self.lifecycle.validate_notes(request.notes)?;

        let end_at = window_end(request.start_at, request.duration_min)?;
        let keys = self.resource_keys(request.vet_id, request.room_id, request.start_at, end_at);
        let _locks = self.lock(keys).await?;

        let availability = self
            .availability
            .is_available(&AvailabilityQuery {
                employee_id: request.vet_id,
                room_id: request.room_id,
                start_at: request.start_at,
                duration_min: request.duration_min,
                exclude_appointment_id: None,
            })
            .await?;

        if !availability.available {
            warn!(
                "Booking for vet {} at {} rejected with {} conflict(s)",
                request.vet_id,
                request.start_at,
                availability.conflicts.len()
            );
            return Err(AppointmentError::SchedulingConflict(availability.conflicts));
        }

        let now = Utc::now();
        let status = if context.privileged {
            AppointmentStatus::Confirmed
        } else {
            AppointmentStatus::Pending
        };

        let appointment = Appointment {
            id: Uuid::new_v4(),
            pet_id: request.pet_id,
            owner_id: request.owner_id,
            vet_id: request.vet_id,
            room_id: request.room_id,
            appointment_type: request.appointment_type,
            start_at: request.start_at,
            duration_min: request.duration_min,
            status,
            notes,
            source: context.source,
            status_history: vec![StatusChange {
                from: None,
                to: status,
                reason: None,
                actor_id: context.actor_id,
                at: now,
            }],
            reschedule_history: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.repository.insert(appointment.clone()).await?;

        info!(
            target: "audit",
            appointment_id = %appointment.id,
            vet_id = %appointment.vet_id,
            room_id = ?appointment.room_id,
            start_at = %appointment.start_at,
            status = %appointment.status,
            actor = ?context.actor_id,
            "appointment booked"
        );

        Ok(appointment)
    }

    /// Move a Pending or Confirmed appointment. Its own slot is ignored by the
    /// availability check; the duration defaults to the current one.
    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
        actor_id: Option<Uuid>,
    ) -> Result<Appointment, AppointmentError> {
        let snapshot = self.repository.get(appointment_id).await?;
        self.lifecycle.can_reschedule(snapshot.status)?;

        let duration_min = request.new_duration_min.unwrap_or(snapshot.duration_min);
        self.lifecycle.validate_duration(duration_min)?;

        let new_end = window_end(request.new_start_at, duration_min)?;
        let mut keys = self.resource_keys(snapshot.vet_id, snapshot.room_id, request.new_start_at, new_end);
        keys.push(ResourceKey::Appointment(appointment_id));
        let _locks = self.lock(keys).await?;

        // Re-read under the lock; a concurrent transition may have won.
        let current = self.repository.get(appointment_id).await?;
        self.lifecycle.can_reschedule(current.status)?;

        let availability = self
            .availability
            .is_available(&AvailabilityQuery {
                employee_id: current.vet_id,
                room_id: current.room_id,
                start_at: request.new_start_at,
                duration_min,
                exclude_appointment_id: Some(appointment_id),
            })
            .await?;

        if !availability.available {
            warn!(
                "Reschedule of appointment {} to {} rejected with {} conflict(s)",
                appointment_id,
                request.new_start_at,
                availability.conflicts.len()
            );
            return Err(AppointmentError::SchedulingConflict(availability.conflicts));
        }

        let reason = request
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        let now = Utc::now();
        let new_start_at = request.new_start_at;

        let updated = self
            .repository
            .update(appointment_id, |appointment| {
                appointment.reschedule_history.push(SlotChange {
                    previous_start_at: appointment.start_at,
                    previous_duration_min: appointment.duration_min,
                    reason,
                    actor_id,
                    at: now,
                });
                appointment.start_at = new_start_at;
                appointment.duration_min = duration_min;
                appointment.updated_at = now;
                Ok(())
            })
            .await?;

        info!(
            target: "audit",
            appointment_id = %appointment_id,
            previous_start_at = %current.start_at,
            start_at = %updated.start_at,
            duration_min = updated.duration_min,
            actor = ?actor_id,
            "appointment rescheduled"
        );

        Ok(updated)
    }

    pub async fn transition_appointment(
        &self,
        appointment_id: Uuid,
        request: TransitionRequest,
        actor_id: Option<Uuid>,
    ) -> Result<Appointment, AppointmentError> {
        let snapshot = self.repository.get(appointment_id).await?;

        // Status changes never add occupancy; the resource keys only keep
        // transitions ordered with bookings on the same day.
        let mut keys = self.resource_keys(
            snapshot.vet_id,
            snapshot.room_id,
            snapshot.start_at,
            snapshot.end_at(),
        );
        keys.push(ResourceKey::Appointment(appointment_id));
        let _locks = self.lock(keys).await?;

        let current = self.repository.get(appointment_id).await?;
        self.lifecycle
            .validate_status_transition(current.status, request.status)?;
        let reason = self.lifecycle.validate_reason(request.status, request.reason)?;

        let now = Utc::now();
        let target = request.status;
        let updated = self
            .repository
            .update(appointment_id, |appointment| {
                appointment.status_history.push(StatusChange {
                    from: Some(appointment.status),
                    to: target,
                    reason,
                    actor_id,
                    at: now,
                });
                appointment.status = target;
                appointment.updated_at = now;
                Ok(())
            })
            .await?;

        info!(
            target: "audit",
            appointment_id = %appointment_id,
            from = %current.status,
            to = %updated.status,
            actor = ?actor_id,
            "appointment status changed"
        );

        Ok(updated)
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.repository.get(appointment_id).await
    }

    pub async fn list_appointments(
        &self,
        query: AppointmentSearchQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        if let (Some(from), Some(to)) = (query.from, query.to) {
            if from > to {
                return Err(AppointmentError::ValidationError(
                    "'from' must not be after 'to'".to_string(),
                ));
            }
        }
        if query.limit == Some(0) {
            return Err(AppointmentError::ValidationError(
                "Limit must be at least 1".to_string(),
            ));
        }

        Ok(self.repository.search(&query).await)
    }

    pub fn allowed_transitions(&self, status: AppointmentStatus) -> Vec<AppointmentStatus> {
        self.lifecycle.get_valid_transitions(status)
    }

    fn resource_keys(
        &self,
        vet_id: Uuid,
        room_id: Option<Uuid>,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> Vec<ResourceKey> {
        let dates = self.availability.clock().dates_touched(start_at, end_at);
        let mut keys: Vec<ResourceKey> = dates
            .iter()
            .map(|date| ResourceKey::Vet(vet_id, *date))
            .collect();
        if let Some(room_id) = room_id {
            keys.extend(dates.iter().map(|date| ResourceKey::Room(room_id, *date)));
        }
        keys
    }

    async fn lock(&self, keys: Vec<ResourceKey>) -> Result<LockSet<ResourceKey>, AppointmentError> {
        self.locks.acquire(keys).await.map_err(|e| match e {
            StoreError::LockTimeout { .. } => AppointmentError::ResourceBusy(
                "Another booking is in progress for this vet or room, please retry".to_string(),
            ),
            other => AppointmentError::Storage(other.to_string()),
        })
    }
}

fn window_end(start_at: DateTime<Utc>, duration_min: i32) -> Result<DateTime<Utc>, AppointmentError> {
    start_at
        .checked_add_signed(Duration::minutes(duration_min as i64))
        .ok_or_else(|| {
            AppointmentError::ValidationError(format!("Window starting at {} is out of range", start_at))
        })
}
