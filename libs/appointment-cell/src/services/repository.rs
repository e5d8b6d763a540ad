// libs/appointment-cell/src/services/repository.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use schedule_cell::models::BookedSlot;
use schedule_cell::services::BookedSlotSource;
use shared_database::InMemoryTable;

use crate::models::{Appointment, AppointmentError, AppointmentSearchQuery};

const DEFAULT_PAGE_SIZE: usize = 50;

/// Storage for the appointment ledger. Rows are never removed.
pub struct AppointmentRepository {
    appointments: InMemoryTable<Uuid, Appointment>,
}

impl AppointmentRepository {
    pub fn new() -> Self {
        Self {
            appointments: InMemoryTable::new("appointments"),
        }
    }

    pub async fn insert(&self, appointment: Appointment) -> Result<(), AppointmentError> {
        self.appointments
            .insert(appointment.id, appointment)
            .await
            .map_err(|e| AppointmentError::Storage(e.to_string()))
    }

    pub async fn get(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.appointments
            .get(&id)
            .await
            .ok_or(AppointmentError::NotFound(id))
    }

    /// Applies `f` to the stored appointment and persists the result only on
    /// success. Returns the updated row.
    pub async fn update<F>(&self, id: Uuid, f: F) -> Result<Appointment, AppointmentError>
    where
        F: FnOnce(&mut Appointment) -> Result<(), AppointmentError>,
    {
        self.appointments
            .modify(&id, |appointment| -> Result<Appointment, AppointmentError> {
                f(appointment)?;
                Ok(appointment.clone())
            })
            .await
            .ok_or(AppointmentError::NotFound(id))?
    }

    /// Matching appointments ascending by start, then paged.
    pub async fn search(&self, query: &AppointmentSearchQuery) -> Vec<Appointment> {
        let mut rows = self.appointments.scan(|a| query.matches(a)).await;
        rows.sort_by(|a, b| a.start_at.cmp(&b.start_at).then_with(|| a.id.cmp(&b.id)));

        rows.into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(DEFAULT_PAGE_SIZE))
            .collect()
    }

    async fn active_slots<F>(&self, from: DateTime<Utc>, to: DateTime<Utc>, owner: F) -> Vec<BookedSlot>
    where
        F: Fn(&Appointment) -> bool,
    {
        let mut slots: Vec<BookedSlot> = self
            .appointments
            .scan(|a| a.is_active() && owner(a))
            .await
            .into_iter()
            .map(|a| a.booked_slot())
            .filter(|slot| slot.overlaps(from, to))
            .collect();
        slots.sort_by_key(|slot| slot.start_at);
        slots
    }
}

impl Default for AppointmentRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookedSlotSource for AppointmentRepository {
    async fn vet_slots(&self, vet_id: Uuid, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<BookedSlot> {
        self.active_slots(from, to, |a| a.vet_id == vet_id).await
    }

    async fn room_slots(&self, room_id: Uuid, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<BookedSlot> {
        self.active_slots(from, to, |a| a.room_id == Some(room_id)).await
    }
}
