// Shared fixtures for appointment-cell integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use appointment_cell::models::{AppointmentType, BookAppointmentRequest};
use appointment_cell::services::{AppointmentBookingService, AppointmentRepository};
use schedule_cell::models::{CreateScheduleEntryRequest, Recurrence, ScheduleKind};
use schedule_cell::services::{AvailabilityService, ScheduleService};
use shared_utils::test_utils::{date, time, TestConfig};

/// A ledger wired to a real availability resolver over in-memory storage.
pub struct Ledger {
    pub schedules: Arc<ScheduleService>,
    pub repository: Arc<AppointmentRepository>,
    pub availability: Arc<AvailabilityService>,
    pub booking: Arc<AppointmentBookingService>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::with_config(TestConfig::default())
    }

    pub fn with_config(test_config: TestConfig) -> Self {
        let config = test_config.to_app_config();
        let schedules = Arc::new(ScheduleService::new());
        let repository = Arc::new(AppointmentRepository::new());
        let availability = Arc::new(AvailabilityService::new(
            &config,
            schedules.clone(),
            repository.clone(),
        ));
        let booking = Arc::new(AppointmentBookingService::new(
            &config,
            repository.clone(),
            availability.clone(),
        ));

        Self { schedules, repository, availability, booking }
    }

    /// Weekly shift starting 2024-06-01 with no end.
    pub async fn add_shift(&self, vet_id: Uuid, day_of_week: u8, start: NaiveTime, end: NaiveTime) -> Uuid {
        self.add_weekly(vet_id, ScheduleKind::Shift, day_of_week, start, end).await
    }

    pub async fn add_weekly(
        &self,
        vet_id: Uuid,
        kind: ScheduleKind,
        day_of_week: u8,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Uuid {
        self.schedules
            .create_entry(
                CreateScheduleEntryRequest {
                    employee_id: vet_id,
                    kind,
                    recurrence: Recurrence::Weekly {
                        day_of_week,
                        range_start: date(2024, 6, 1),
                        range_end: None,
                        start_time: start,
                        end_time: end,
                    },
                    notes: None,
                },
                None,
            )
            .await
            .unwrap()
            .id
    }

    pub async fn add_time_off(&self, vet_id: Uuid, kind: ScheduleKind, from: NaiveDate, to: NaiveDate) -> Uuid {
        self.schedules
            .create_entry(
                CreateScheduleEntryRequest {
                    employee_id: vet_id,
                    kind,
                    recurrence: Recurrence::Continuous {
                        range_start: from,
                        range_end: Some(to),
                    },
                    notes: None,
                },
                None,
            )
            .await
            .unwrap()
            .id
    }

    /// A vet working Mondays 09:00-17:00.
    pub async fn monday_vet(&self) -> Uuid {
        let vet_id = Uuid::new_v4();
        self.add_shift(vet_id, 1, time(9, 0), time(17, 0)).await;
        vet_id
    }
}

pub fn request(
    vet_id: Uuid,
    room_id: Option<Uuid>,
    start_at: DateTime<Utc>,
    duration_min: i32,
) -> BookAppointmentRequest {
    BookAppointmentRequest {
        pet_id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        vet_id,
        room_id,
        appointment_type: AppointmentType::Consultation,
        start_at,
        duration_min,
        notes: None,
    }
}
