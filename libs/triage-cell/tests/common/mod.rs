// Shared fixtures for triage-cell integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use appointment_cell::services::{AppointmentBookingService, AppointmentRepository};
use schedule_cell::models::{CreateScheduleEntryRequest, Recurrence, ScheduleKind};
use schedule_cell::services::{AvailabilityService, ScheduleService};
use shared_utils::test_utils::{date, time, TestConfig};
use triage_cell::models::SubmitDigitalRequest;
use triage_cell::services::TriageService;

pub struct Clinic {
    pub schedules: Arc<ScheduleService>,
    pub availability: Arc<AvailabilityService>,
    pub booking: Arc<AppointmentBookingService>,
    pub triage: Arc<TriageService>,
}

impl Clinic {
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
            repository,
            availability.clone(),
        ));
        let triage = Arc::new(TriageService::new(&config, booking.clone(), availability.clone()));

        Self { schedules, availability, booking, triage }
    }

    /// A vet working Mondays 09:00-17:00 from 2024-06-01.
    pub async fn monday_vet(&self) -> Uuid {
        let vet_id = Uuid::new_v4();
        self.schedules
            .create_entry(
                CreateScheduleEntryRequest {
                    employee_id: vet_id,
                    kind: ScheduleKind::Shift,
                    recurrence: Recurrence::Weekly {
                        day_of_week: 1,
                        range_start: date(2024, 6, 1),
                        range_end: None,
                        start_time: time(9, 0),
                        end_time: time(17, 0),
                    },
                    notes: None,
                },
                None,
            )
            .await
            .unwrap();
        vet_id
    }
}

pub fn submission(preferred_vet_id: Option<Uuid>, start_at: DateTime<Utc>) -> SubmitDigitalRequest {
    SubmitDigitalRequest {
        pet_id: Uuid::new_v4(),
        requester_id: Uuid::new_v4(),
        preferred_vet_id,
        preferred_room_id: None,
        requested_start_at: start_at,
        estimated_duration_min: 30,
        appointment_type: Default::default(),
        notes: Some("limping since Sunday".to_string()),
    }
}
