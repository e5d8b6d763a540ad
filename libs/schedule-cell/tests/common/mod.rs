// Shared fixtures for schedule-cell integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use schedule_cell::models::{BookedSlot, CreateScheduleEntryRequest, Recurrence, ScheduleKind};
use schedule_cell::services::{AvailabilityService, BookedSlotSource, ScheduleService};
use shared_utils::test_utils::TestConfig;

/// Booked slots held in memory; stands in for the appointment ledger.
#[derive(Default)]
pub struct StaticSlots {
    slots: RwLock<Vec<BookedSlot>>,
}

impl StaticSlots {
    pub async fn push(&self, slot: BookedSlot) {
        self.slots.write().await.push(slot);
    }
}

#[async_trait]
impl BookedSlotSource for StaticSlots {
    async fn vet_slots(&self, vet_id: Uuid, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<BookedSlot> {
        self.slots
            .read()
            .await
            .iter()
            .filter(|s| s.vet_id == vet_id && s.overlaps(from, to))
            .cloned()
            .collect()
    }

    async fn room_slots(&self, room_id: Uuid, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<BookedSlot> {
        self.slots
            .read()
            .await
            .iter()
            .filter(|s| s.room_id == Some(room_id) && s.overlaps(from, to))
            .cloned()
            .collect()
    }
}

pub struct Harness {
    pub schedules: Arc<ScheduleService>,
    pub slots: Arc<StaticSlots>,
    pub availability: AvailabilityService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_offset("+00:00")
    }

    pub fn with_offset(offset: &str) -> Self {
        let config = TestConfig::with_offset(offset).to_app_config();
        let schedules = Arc::new(ScheduleService::new());
        let slots = Arc::new(StaticSlots::default());
        let availability = AvailabilityService::new(&config, schedules.clone(), slots.clone());
        Self { schedules, slots, availability }
    }

    pub async fn add_weekly(
        &self,
        employee_id: Uuid,
        kind: ScheduleKind,
        day_of_week: u8,
        range_start: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Uuid {
        self.schedules
            .create_entry(
                CreateScheduleEntryRequest {
                    employee_id,
                    kind,
                    recurrence: Recurrence::Weekly {
                        day_of_week,
                        range_start,
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

    pub async fn add_continuous(
        &self,
        employee_id: Uuid,
        kind: ScheduleKind,
        range_start: NaiveDate,
        range_end: Option<NaiveDate>,
    ) -> Uuid {
        self.schedules
            .create_entry(
                CreateScheduleEntryRequest {
                    employee_id,
                    kind,
                    recurrence: Recurrence::Continuous { range_start, range_end },
                    notes: None,
                },
                None,
            )
            .await
            .unwrap()
            .id
    }
}
