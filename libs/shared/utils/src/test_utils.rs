use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::actor::{Actor, ActorRole};

pub struct TestConfig {
    pub clinic_utc_offset: String,
    pub booking_lock_timeout_ms: u64,
    pub max_calendar_range_days: i64,
    pub triage_confirms_as_scheduler: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            clinic_utc_offset: "+00:00".to_string(),
            booking_lock_timeout_ms: 500,
            max_calendar_range_days: 92,
            triage_confirms_as_scheduler: true,
        }
    }
}

impl TestConfig {
    pub fn with_offset(offset: &str) -> Self {
        Self {
            clinic_utc_offset: offset.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            api_host: "127.0.0.1".to_string(),
            api_port: 0,
            clinic_utc_offset: self.clinic_utc_offset.clone(),
            booking_lock_timeout_ms: self.booking_lock_timeout_ms,
            max_calendar_range_days: self.max_calendar_range_days,
            triage_confirms_as_scheduler: self.triage_confirms_as_scheduler,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestActor;

impl TestActor {
    pub fn scheduler() -> Actor {
        Actor {
            id: Some(Uuid::new_v4()),
            role: ActorRole::Scheduler,
        }
    }

    pub fn staff() -> Actor {
        Actor {
            id: Some(Uuid::new_v4()),
            role: ActorRole::Staff,
        }
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

pub fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid test time")
}

pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    date(year, month, day).and_time(time(hour, minute)).and_utc()
}
