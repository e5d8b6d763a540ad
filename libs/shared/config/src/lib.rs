use std::env;
use std::str::FromStr;

use chrono::{FixedOffset, Offset, Utc};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_host: String,
    pub api_port: u16,
    pub clinic_utc_offset: String,
    pub booking_lock_timeout_ms: u64,
    pub max_calendar_range_days: i64,
    pub triage_confirms_as_scheduler: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 3000,
            clinic_utc_offset: "+00:00".to_string(),
            booking_lock_timeout_ms: 2000,
            max_calendar_range_days: 92,
            triage_confirms_as_scheduler: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            api_host: env::var("API_HOST").unwrap_or_else(|_| {
                warn!("API_HOST not set, using default");
                defaults.api_host.clone()
            }),
            api_port: parse_var("API_PORT", defaults.api_port),
            clinic_utc_offset: env::var("CLINIC_UTC_OFFSET").unwrap_or_else(|_| {
                warn!("CLINIC_UTC_OFFSET not set, scheduling in UTC");
                defaults.clinic_utc_offset.clone()
            }),
            booking_lock_timeout_ms: parse_var(
                "BOOKING_LOCK_TIMEOUT_MS",
                defaults.booking_lock_timeout_ms,
            ),
            max_calendar_range_days: parse_var(
                "MAX_CALENDAR_RANGE_DAYS",
                defaults.max_calendar_range_days,
            ),
            triage_confirms_as_scheduler: parse_var(
                "TRIAGE_CONFIRMS_AS_SCHEDULER",
                defaults.triage_confirms_as_scheduler,
            ),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - check scheduling environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        self.parsed_offset().is_some()
            && self.booking_lock_timeout_ms > 0
            && self.max_calendar_range_days > 0
    }

    /// Offset used to turn instants into clinic calendar dates.
    /// Falls back to UTC when `clinic_utc_offset` is malformed.
    pub fn clinic_offset(&self) -> FixedOffset {
        self.parsed_offset().unwrap_or_else(|| {
            warn!("Invalid CLINIC_UTC_OFFSET '{}', using UTC", self.clinic_utc_offset);
            Utc.fix()
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    fn parsed_offset(&self) -> Option<FixedOffset> {
        let raw = self.clinic_utc_offset.trim();
        if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
            return Some(Utc.fix());
        }
        FixedOffset::from_str(raw).ok()
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using {:?}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_parsing() {
        let mut config = AppConfig::default();
        assert_eq!(config.clinic_offset().local_minus_utc(), 0);

        config.clinic_utc_offset = "-05:00".to_string();
        assert_eq!(config.clinic_offset().local_minus_utc(), -5 * 3600);

        config.clinic_utc_offset = "UTC".to_string();
        assert!(config.is_configured());

        config.clinic_utc_offset = "somewhere".to_string();
        assert!(!config.is_configured());
        assert_eq!(config.clinic_offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_bind_address() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
    }
}
