use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{
    AvailabilityQuery, AvailabilityResult, BookedSlot, ConflictReason, DayEntry, DayEntryKind,
    DayInterval, DaySchedule, DayStatus, ScheduleEntry, ScheduleError, ScheduleKind,
    windows_overlap, MAX_APPOINTMENT_DURATION_MIN,
};
use crate::services::recurrence::RecurrenceResolver;
use crate::services::schedule::ScheduleService;

/// Read access to active bookings. Implementations return only Pending,
/// Confirmed and InProgress appointments that overlap `[from, to)`.
#[async_trait]
pub trait BookedSlotSource: Send + Sync {
    async fn vet_slots(&self, vet_id: Uuid, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<BookedSlot>;

    async fn room_slots(&self, room_id: Uuid, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<BookedSlot>;
}

pub struct AvailabilityService {
    schedules: Arc<ScheduleService>,
    slots: Arc<dyn BookedSlotSource>,
    resolver: RecurrenceResolver,
    clock: ClinicClock,
    max_range_days: i64,
}

impl AvailabilityService {
    pub fn new(
        config: &AppConfig,
        schedules: Arc<ScheduleService>,
        slots: Arc<dyn BookedSlotSource>,
    ) -> Self {
        Self {
            schedules,
            slots,
            resolver: RecurrenceResolver::new(),
            clock: ClinicClock::new(config.clinic_offset()),
            max_range_days: config.max_calendar_range_days,
        }
    }

    pub fn clock(&self) -> &ClinicClock {
        &self.clock
    }

    /// Every schedule interval and active booking of `employee_id` on `date`.
    pub async fn effective_day(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> Result<DaySchedule, ScheduleError> {
        let mut days = self.resolve_days(employee_id, date, date).await?;
        Ok(days.pop().unwrap_or_else(|| DaySchedule {
            employee_id,
            date,
            status: DayStatus::Unscheduled,
            entries: Vec::new(),
        }))
    }

    /// One resolved day per date of `[date_from, date_to]`, for calendar views.
    pub async fn effective_range(
        &self,
        employee_id: Uuid,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<DaySchedule>, ScheduleError> {
        if date_from > date_to {
            return Err(ScheduleError::ValidationError(
                "Range start must not be after range end".to_string(),
            ));
        }

        let span = (date_to - date_from).num_days() + 1;
        if span > self.max_range_days {
            return Err(ScheduleError::ValidationError(format!(
                "Calendar range of {} days exceeds the maximum of {}",
                span, self.max_range_days
            )));
        }

        self.resolve_days(employee_id, date_from, date_to).await
    }

    /// Whether `employee_id` (and `room_id`, if given) can take the window
    /// `[start_at, start_at + duration_min)`. Every conflict is reported.
    pub async fn is_available(&self, query: &AvailabilityQuery) -> Result<AvailabilityResult, ScheduleError> {
        if query.duration_min <= 0 {
            return Err(ScheduleError::ValidationError(
                "Duration must be a positive number of minutes".to_string(),
            ));
        }
        if query.duration_min > MAX_APPOINTMENT_DURATION_MIN {
            return Err(ScheduleError::ValidationError(format!(
                "Duration must be at most {} minutes",
                MAX_APPOINTMENT_DURATION_MIN
            )));
        }

        let start = query.start_at;
        let end = start
            .checked_add_signed(Duration::minutes(query.duration_min as i64))
            .ok_or_else(|| {
                ScheduleError::ValidationError(format!("Window starting at {} is out of range", start))
            })?;
        let dates = self.clock.dates_touched(start, end);
        let (first_date, last_date) = match (dates.first(), dates.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(ScheduleError::ValidationError("Empty booking window".to_string())),
        };

        debug!(
            "Checking availability of employee {} (room {:?}) from {} to {}",
            query.employee_id, query.room_id, start, end
        );

        let entries = self.schedules.entries_for_employee(query.employee_id).await;
        let mut expanded: Vec<(&ScheduleEntry, DayInterval)> = Vec::new();
        for entry in &entries {
            for interval in self.resolver.expand(entry, first_date, last_date)? {
                expanded.push((entry, interval));
            }
        }
        expanded.sort_by(|(a, ai), (b, bi)| {
            b.kind
                .precedence()
                .cmp(&a.kind.precedence())
                .then_with(|| ai.date.cmp(&bi.date))
                .then_with(|| ai.start_time.cmp(&bi.start_time))
        });

        let mut conflicts = Vec::new();

        for (entry, interval) in &expanded {
            if entry.kind.is_time_off() {
                conflicts.push(ConflictReason::TimeOff {
                    entry_id: entry.id,
                    kind: entry.kind,
                    date: interval.date,
                });
            }
        }

        let mut within_shift = false;
        let mut on_call_dates = BTreeSet::new();
        for (entry, interval) in &expanded {
            match entry.kind {
                ScheduleKind::Break => {
                    let (break_start, break_end) = self.clock.interval_bounds(interval)?;
                    if windows_overlap(start, end, break_start, break_end) {
                        conflicts.push(ConflictReason::OnBreak {
                            entry_id: entry.id,
                            start_at: break_start,
                            end_at: break_end,
                        });
                    }
                }
                ScheduleKind::Shift => {
                    let (shift_start, shift_end) = self.clock.interval_bounds(interval)?;
                    within_shift |= shift_start <= start && end <= shift_end;
                }
                ScheduleKind::OnCall => {
                    on_call_dates.insert(interval.date);
                }
                _ => {}
            }
        }
        let on_call_throughout = dates.iter().all(|date| on_call_dates.contains(date));
        if !within_shift && !on_call_throughout {
            conflicts.push(ConflictReason::NotScheduled { date: first_date });
        }

        let mut vet_slots = self.slots.vet_slots(query.employee_id, start, end).await;
        vet_slots.sort_by_key(|slot| (slot.start_at, slot.appointment_id));
        for slot in vet_slots {
            if Some(slot.appointment_id) == query.exclude_appointment_id || !slot.overlaps(start, end) {
                continue;
            }
            conflicts.push(ConflictReason::EmployeeBusy {
                appointment_id: slot.appointment_id,
                start_at: slot.start_at,
                end_at: slot.end_at(),
            });
        }

        if let Some(room_id) = query.room_id {
            let mut room_slots = self.slots.room_slots(room_id, start, end).await;
            room_slots.sort_by_key(|slot| (slot.start_at, slot.appointment_id));
            for slot in room_slots {
                if Some(slot.appointment_id) == query.exclude_appointment_id || !slot.overlaps(start, end) {
                    continue;
                }
                conflicts.push(ConflictReason::RoomBusy {
                    appointment_id: slot.appointment_id,
                    room_id,
                    start_at: slot.start_at,
                    end_at: slot.end_at(),
                });
            }
        }

        let available = conflicts.is_empty();
        if !available {
            warn!(
                "Employee {} unavailable from {} to {}: {} conflict(s)",
                query.employee_id,
                start,
                end,
                conflicts.len()
            );
        }

        Ok(AvailabilityResult {
            available,
            conflicts,
            employee_id: query.employee_id,
            room_id: query.room_id,
            start_at: start,
            end_at: end,
        })
    }

    async fn resolve_days(
        &self,
        employee_id: Uuid,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<DaySchedule>, ScheduleError> {
        let mut by_date: BTreeMap<NaiveDate, Vec<DayEntry>> = date_from
            .iter_days()
            .take_while(|d| *d <= date_to)
            .map(|d| (d, Vec::new()))
            .collect();

        for entry in self.schedules.entries_for_employee(employee_id).await {
            for interval in self.resolver.expand(&entry, date_from, date_to)? {
                let (starts_at, ends_at) = self.clock.interval_bounds(&interval)?;
                if let Some(day) = by_date.get_mut(&interval.date) {
                    day.push(DayEntry {
                        kind: entry.kind.into(),
                        source_id: entry.id,
                        interval,
                        starts_at,
                        ends_at,
                    });
                }
            }
        }

        let (window_start, _) = self.clock.day_bounds(date_from)?;
        let (_, window_end) = self.clock.day_bounds(date_to)?;
        for slot in self.slots.vet_slots(employee_id, window_start, window_end).await {
            for (date, day) in by_date.iter_mut() {
                if let Some(busy) = self.clock.busy_entry(*date, &slot)? {
                    day.push(busy);
                }
            }
        }

        Ok(by_date
            .into_iter()
            .map(|(date, mut entries)| {
                entries.sort_by(|a, b| {
                    b.kind
                        .precedence()
                        .cmp(&a.kind.precedence())
                        .then_with(|| a.starts_at.cmp(&b.starts_at))
                        .then_with(|| a.source_id.cmp(&b.source_id))
                });
                DaySchedule {
                    employee_id,
                    date,
                    status: resolve_status(&entries),
                    entries,
                }
            })
            .collect())
    }
}

/// Resolves a day's status by kind precedence, never by entry order.
pub fn resolve_status(entries: &[DayEntry]) -> DayStatus {
    let dominant = entries
        .iter()
        .filter(|e| e.kind != DayEntryKind::Break && e.kind != DayEntryKind::Busy)
        .max_by_key(|e| e.kind.precedence());

    match dominant.map(|e| e.kind) {
        Some(DayEntryKind::Vacation) => DayStatus::TimeOff { kind: ScheduleKind::Vacation },
        Some(DayEntryKind::Leave) => DayStatus::TimeOff { kind: ScheduleKind::Leave },
        Some(DayEntryKind::OnCall) => DayStatus::OnCall,
        Some(DayEntryKind::Shift) => DayStatus::Working,
        _ => DayStatus::Unscheduled,
    }
}

/// Converts between UTC instants and clinic-local calendar dates.
#[derive(Debug, Clone, Copy)]
pub struct ClinicClock {
    offset: FixedOffset,
}

impl ClinicClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// Fails for dates at the edge of the representable calendar.
    pub fn to_utc(&self, date: NaiveDate, time: NaiveTime) -> Result<DateTime<Utc>, ScheduleError> {
        date.and_time(time)
            .checked_sub_signed(Duration::seconds(self.offset.local_minus_utc() as i64))
            .map(|local| local.and_utc())
            .ok_or_else(|| out_of_range(date))
    }

    /// `[local midnight, next local midnight)` as UTC instants.
    pub fn day_bounds(&self, date: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>), ScheduleError> {
        let start = self.to_utc(date, NaiveTime::MIN)?;
        let end = start
            .checked_add_signed(Duration::days(1))
            .ok_or_else(|| out_of_range(date))?;
        Ok((start, end))
    }

    pub fn interval_bounds(
        &self,
        interval: &DayInterval,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), ScheduleError> {
        match (interval.all_day, interval.start_time, interval.end_time) {
            (false, Some(start), Some(end)) => Ok((
                self.to_utc(interval.date, start)?,
                self.to_utc(interval.date, end)?,
            )),
            _ => self.day_bounds(interval.date),
        }
    }

    /// Local dates covered by the half-open window `[start, end)`.
    pub fn dates_touched(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<NaiveDate> {
        if end <= start {
            return Vec::new();
        }
        let first = self.local_date(start);
        let last = self.local_date(end - Duration::nanoseconds(1));
        first.iter_days().take_while(|d| *d <= last).collect()
    }

    fn busy_entry(&self, date: NaiveDate, slot: &BookedSlot) -> Result<Option<DayEntry>, ScheduleError> {
        let (day_start, day_end) = self.day_bounds(date)?;
        let slot_end = slot.end_at();
        if !windows_overlap(slot.start_at, slot_end, day_start, day_end) {
            return Ok(None);
        }

        let clipped_start = slot.start_at.max(day_start);
        let local_start = clipped_start.with_timezone(&self.offset).time();
        let local_end = (slot_end < day_end).then(|| slot_end.with_timezone(&self.offset).time());

        Ok(Some(DayEntry {
            kind: DayEntryKind::Busy,
            source_id: slot.appointment_id,
            interval: DayInterval {
                date,
                start_time: Some(local_start),
                end_time: local_end,
                all_day: false,
            },
            starts_at: clipped_start,
            ends_at: slot_end.min(day_end),
        }))
    }
}

fn out_of_range(date: NaiveDate) -> ScheduleError {
    ScheduleError::ValidationError(format!("Date {} is outside the supported calendar", date))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(hours: i32) -> ClinicClock {
        ClinicClock::new(FixedOffset::east_opt(hours * 3600).unwrap())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_local_dates_follow_offset() {
        let instant = date(2024, 6, 3).and_hms_opt(23, 30, 0).unwrap().and_utc();
        assert_eq!(clock(0).local_date(instant), date(2024, 6, 3));
        assert_eq!(clock(2).local_date(instant), date(2024, 6, 4));
        assert_eq!(clock(-5).local_date(instant), date(2024, 6, 3));
    }

    #[test]
    fn test_day_bounds_in_offset() {
        let (start, end) = clock(2).day_bounds(date(2024, 6, 4)).unwrap();
        assert_eq!(start, date(2024, 6, 3).and_hms_opt(22, 0, 0).unwrap().and_utc());
        assert_eq!(end - start, Duration::days(1));
    }

    #[test]
    fn test_calendar_edges_are_errors() {
        assert!(matches!(
            clock(0).day_bounds(NaiveDate::MAX),
            Err(ScheduleError::ValidationError(_))
        ));
        assert!(matches!(
            clock(2).to_utc(NaiveDate::MIN, NaiveTime::MIN),
            Err(ScheduleError::ValidationError(_))
        ));
        assert!(clock(-5).day_bounds(NaiveDate::MIN).is_ok());
    }

    #[test]
    fn test_dates_touched_is_half_open() {
        let c = clock(0);
        let start = date(2024, 6, 3).and_hms_opt(23, 0, 0).unwrap().and_utc();

        let until_midnight = c.dates_touched(start, start + Duration::hours(1));
        assert_eq!(until_midnight, vec![date(2024, 6, 3)]);

        let past_midnight = c.dates_touched(start, start + Duration::minutes(61));
        assert_eq!(past_midnight, vec![date(2024, 6, 3), date(2024, 6, 4)]);

        assert!(c.dates_touched(start, start).is_empty());
    }

    #[test]
    fn test_status_uses_precedence_not_order() {
        let c = clock(0);
        let d = date(2024, 6, 10);
        let entry = |kind: DayEntryKind, interval: DayInterval| {
            let (starts_at, ends_at) = c.interval_bounds(&interval).unwrap();
            DayEntry { kind, source_id: Uuid::new_v4(), interval, starts_at, ends_at }
        };
        let shift = entry(
            DayEntryKind::Shift,
            DayInterval::timed(d, NaiveTime::from_hms_opt(9, 0, 0).unwrap(), NaiveTime::from_hms_opt(17, 0, 0).unwrap()),
        );
        let vacation = entry(DayEntryKind::Vacation, DayInterval::all_day(d));

        let status_a = resolve_status(&[shift.clone(), vacation.clone()]);
        let status_b = resolve_status(&[vacation, shift.clone()]);
        assert_eq!(status_a, DayStatus::TimeOff { kind: ScheduleKind::Vacation });
        assert_eq!(status_a, status_b);

        assert_eq!(resolve_status(&[shift]), DayStatus::Working);
        assert_eq!(resolve_status(&[]), DayStatus::Unscheduled);
    }
}
