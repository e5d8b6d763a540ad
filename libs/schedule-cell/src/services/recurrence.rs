use chrono::{Datelike, Days, NaiveDate};
use tracing::debug;

use crate::models::{DayInterval, Recurrence, ScheduleEntry, ScheduleError};

pub struct RecurrenceResolver;

impl RecurrenceResolver {
    pub fn new() -> Self {
        Self
    }

    /// Expand a schedule entry into one interval per matching date of
    /// `[range_from, range_to]`, ascending. Non-intersecting ranges yield an
    /// empty vector; a malformed entry is an `InvalidEntry` error.
    pub fn expand(
        &self,
        entry: &ScheduleEntry,
        range_from: NaiveDate,
        range_to: NaiveDate,
    ) -> Result<Vec<DayInterval>, ScheduleError> {
        entry.validate()?;

        let Some((first, last)) = intersect(
            range_from,
            range_to,
            entry.recurrence.range_start(),
            entry.recurrence.range_end(),
        ) else {
            return Ok(Vec::new());
        };

        let intervals = match &entry.recurrence {
            Recurrence::Weekly { day_of_week, start_time, end_time, .. } => {
                let mut intervals = Vec::new();
                let mut current = first_weekday_on_or_after(first, *day_of_week);

                while let Some(date) = current.filter(|d| *d <= last) {
                    intervals.push(DayInterval::timed(date, *start_time, *end_time));
                    current = date.checked_add_days(Days::new(7));
                }
                intervals
            }
            Recurrence::Continuous { .. } => first
                .iter_days()
                .take_while(|date| *date <= last)
                .map(DayInterval::all_day)
                .collect(),
        };

        debug!(
            "Expanded {} entry {} over {}..={} into {} interval(s)",
            entry.kind,
            entry.id,
            range_from,
            range_to,
            intervals.len()
        );

        Ok(intervals)
    }

    /// The occurrence of `entry` on `date`, if any.
    pub fn occurrence_on(
        &self,
        entry: &ScheduleEntry,
        date: NaiveDate,
    ) -> Result<Option<DayInterval>, ScheduleError> {
        Ok(self.expand(entry, date, date)?.into_iter().next())
    }
}

impl Default for RecurrenceResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn intersect(
    range_from: NaiveDate,
    range_to: NaiveDate,
    entry_start: NaiveDate,
    entry_end: Option<NaiveDate>,
) -> Option<(NaiveDate, NaiveDate)> {
    let first = range_from.max(entry_start);
    let last = match entry_end {
        Some(end) => range_to.min(end),
        None => range_to,
    };
    (first <= last).then_some((first, last))
}

fn first_weekday_on_or_after(date: NaiveDate, day_of_week: u8) -> Option<NaiveDate> {
    let current = date.weekday().num_days_from_sunday();
    let offset = (u32::from(day_of_week) + 7 - current) % 7;
    date.checked_add_days(Days::new(u64::from(offset)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Weekday};
    use uuid::Uuid;

    use crate::models::ScheduleKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monday_shift(range_end: Option<NaiveDate>) -> ScheduleEntry {
        ScheduleEntry::new(
            Uuid::new_v4(),
            ScheduleKind::Shift,
            Recurrence::Weekly {
                day_of_week: 1,
                range_start: date(2024, 6, 1),
                range_end,
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            },
            None,
        )
    }

    #[test]
    fn test_weekly_lands_on_weekday() {
        let resolver = RecurrenceResolver::new();
        let intervals = resolver
            .expand(&monday_shift(None), date(2024, 6, 1), date(2024, 6, 30))
            .unwrap();

        let dates: Vec<NaiveDate> = intervals.iter().map(|i| i.date).collect();
        assert_eq!(
            dates,
            vec![date(2024, 6, 3), date(2024, 6, 10), date(2024, 6, 17), date(2024, 6, 24)]
        );
        assert!(intervals.iter().all(|i| i.date.weekday() == Weekday::Mon && !i.all_day));
    }

    #[test]
    fn test_weekly_respects_range_end() {
        let resolver = RecurrenceResolver::new();
        let intervals = resolver
            .expand(&monday_shift(Some(date(2024, 6, 10))), date(2024, 5, 1), date(2024, 12, 31))
            .unwrap();
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[1].date, date(2024, 6, 10));
    }

    #[test]
    fn test_disjoint_ranges_are_empty() {
        let resolver = RecurrenceResolver::new();
        let entry = monday_shift(Some(date(2024, 6, 30)));

        assert!(resolver.expand(&entry, date(2024, 1, 1), date(2024, 5, 31)).unwrap().is_empty());
        assert!(resolver.expand(&entry, date(2024, 6, 20), date(2024, 6, 10)).unwrap().is_empty());
        assert_eq!(resolver.occurrence_on(&entry, date(2024, 6, 4)).unwrap(), None);
        assert!(resolver.occurrence_on(&entry, date(2024, 6, 3)).unwrap().is_some());
    }

    #[test]
    fn test_continuous_covers_every_day() {
        let resolver = RecurrenceResolver::new();
        let entry = ScheduleEntry::new(
            Uuid::new_v4(),
            ScheduleKind::Vacation,
            Recurrence::Continuous { range_start: date(2024, 6, 1), range_end: Some(date(2024, 6, 15)) },
            None,
        );

        let intervals = resolver.expand(&entry, date(2024, 1, 1), date(2024, 12, 31)).unwrap();
        assert_eq!(intervals.len(), 15);
        assert!(intervals.iter().all(|i| i.all_day && i.start_time.is_none()));
        assert_eq!(intervals.first().map(|i| i.date), Some(date(2024, 6, 1)));
        assert_eq!(intervals.last().map(|i| i.date), Some(date(2024, 6, 15)));
    }

    #[test]
    fn test_invalid_entry_is_an_error() {
        let resolver = RecurrenceResolver::new();
        let entry = ScheduleEntry::new(
            Uuid::new_v4(),
            ScheduleKind::Shift,
            Recurrence::Continuous { range_start: date(2024, 6, 1), range_end: None },
            None,
        );
        assert!(matches!(
            resolver.expand(&entry, date(2024, 6, 1), date(2024, 6, 7)),
            Err(ScheduleError::InvalidEntry(_))
        ));
    }
}
