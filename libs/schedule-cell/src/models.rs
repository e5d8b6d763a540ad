use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate, NaiveTime, Duration};
use std::fmt;

use shared_models::error::AppError;

// ==============================================================================
// SCHEDULE ENTRY MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    Shift,
    Break,
    Vacation,
    Leave,
    OnCall,
}

impl ScheduleKind {
    /// Resolution order when entries for the same day disagree. Higher wins,
    /// so a vacation or leave overrides any shift recorded for that day.
    pub fn precedence(&self) -> u8 {
        match self {
            ScheduleKind::Vacation => 50,
            ScheduleKind::Leave => 40,
            ScheduleKind::Break => 30,
            ScheduleKind::OnCall => 20,
            ScheduleKind::Shift => 10,
        }
    }

    pub fn is_time_off(&self) -> bool {
        matches!(self, ScheduleKind::Vacation | ScheduleKind::Leave)
    }

    pub fn uses_weekly_recurrence(&self) -> bool {
        matches!(self, ScheduleKind::Shift | ScheduleKind::Break)
    }
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleKind::Shift => write!(f, "shift"),
            ScheduleKind::Break => write!(f, "break"),
            ScheduleKind::Vacation => write!(f, "vacation"),
            ScheduleKind::Leave => write!(f, "leave"),
            ScheduleKind::OnCall => write!(f, "on_call"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum Recurrence {
    Weekly {
        day_of_week: u8, // 0 = Sunday, 6 = Saturday
        range_start: NaiveDate,
        range_end: Option<NaiveDate>,
        start_time: NaiveTime,
        end_time: NaiveTime,
    },
    Continuous {
        range_start: NaiveDate,
        range_end: Option<NaiveDate>,
    },
}

impl Recurrence {
    pub fn range_start(&self) -> NaiveDate {
        match self {
            Recurrence::Weekly { range_start, .. } => *range_start,
            Recurrence::Continuous { range_start, .. } => *range_start,
        }
    }

    pub fn range_end(&self) -> Option<NaiveDate> {
        match self {
            Recurrence::Weekly { range_end, .. } => *range_end,
            Recurrence::Continuous { range_end, .. } => *range_end,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleEntry {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub kind: ScheduleKind,
    pub recurrence: Recurrence,
    pub notes: Option<String>,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduleEntry {
    pub fn new(
        employee_id: Uuid,
        kind: ScheduleKind,
        recurrence: Recurrence,
        notes: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            employee_id,
            kind,
            recurrence,
            notes,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks the kind/recurrence pairing and the date and time ranges.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        match (&self.recurrence, self.kind.uses_weekly_recurrence()) {
            (Recurrence::Weekly { .. }, false) => {
                return Err(ScheduleError::InvalidEntry(format!(
                    "{} entries must use a continuous date range",
                    self.kind
                )));
            }
            (Recurrence::Continuous { .. }, true) => {
                return Err(ScheduleError::InvalidEntry(format!(
                    "{} entries must use a weekly recurrence",
                    self.kind
                )));
            }
            _ => {}
        }

        if let Recurrence::Weekly { day_of_week, start_time, end_time, .. } = &self.recurrence {
            if *day_of_week > 6 {
                return Err(ScheduleError::InvalidEntry(
                    "Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
                ));
            }
            if start_time >= end_time {
                return Err(ScheduleError::InvalidEntry(
                    "Start time must be before end time".to_string(),
                ));
            }
        }

        if let Some(range_end) = self.recurrence.range_end() {
            if self.recurrence.range_start() > range_end {
                return Err(ScheduleError::InvalidEntry(
                    "Range start must not be after range end".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// A superseded or deleted version of an entry, kept for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRevision {
    pub entry: ScheduleEntry,
    pub superseded_at: DateTime<Utc>,
    pub deleted: bool,
}

// ==============================================================================
// RESOLVED SCHEDULE MODELS
// ==============================================================================

/// One concrete occurrence of an entry on a calendar date. Clock times are
/// clinic-local; all-day intervals carry no times.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayInterval {
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub all_day: bool,
}

impl DayInterval {
    pub fn timed(date: NaiveDate, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            date,
            start_time: Some(start_time),
            end_time: Some(end_time),
            all_day: false,
        }
    }

    pub fn all_day(date: NaiveDate) -> Self {
        Self {
            date,
            start_time: None,
            end_time: None,
            all_day: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DayEntryKind {
    Shift,
    Break,
    Vacation,
    Leave,
    OnCall,
    Busy,
}

impl DayEntryKind {
    pub fn precedence(&self) -> u8 {
        match self {
            DayEntryKind::Shift => ScheduleKind::Shift.precedence(),
            DayEntryKind::Break => ScheduleKind::Break.precedence(),
            DayEntryKind::Vacation => ScheduleKind::Vacation.precedence(),
            DayEntryKind::Leave => ScheduleKind::Leave.precedence(),
            DayEntryKind::OnCall => ScheduleKind::OnCall.precedence(),
            DayEntryKind::Busy => 0,
        }
    }
}

impl From<ScheduleKind> for DayEntryKind {
    fn from(kind: ScheduleKind) -> Self {
        match kind {
            ScheduleKind::Shift => DayEntryKind::Shift,
            ScheduleKind::Break => DayEntryKind::Break,
            ScheduleKind::Vacation => DayEntryKind::Vacation,
            ScheduleKind::Leave => DayEntryKind::Leave,
            ScheduleKind::OnCall => DayEntryKind::OnCall,
        }
    }
}

/// An interval on the resolved day. `source_id` is the schedule entry id, or
/// the appointment id for `Busy` entries. A busy interval that runs past
/// midnight has no `end_time` on the first day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayEntry {
    pub kind: DayEntryKind,
    pub source_id: Uuid,
    pub interval: DayInterval,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DayStatus {
    TimeOff { kind: ScheduleKind },
    OnCall,
    Working,
    Unscheduled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaySchedule {
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub status: DayStatus,
    pub entries: Vec<DayEntry>,
}

impl DaySchedule {
    pub fn is_working(&self) -> bool {
        matches!(self.status, DayStatus::Working | DayStatus::OnCall)
    }

    pub fn busy_entries(&self) -> impl Iterator<Item = &DayEntry> {
        self.entries.iter().filter(|e| e.kind == DayEntryKind::Busy)
    }
}

// ==============================================================================
// BOOKED SLOT & AVAILABILITY MODELS
// ==============================================================================

/// Longest bookable window, in minutes.
pub const MAX_APPOINTMENT_DURATION_MIN: i32 = 24 * 60;

/// An active (Pending, Confirmed or InProgress) booking as seen by the
/// availability resolver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookedSlot {
    pub appointment_id: Uuid,
    pub vet_id: Uuid,
    pub room_id: Option<Uuid>,
    pub start_at: DateTime<Utc>,
    pub duration_min: i32,
}

impl BookedSlot {
    pub fn end_at(&self) -> DateTime<Utc> {
        self.start_at
            .checked_add_signed(Duration::minutes(self.duration_min as i64))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        windows_overlap(self.start_at, self.end_at(), start, end)
    }
}

/// Half-open interval overlap: `[a_start, a_end)` and `[b_start, b_end)`.
pub fn windows_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ConflictReason {
    NotScheduled {
        date: NaiveDate,
    },
    TimeOff {
        entry_id: Uuid,
        kind: ScheduleKind,
        date: NaiveDate,
    },
    OnBreak {
        entry_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    },
    EmployeeBusy {
        appointment_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    },
    RoomBusy {
        appointment_id: Uuid,
        room_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    },
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictReason::NotScheduled { date } => {
                write!(f, "no shift or on-call coverage on {}", date)
            }
            ConflictReason::TimeOff { kind, date, .. } => write!(f, "{} on {}", kind, date),
            ConflictReason::OnBreak { start_at, end_at, .. } => {
                write!(f, "break from {} to {}", start_at, end_at)
            }
            ConflictReason::EmployeeBusy { appointment_id, .. } => {
                write!(f, "employee already booked for appointment {}", appointment_id)
            }
            ConflictReason::RoomBusy { appointment_id, room_id, .. } => {
                write!(f, "room {} already booked for appointment {}", room_id, appointment_id)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub employee_id: Uuid,
    pub room_id: Option<Uuid>,
    pub start_at: DateTime<Utc>,
    pub duration_min: i32,
    pub exclude_appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailabilityResult {
    pub available: bool,
    pub conflicts: Vec<ConflictReason>,
    pub employee_id: Uuid,
    pub room_id: Option<Uuid>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleEntryRequest {
    pub employee_id: Uuid,
    pub kind: ScheduleKind,
    pub recurrence: Recurrence,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateScheduleEntryRequest {
    pub kind: Option<ScheduleKind>,
    pub recurrence: Option<Recurrence>,
    pub notes: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("Invalid schedule entry: {0}")]
    InvalidEntry(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Schedule entry {0} not found")]
    NotFound(Uuid),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<ScheduleError> for AppError {
    fn from(error: ScheduleError) -> Self {
        match error {
            ScheduleError::InvalidEntry(msg) => AppError::InvalidEntry(msg),
            ScheduleError::ValidationError(msg) => AppError::ValidationError(msg),
            ScheduleError::NotFound(_) => AppError::NotFound(error.to_string()),
            ScheduleError::Storage(msg) => AppError::Internal(msg),
        }
    }
}
