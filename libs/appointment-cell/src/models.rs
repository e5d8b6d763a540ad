// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use chrono::{DateTime, Utc, Duration};
use std::fmt;

use schedule_cell::models::{BookedSlot, ConflictReason, ScheduleError, MAX_APPOINTMENT_DURATION_MIN};
use shared_models::error::AppError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub owner_id: Uuid,
    pub vet_id: Uuid,
    pub room_id: Option<Uuid>,
    pub appointment_type: AppointmentType,
    pub start_at: DateTime<Utc>,
    pub duration_min: i32,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub source: AppointmentSource,
    pub status_history: Vec<StatusChange>,
    pub reschedule_history: Vec<SlotChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// End of the booked window (exclusive).
    pub fn end_at(&self) -> DateTime<Utc> {
        self.start_at
            .checked_add_signed(Duration::minutes(self.duration_min as i64))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether this appointment still holds its vet and room.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn booked_slot(&self) -> BookedSlot {
        BookedSlot {
            appointment_id: self.id,
            vet_id: self.vet_id,
            room_id: self.room_id,
            start_at: self.start_at,
            duration_min: self.duration_min,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::InProgress => write!(f, "in_progress"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    #[default]
    #[serde(alias = "consulta", alias = "general")]
    Consultation,

    #[serde(alias = "cirugia", alias = "operation")]
    Surgery,

    #[serde(alias = "vacunacion", alias = "vaccine")]
    Vaccination,

    #[serde(alias = "emergencia", alias = "urgent")]
    Emergency,

    #[serde(alias = "check_up", alias = "control")]
    Checkup,

    Grooming,

    #[serde(alias = "follow_up_visit", alias = "followup")]
    FollowUp,
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::Consultation => write!(f, "consultation"),
            AppointmentType::Surgery => write!(f, "surgery"),
            AppointmentType::Vaccination => write!(f, "vaccination"),
            AppointmentType::Emergency => write!(f, "emergency"),
            AppointmentType::Checkup => write!(f, "checkup"),
            AppointmentType::Grooming => write!(f, "grooming"),
            AppointmentType::FollowUp => write!(f, "follow_up"),
        }
    }
}

/// Where a booking came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AppointmentSource {
    Direct,
    DigitalRequest { request_id: Uuid },
}

/// Audit record of a status change. The initial booking has no `from`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusChange {
    pub from: Option<AppointmentStatus>,
    pub to: AppointmentStatus,
    pub reason: Option<String>,
    pub actor_id: Option<Uuid>,
    pub at: DateTime<Utc>,
}

/// Audit record of a reschedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotChange {
    pub previous_start_at: DateTime<Utc>,
    pub previous_duration_min: i32,
    pub reason: Option<String>,
    pub actor_id: Option<Uuid>,
    pub at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub pet_id: Uuid,
    pub owner_id: Uuid,
    pub vet_id: Uuid,
    pub room_id: Option<Uuid>,
    #[serde(default)]
    pub appointment_type: AppointmentType,
    pub start_at: DateTime<Utc>,
    pub duration_min: i32,
    pub notes: Option<String>,
}

/// Who is booking and through which channel.
#[derive(Debug, Clone)]
pub struct BookingContext {
    pub privileged: bool,
    pub actor_id: Option<Uuid>,
    pub source: AppointmentSource,
}

impl BookingContext {
    pub fn direct(privileged: bool, actor_id: Option<Uuid>) -> Self {
        Self {
            privileged,
            actor_id,
            source: AppointmentSource::Direct,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_start_at: DateTime<Utc>,
    pub new_duration_min: Option<i32>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub status: AppointmentStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub vet_id: Option<Uuid>,
    pub room_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub pet_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl AppointmentSearchQuery {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.vet_id.map_or(true, |id| appointment.vet_id == id)
            && self.room_id.map_or(true, |id| appointment.room_id == Some(id))
            && self.owner_id.map_or(true, |id| appointment.owner_id == id)
            && self.pet_id.map_or(true, |id| appointment.pet_id == id)
            && self.status.map_or(true, |status| appointment.status == status)
            && self.from.map_or(true, |from| appointment.end_at() > from)
            && self.to.map_or(true, |to| appointment.start_at < to)
    }
}

/// Limits applied to every booking and reschedule.
#[derive(Debug, Clone)]
pub struct AppointmentValidationRules {
    pub min_duration_min: i32,
    pub max_duration_min: i32,
    pub max_notes_len: usize,
}

impl Default for AppointmentValidationRules {
    fn default() -> Self {
        Self {
            min_duration_min: 1,
            max_duration_min: MAX_APPOINTMENT_DURATION_MIN,
            max_notes_len: 2000,
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment {0} not found")]
    NotFound(Uuid),

    #[error("Scheduling conflict: {} conflicting item(s)", .0.len())]
    SchedulingConflict(Vec<ConflictReason>),

    #[error("Cannot move appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource busy: {0}")]
    ResourceBusy(String),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<AppointmentError> for AppError {
    fn from(error: AppointmentError) -> Self {
        match error {
            AppointmentError::NotFound(_) => AppError::NotFound(error.to_string()),
            AppointmentError::SchedulingConflict(ref conflicts) => AppError::SchedulingConflict {
                message: error.to_string(),
                conflicts: json!(conflicts),
            },
            AppointmentError::InvalidTransition { .. } => AppError::InvalidTransition(error.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::ResourceBusy(msg) => AppError::ResourceBusy(msg),
            AppointmentError::Schedule(inner) => inner.into(),
            AppointmentError::Storage(msg) => AppError::Internal(msg),
        }
    }
}
