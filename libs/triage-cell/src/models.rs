use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use appointment_cell::models::{AppointmentError, AppointmentType};
use schedule_cell::models::ScheduleError;
use shared_models::error::AppError;

// ==============================================================================
// DIGITAL REQUEST MODELS
// ==============================================================================

/// An externally submitted appointment ask. It becomes a ledger appointment
/// only through confirmation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DigitalRequest {
    pub id: Uuid,
    pub requested_at: DateTime<Utc>,
    pub pet_id: Uuid,
    pub requester_id: Uuid,
    pub preferred_vet_id: Option<Uuid>,
    pub preferred_room_id: Option<Uuid>,
    pub requested_start_at: DateTime<Utc>,
    pub estimated_duration_min: i32,
    pub appointment_type: AppointmentType,
    pub notes: Option<String>,
    pub status: RequestStatus,
    pub reviewed_by: Option<Uuid>,
    pub rejection_reason: Option<String>,
    pub cancellation_reason: Option<String>,
    pub linked_appointment_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    InReview,
    Confirmed,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Confirmed | RequestStatus::Rejected | RequestStatus::Cancelled
        )
    }

    pub fn allowed_transitions(&self) -> &'static [RequestStatus] {
        match self {
            RequestStatus::Pending => &[
                RequestStatus::InReview,
                RequestStatus::Rejected,
                RequestStatus::Cancelled,
            ],
            RequestStatus::InReview => &[
                RequestStatus::Confirmed,
                RequestStatus::Rejected,
                RequestStatus::Cancelled,
            ],
            RequestStatus::Confirmed | RequestStatus::Rejected | RequestStatus::Cancelled => &[],
        }
    }

    pub fn ensure_can_move_to(&self, target: RequestStatus) -> Result<(), TriageError> {
        if self.allowed_transitions().contains(&target) {
            Ok(())
        } else {
            Err(TriageError::InvalidTransition { from: *self, to: target })
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "pending"),
            RequestStatus::InReview => write!(f, "in_review"),
            RequestStatus::Confirmed => write!(f, "confirmed"),
            RequestStatus::Rejected => write!(f, "rejected"),
            RequestStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitDigitalRequest {
    pub pet_id: Uuid,
    pub requester_id: Uuid,
    pub preferred_vet_id: Option<Uuid>,
    pub preferred_room_id: Option<Uuid>,
    pub requested_start_at: DateTime<Utc>,
    pub estimated_duration_min: i32,
    #[serde(default)]
    pub appointment_type: AppointmentType,
    pub notes: Option<String>,
}

/// Staff decision on where and when the request is booked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmDigitalRequest {
    pub vet_id: Uuid,
    pub room_id: Option<Uuid>,
    pub start_at: DateTime<Utc>,
    pub duration_min: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectDigitalRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelDigitalRequest {
    pub reason: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TriageError {
    #[error("Digital request {0} not found")]
    NotFound(Uuid),

    #[error("Cannot move digital request from {from} to {to}")]
    InvalidTransition { from: RequestStatus, to: RequestStatus },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource busy: {0}")]
    ResourceBusy(String),

    #[error(transparent)]
    Booking(#[from] AppointmentError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<TriageError> for AppError {
    fn from(error: TriageError) -> Self {
        match error {
            TriageError::NotFound(_) => AppError::NotFound(error.to_string()),
            TriageError::InvalidTransition { .. } => AppError::InvalidTransition(error.to_string()),
            TriageError::ValidationError(msg) => AppError::ValidationError(msg),
            TriageError::ResourceBusy(msg) => AppError::ResourceBusy(msg),
            TriageError::Booking(inner) => inner.into(),
            TriageError::Schedule(inner) => inner.into(),
            TriageError::Storage(msg) => AppError::Internal(msg),
        }
    }
}
