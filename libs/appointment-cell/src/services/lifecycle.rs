// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus, AppointmentValidationRules};

/// The appointment state machine and the per-request rules around it.
pub struct AppointmentLifecycleService {
    rules: AppointmentValidationRules,
}

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self::with_rules(AppointmentValidationRules::default())
    }

    pub fn with_rules(rules: AppointmentValidationRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &AppointmentValidationRules {
        &self.rules
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::InProgress,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::InProgress => vec![AppointmentStatus::Completed],
            // Terminal states
            AppointmentStatus::Completed
            | AppointmentStatus::Cancelled
            | AppointmentStatus::NoShow => vec![],
        }
    }

    /// Cancelled and NoShow need a non-empty reason. Returns the trimmed reason.
    pub fn validate_reason(
        &self,
        new_status: AppointmentStatus,
        reason: Option<String>,
    ) -> Result<Option<String>, AppointmentError> {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        let requires_reason = matches!(
            new_status,
            AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        );
        if requires_reason && reason.is_none() {
            return Err(AppointmentError::ValidationError(format!(
                "A reason is required to mark an appointment {}",
                new_status
            )));
        }

        Ok(reason)
    }

    /// Only appointments that have not started can move.
    pub fn can_reschedule(&self, current_status: AppointmentStatus) -> Result<(), AppointmentError> {
        match current_status {
            AppointmentStatus::Pending | AppointmentStatus::Confirmed => Ok(()),
            other => Err(AppointmentError::ValidationError(format!(
                "Cannot reschedule an appointment that is {}",
                other
            ))),
        }
    }

    pub fn validate_duration(&self, duration_min: i32) -> Result<(), AppointmentError> {
        if duration_min < self.rules.min_duration_min {
            return Err(AppointmentError::ValidationError(
                "Duration must be a positive number of minutes".to_string(),
            ));
        }
        if duration_min > self.rules.max_duration_min {
            return Err(AppointmentError::ValidationError(format!(
                "Duration cannot exceed {} minutes",
                self.rules.max_duration_min
            )));
        }
        Ok(())
    }

    pub fn validate_notes(&self, notes: Option<String>) -> Result<Option<String>, AppointmentError> {
        let notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        if notes.as_ref().is_some_and(|n| n.chars().count() > self.rules.max_notes_len) {
            return Err(AppointmentError::ValidationError(format!(
                "Notes cannot exceed {} characters",
                self.rules.max_notes_len
            )));
        }
        Ok(notes)
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const ALL: [AppointmentStatus; 6] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::InProgress,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
    ];

    #[test]
    fn test_happy_path_is_allowed() {
        let lifecycle = AppointmentLifecycleService::new();
        assert!(lifecycle
            .validate_status_transition(AppointmentStatus::Pending, AppointmentStatus::Confirmed)
            .is_ok());
        assert!(lifecycle
            .validate_status_transition(AppointmentStatus::Confirmed, AppointmentStatus::InProgress)
            .is_ok());
        assert!(lifecycle
            .validate_status_transition(AppointmentStatus::InProgress, AppointmentStatus::Completed)
            .is_ok());
    }

    #[test]
    fn test_completed_from_pending_is_rejected() {
        let lifecycle = AppointmentLifecycleService::new();
        assert_matches!(
            lifecycle.validate_status_transition(AppointmentStatus::Pending, AppointmentStatus::Completed),
            Err(AppointmentError::InvalidTransition {
                from: AppointmentStatus::Pending,
                to: AppointmentStatus::Completed
            })
        );
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        let lifecycle = AppointmentLifecycleService::new();
        for from in ALL.iter().copied().filter(|s| s.is_terminal()) {
            assert!(lifecycle.get_valid_transitions(from).is_empty());
            for to in ALL {
                assert!(lifecycle.validate_status_transition(from, to).is_err());
            }
        }
    }

    #[test]
    fn test_in_progress_cannot_be_cancelled() {
        let lifecycle = AppointmentLifecycleService::new();
        assert!(lifecycle
            .validate_status_transition(AppointmentStatus::InProgress, AppointmentStatus::Cancelled)
            .is_err());
    }

    #[test]
    fn test_reason_rules() {
        let lifecycle = AppointmentLifecycleService::new();
        assert_matches!(
            lifecycle.validate_reason(AppointmentStatus::Cancelled, Some("   ".to_string())),
            Err(AppointmentError::ValidationError(_))
        );
        assert_matches!(
            lifecycle.validate_reason(AppointmentStatus::NoShow, None),
            Err(AppointmentError::ValidationError(_))
        );
        assert_eq!(
            lifecycle
                .validate_reason(AppointmentStatus::Cancelled, Some(" owner called ".to_string()))
                .unwrap(),
            Some("owner called".to_string())
        );
        assert_eq!(lifecycle.validate_reason(AppointmentStatus::Confirmed, None).unwrap(), None);
    }

    #[test]
    fn test_duration_rules() {
        let lifecycle = AppointmentLifecycleService::new();
        assert!(lifecycle.validate_duration(30).is_ok());
        assert!(lifecycle.validate_duration(0).is_err());
        assert!(lifecycle.validate_duration(-15).is_err());
        assert!(lifecycle.validate_duration(24 * 60 + 1).is_err());
    }

    #[test]
    fn test_reschedule_only_before_start() {
        let lifecycle = AppointmentLifecycleService::new();
        assert!(lifecycle.can_reschedule(AppointmentStatus::Pending).is_ok());
        assert!(lifecycle.can_reschedule(AppointmentStatus::Confirmed).is_ok());
        assert!(lifecycle.can_reschedule(AppointmentStatus::InProgress).is_err());
        assert!(lifecycle.can_reschedule(AppointmentStatus::Cancelled).is_err());
    }
}
