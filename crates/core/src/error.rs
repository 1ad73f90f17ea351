use chrono::NaiveDate;
use thiserror::Error;

use crate::entity::DutyId;

#[derive(Error, Debug)]
pub enum RotatorError {
    #[error("Invalid rotation rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("Member not found: {0}")]
    MemberNotFound(String),

    #[error("Assignment not found: {0}")]
    AssignmentNotFound(String),

    #[error("Duty not found: {0}")]
    DutyNotFound(DutyId),

    #[error("Roster is empty; nobody to rotate duty {0} to")]
    EmptyRoster(DutyId),

    #[error("Working-day oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Rotation stalled for duty {duty_id} after {iterations} iteration(s)")]
    RotationStalled { duty_id: DutyId, iterations: usize },

    #[error("Invalid window: start {start} is after end {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Notification delivery failed: {0}")]
    Notify(String),
}

impl RotatorError {
    pub fn invalid_rule(rule: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            rule: rule.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the next trigger tick may succeed without operator action.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::OracleUnavailable(_) | Self::Storage(_) | Self::Notify(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RotatorError>;
