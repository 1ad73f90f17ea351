//! Collaborator traits the rotation core is driven through.
//!
//! The core never talks to a database, calendar service or chat webhook
//! directly; the server wires concrete implementations behind these traits.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use rotator_core::{Assignment, AssignmentId, Duty, DutyId, Member, MemberId, Result};

use crate::rule::RotationRule;
use crate::window::Window;

/// Everything needed to advance one duty, loaded in a single read.
#[derive(Debug, Clone)]
pub struct DutySnapshot {
    pub duty: Duty,
    /// `duty.rotation_rule`, already validated.
    pub rule: RotationRule,
    /// `None` until the duty has been seeded.
    pub assignment: Option<Assignment>,
    /// Full roster; order is not significant.
    pub members: Vec<Member>,
}

/// Why an assignment row changed, recorded alongside each commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Seed,
    Rotation,
    Manual,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Rotation => "rotation",
            Self::Manual => "manual",
        }
    }
}

/// Answers whether a calendar day is a working day.
#[async_trait::async_trait]
pub trait WorkingDayOracle: Send + Sync {
    /// Errors must surface as [`rotator_core::RotatorError::OracleUnavailable`];
    /// there is no fallback answer.
    async fn is_working_day(&self, date: NaiveDate) -> Result<bool>;
}

/// Loads and persists rotation state.
#[async_trait::async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Ids of every duty that takes part in rotation.
    async fn list_duties(&self) -> Result<Vec<DutyId>>;

    /// Load a duty with its rule, live assignment and the roster.
    ///
    /// Fails with `DutyNotFound` for unknown ids and `InvalidRule` when the
    /// stored rule string does not parse.
    async fn load(&self, duty_id: DutyId) -> Result<DutySnapshot>;

    /// Overwrite the live assignment in one write.
    async fn save(&self, assignment: &Assignment, kind: ChangeKind) -> Result<()>;

    /// Create the first assignment of a duty.
    async fn seed(&self, duty_id: DutyId, member_id: MemberId, window: Window) -> Result<Assignment>;

    async fn load_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>>;

    async fn find_member_by_handle(&self, handle: &str) -> Result<Option<Member>>;
}

/// Fire-and-forget sink for rotation failure reports.
#[async_trait::async_trait]
pub trait FailureSink: Send + Sync {
    async fn notify(&self, message: &str) -> Result<()>;
}
