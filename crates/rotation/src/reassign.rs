//! Manual override of an assignment's holder and window.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use rotator_core::{Assignment, AssignmentId, Result, RotatorError};

use crate::ports::{AssignmentStore, ChangeKind};

/// Force-sets an assignment, bypassing the rotation cadence entirely.
pub struct ManualReassigner {
    store: Arc<dyn AssignmentStore>,
}

impl ManualReassigner {
    pub fn new(store: Arc<dyn AssignmentStore>) -> Self {
        Self { store }
    }

    /// Hand assignment `id` to the member with `handle` for `[start, end]`.
    ///
    /// The catch-up loop is not run; a window that already ended stays as
    /// given until the next advancement pass.
    pub async fn reassign(
        &self,
        id: AssignmentId,
        handle: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Assignment> {
        if start > end {
            return Err(RotatorError::InvalidWindow { start, end });
        }

        let mut assignment = self
            .store
            .load_assignment(id)
            .await?
            .ok_or_else(|| RotatorError::AssignmentNotFound(format!("id {id}")))?;

        let member = self
            .store
            .find_member_by_handle(handle)
            .await?
            .ok_or_else(|| RotatorError::MemberNotFound(format!("handle '{handle}'")))?;

        assignment.member_id = member.id;
        assignment.start_date = start;
        assignment.end_date = end;

        self.store.save(&assignment, ChangeKind::Manual).await?;

        info!(
            assignment_id = %id,
            member_id = %member.id,
            %start,
            %end,
            "assignment manually reassigned"
        );

        Ok(assignment)
    }
}
