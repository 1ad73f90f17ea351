//! Catch-up loop that brings a stale assignment window up to date.
//!
//! When the trigger has not run for a while, a single call walks the window
//! forward one period at a time until it covers `today`, rotating the holder
//! once per period. Daily duties keep advancing the window across
//! non-working days but defer the member handoff until a working day.
//!
//! All work happens on a private copy of the assignment and is committed with
//! one store write after the loop finishes, so a failure part-way through
//! leaves the persisted state untouched.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use rotator_core::{Assignment, DutyId, Result, RotatorError, WindowState};

use crate::ports::{AssignmentStore, ChangeKind, FailureSink, WorkingDayOracle};
use crate::roster::Roster;
use crate::rule::RotationRule;
use crate::window::{initial_window, next_window};

/// Default ceiling on catch-up iterations for one duty.
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

/// What the catch-up loop did to a working copy of an assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatchUpReport {
    /// Window advances performed.
    pub iterations: usize,
    /// Member handoffs performed (`iterations` minus skipped days).
    pub rotations: usize,
    /// Window starts on which the handoff was deferred.
    pub skipped_days: Vec<NaiveDate>,
}

/// Advance `assignment` in place until its window covers `today`.
///
/// `roster` is only consulted when a handoff is due. Fails with
/// [`RotatorError::RotationStalled`] if the window stops moving forward or
/// `max_iterations` is exceeded.
pub async fn catch_up(
    rule: RotationRule,
    assignment: &mut Assignment,
    roster: &Roster,
    oracle: &dyn WorkingDayOracle,
    today: NaiveDate,
    max_iterations: usize,
) -> Result<CatchUpReport> {
    let mut report = CatchUpReport::default();

    while assignment.is_stale(today) {
        if report.iterations >= max_iterations {
            return Err(RotatorError::RotationStalled {
                duty_id: assignment.duty_id,
                iterations: report.iterations,
            });
        }

        let next = next_window(rule, assignment.start_date);
        if next.start <= assignment.start_date {
            return Err(RotatorError::RotationStalled {
                duty_id: assignment.duty_id,
                iterations: report.iterations,
            });
        }
        assignment.start_date = next.start;
        assignment.end_date = next.end;
        report.iterations += 1;

        if rule.skips_non_working_days() && !oracle.is_working_day(next.start).await? {
            info!(
                date = %next.start,
                assignment_id = %assignment.id,
                "not a working day, deferring member rotation"
            );
            report.skipped_days.push(next.start);
            continue;
        }

        assignment.member_id = roster.next_after(assignment.member_id)?.id;
        report.rotations += 1;
    }

    Ok(report)
}

/// How a single duty's pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceStatus {
    /// The window already covered today; nothing was written.
    Unchanged,
    /// The window rolled over at least once and was committed.
    Advanced,
    /// The duty had no assignment; a first one was created.
    Seeded,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdvanceOutcome {
    pub duty_id: DutyId,
    pub status: AdvanceStatus,
    #[serde(flatten)]
    pub report: CatchUpReport,
    pub assignment: Assignment,
}

/// Per-duty line of an [`RotationAdvancer::advance_all`] pass.
#[derive(Debug, Clone, Serialize)]
pub struct DutyPassResult {
    pub duty_id: DutyId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<AdvanceOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DutyPassResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Drives the catch-up loop against the store, oracle and failure sink.
pub struct RotationAdvancer {
    store: Arc<dyn AssignmentStore>,
    oracle: Arc<dyn WorkingDayOracle>,
    alerts: Arc<dyn FailureSink>,
    max_iterations: usize,
}

impl RotationAdvancer {
    pub fn new(
        store: Arc<dyn AssignmentStore>,
        oracle: Arc<dyn WorkingDayOracle>,
        alerts: Arc<dyn FailureSink>,
    ) -> Self {
        Self {
            store,
            oracle,
            alerts,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Bring one duty up to date for `today`.
    ///
    /// Errors are reported to the failure sink before being returned; the
    /// stored assignment is left at its last committed window.
    pub async fn advance(&self, duty_id: DutyId, today: NaiveDate) -> Result<AdvanceOutcome> {
        let span = info_span!(
            "advance",
            duty_id = %duty_id,
            %today,
            correlation_id = %Uuid::new_v4()
        );

        async {
            match self.try_advance(duty_id, today).await {
                Ok(outcome) => Ok(outcome),
                Err(e) => {
                    error!(error = %e, "rotation update failed");
                    self.report_failure(&e).await;
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Advance every duty independently. One duty failing never stops the
    /// others; only listing the duties themselves can fail the whole pass.
    pub async fn advance_all(&self, today: NaiveDate) -> Result<Vec<DutyPassResult>> {
        let duty_ids = self.store.list_duties().await?;
        info!(duties = duty_ids.len(), %today, "starting rotation pass");

        let passes = duty_ids.into_iter().map(|duty_id| async move {
            match self.advance(duty_id, today).await {
                Ok(outcome) => DutyPassResult {
                    duty_id,
                    outcome: Some(outcome),
                    error: None,
                },
                Err(e) => DutyPassResult {
                    duty_id,
                    outcome: None,
                    error: Some(e.to_string()),
                },
            }
        });
        let results = futures::future::join_all(passes).await;

        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(total = results.len(), failed, "rotation pass finished");
        Ok(results)
    }

    async fn try_advance(&self, duty_id: DutyId, today: NaiveDate) -> Result<AdvanceOutcome> {
        let snapshot = self.store.load(duty_id).await?;

        let Some(stored) = snapshot.assignment else {
            let roster = Roster::new(duty_id, snapshot.members)?;
            let window = initial_window(snapshot.rule, today);
            let assignment = self.store.seed(duty_id, roster.first().id, window).await?;
            info!(
                assignment_id = %assignment.id,
                member_id = %assignment.member_id,
                start = %window.start,
                end = %window.end,
                "seeded first assignment"
            );
            return Ok(AdvanceOutcome {
                duty_id,
                status: AdvanceStatus::Seeded,
                report: CatchUpReport::default(),
                assignment,
            });
        };

        if stored.state(today) != WindowState::Stale {
            debug!(
                assignment_id = %stored.id,
                end = %stored.end_date,
                "no rotation needed"
            );
            return Ok(AdvanceOutcome {
                duty_id,
                status: AdvanceStatus::Unchanged,
                report: CatchUpReport::default(),
                assignment: stored,
            });
        }

        let roster = Roster::new(duty_id, snapshot.members)?;
        let mut working = stored.clone();
        let report = catch_up(
            snapshot.rule,
            &mut working,
            &roster,
            self.oracle.as_ref(),
            today,
            self.max_iterations,
        )
        .await?;

        self.store.save(&working, ChangeKind::Rotation).await?;
        info!(
            assignment_id = %working.id,
            iterations = report.iterations,
            rotations = report.rotations,
            member_id = %working.member_id,
            start = %working.start_date,
            end = %working.end_date,
            "assignment advanced"
        );

        Ok(AdvanceOutcome {
            duty_id,
            status: AdvanceStatus::Advanced,
            report,
            assignment: working,
        })
    }

    async fn report_failure(&self, e: &RotatorError) {
        let message = format!("Failed to update task assignment: {e}");
        if let Err(notify_err) = self.alerts.notify(&message).await {
            warn!(error = %notify_err, "failed to deliver rotation failure alert");
        }
    }
}
