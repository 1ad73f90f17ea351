//! Cron-driven trigger for the advancement pass and the daily digest.
//!
//! Both jobs fire on cron expressions evaluated in the configured UTC
//! offset (midnight and 10:00 by default). Each tick computes `today` in
//! that offset and runs one pass; a failed pass is only logged, the next
//! tick retries.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use cron::Schedule;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use rotator_core::RotatorError;
use rotator_rotation::DutyPassResult;

use crate::digest;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Job {
    Advance,
    Digest,
}

impl Job {
    fn name(self) -> &'static str {
        match self {
            Job::Advance => "advance",
            Job::Digest => "digest",
        }
    }
}

/// Parse a cron expression, auto-prepending "0 " for 5-field expressions.
///
/// The `cron` crate requires 6 fields (sec min hr dom mon dow).
pub fn parse_cron(expr: &str) -> Result<Schedule, cron::error::Error> {
    let parts: Vec<&str> = expr.split_whitespace().collect();
    if parts.len() == 5 {
        Schedule::from_str(&format!("0 {}", expr))
    } else {
        Schedule::from_str(expr)
    }
}

/// Fixed offset for `minutes` east of UTC; out-of-range values fall back to UTC.
pub fn local_offset(minutes: i32) -> FixedOffset {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}

pub fn local_today(offset_minutes: i32, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&local_offset(offset_minutes)).date_naive()
}

/// Next fire time strictly after `now`, in the scheduling offset.
pub fn next_fire(schedule: &Schedule, offset: FixedOffset, now: DateTime<Utc>) -> Option<DateTime<FixedOffset>> {
    schedule.after(&now.with_timezone(&offset)).next()
}

/// Run one advancement pass over every duty.
///
/// Passes are serialized through the state's pass lock, so the cron tick and
/// a manual trigger never advance the same duty concurrently.
pub async fn advance_pass(
    state: &AppState,
    pool: &PgPool,
    today: NaiveDate,
) -> Result<Vec<DutyPassResult>, RotatorError> {
    let _guard = state.pass_lock.lock().await;
    state.advancer(pool).advance_all(today).await
}

/// Spawn the cron jobs. Returns no handles when the scheduler is disabled,
/// PostgreSQL is not configured, or a cron expression is invalid.
pub fn spawn(state: Arc<AppState>) -> Vec<JoinHandle<()>> {
    let sched = &state.config.scheduler;
    if !sched.enabled {
        info!("scheduler disabled");
        return Vec::new();
    }
    if state.pg_pool.is_none() {
        warn!("scheduler not started: PostgreSQL not configured");
        return Vec::new();
    }

    let mut handles = Vec::new();
    for (job, expr) in [
        (Job::Advance, sched.advance_cron.clone()),
        (Job::Digest, sched.digest_cron.clone()),
    ] {
        match parse_cron(&expr) {
            Ok(schedule) => {
                info!(job = job.name(), cron = %expr, "scheduler job registered");
                handles.push(tokio::spawn(run_job(state.clone(), job, schedule)));
            }
            Err(e) => {
                error!(job = job.name(), cron = %expr, error = %e, "invalid cron expression, job disabled");
            }
        }
    }
    handles
}

async fn run_job(state: Arc<AppState>, job: Job, schedule: Schedule) {
    let offset = local_offset(state.config.scheduler.utc_offset_minutes);

    loop {
        let now = Utc::now();
        let Some(next) = next_fire(&schedule, offset, now) else {
            warn!(job = job.name(), "cron schedule has no upcoming fire time, job stopped");
            return;
        };
        let wait = (next.with_timezone(&Utc) - now)
            .to_std()
            .unwrap_or(Duration::ZERO);
        tokio::time::sleep(wait).await;

        let Some(pool) = state.pg_pool.as_ref() else {
            return;
        };
        let today = next.date_naive();
        info!(job = job.name(), %today, "scheduler tick");

        match job {
            Job::Advance => match advance_pass(&state, pool, today).await {
                Ok(results) => {
                    let failed = results.iter().filter(|r| !r.is_success()).count();
                    info!(duties = results.len(), failed, "scheduled advancement finished");
                }
                Err(e) => error!(error = %e, "scheduled advancement failed"),
            },
            Job::Digest => {
                if let Err(e) = digest::send(&state, pool, today).await {
                    error!(error = %e, "scheduled digest failed");
                }
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
