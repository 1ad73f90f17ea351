//! Dry-run forecast of a rotation, without a database.
//!
//! Seeds one duty in an [`InMemoryStore`] on `start`, then advances it day by
//! day up to `until`, recording every window the catch-up loop commits.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use rotator_core::{Duty, DutyId, Member, MemberId, Result, RotatorError};
use rotator_rotation::{FailureSink, InMemoryStore, RotationAdvancer, RotationRule, WorkingDayOracle};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForecastRow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub handle: String,
}

struct LogSink;

#[async_trait::async_trait]
impl FailureSink for LogSink {
    async fn notify(&self, message: &str) -> Result<()> {
        warn!(alert = %message, "simulated failure report");
        Ok(())
    }
}

pub async fn forecast(
    rule: &str,
    handles: &[String],
    start: NaiveDate,
    until: NaiveDate,
    oracle: Arc<dyn WorkingDayOracle>,
) -> Result<Vec<ForecastRow>> {
    if start > until {
        return Err(RotatorError::InvalidWindow { start, end: until });
    }
    let rule: RotationRule = rule.parse()?;

    let store = Arc::new(InMemoryStore::new());
    store.insert_duty(Duty {
        id: DutyId(1),
        name: "simulation".to_string(),
        description: String::new(),
        rotation_rule: rule.to_string(),
        digest_lookahead: 0,
    })?;
    for (i, handle) in handles.iter().enumerate() {
        store.insert_member(Member {
            id: MemberId(i as i64 + 1),
            handle: handle.clone(),
            notify_id: String::new(),
        })?;
    }

    let advancer = RotationAdvancer::new(store.clone(), oracle, Arc::new(LogSink));
    let handle_of = |id: MemberId| -> Result<String> {
        store
            .member(id)?
            .map(|m| m.handle)
            .ok_or_else(|| RotatorError::MemberNotFound(format!("id {id}")))
    };

    let mut rows = Vec::new();
    let mut day = start;
    let mut last_start = None;
    while day <= until {
        let outcome = advancer.advance(DutyId(1), day).await?;
        let a = outcome.assignment;
        if last_start != Some(a.start_date) {
            rows.push(ForecastRow {
                start_date: a.start_date,
                end_date: a.end_date,
                handle: handle_of(a.member_id)?,
            });
            last_start = Some(a.start_date);
        }
        let Some(next) = day.succ_opt() else { break };
        day = next;
    }
    Ok(rows)
}
