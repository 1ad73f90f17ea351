//! Daily digest: who holds which duty today, plus announced upcoming holders.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};

use rotator_core::{DutyId, Member, MemberId, RotatorError};
use rotator_notify::{Channel, DigestContext, DigestItem, DispatchResult, LookaheadHolder, Notification, NotifyError};
use rotator_rotation::Roster;

use crate::db::storage_error;
use crate::state::AppState;
use crate::store::{AssignmentView, MemberStore, PgAssignmentStore};

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error(transparent)]
    Rotation(#[from] RotatorError),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

#[derive(Debug, Serialize)]
pub struct DigestReport {
    pub today: NaiveDate,
    pub text: String,
    /// Whether at least one digest notifier accepted the message.
    pub delivered: bool,
    pub results: Vec<DispatchResult>,
}

/// One digest line per assignment, in assignment-id order.
///
/// A duty with `digest_lookahead = k` also lists the next `k` holders in
/// roster order.
pub fn build_items(views: &[AssignmentView], members: &[Member]) -> Vec<DigestItem> {
    views
        .iter()
        .map(|view| DigestItem {
            duty: view.duty_name.clone(),
            handle: view.handle.clone(),
            notify_id: view.notify_id.clone(),
            start_date: view.start_date.to_string(),
            end_date: view.end_date.to_string(),
            lookahead: lookahead(view, members),
        })
        .collect()
}

fn lookahead(view: &AssignmentView, members: &[Member]) -> Vec<LookaheadHolder> {
    let count = usize::try_from(view.digest_lookahead).unwrap_or(0);
    if count == 0 {
        return Vec::new();
    }

    let roster = match Roster::new(DutyId(view.duty_id), members.to_vec()) {
        Ok(r) => r,
        Err(e) => {
            warn!(duty_id = view.duty_id, error = %e, "digest look-ahead skipped");
            return Vec::new();
        }
    };

    let mut upcoming = Vec::with_capacity(count);
    for offset in 1..=count {
        match roster.nth_after(MemberId(view.member_id), offset) {
            Ok(m) => upcoming.push(LookaheadHolder {
                offset,
                handle: m.handle.clone(),
                notify_id: m.notify_id.clone(),
            }),
            Err(e) => {
                warn!(duty_id = view.duty_id, error = %e, "digest look-ahead skipped");
                return Vec::new();
            }
        }
    }
    upcoming
}

pub async fn compose(pool: &PgPool, today: NaiveDate) -> Result<DigestContext, DigestError> {
    let views = PgAssignmentStore::list_views(pool).await.map_err(storage_error)?;
    let members = MemberStore::list(pool).await.map_err(storage_error)?;
    Ok(DigestContext {
        today: today.to_string(),
        items: build_items(&views, &members),
    })
}

/// Render and post the digest to the digest channel.
pub async fn send(state: &AppState, pool: &PgPool, today: NaiveDate) -> Result<DigestReport, DigestError> {
    let ctx = compose(pool, today).await?;
    let text = state.digest.render(&ctx)?;

    if text.is_empty() {
        info!(%today, "no assignments, digest skipped");
        return Ok(DigestReport {
            today,
            text,
            delivered: false,
            results: Vec::new(),
        });
    }

    let notification = Notification::text(text.clone());
    let results = state
        .dispatcher
        .read()
        .await
        .dispatch(Channel::Digest, &notification)
        .await;
    let delivered = results.iter().any(|r| r.success);

    info!(%today, lines = ctx.items.len(), delivered, "digest sent");
    Ok(DigestReport {
        today,
        text,
        delivered,
        results,
    })
}
