//! Assignment listing, manual reassignment, history and advancement.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use rotator_core::{Assignment, AssignmentId, DutyId, WindowState};
use rotator_rotation::{AdvanceOutcome, DutyPassResult};

use crate::scheduler::advance_pass;
use crate::state::AppState;
use crate::store::{AssignmentView, HistoryEntry, PgAssignmentStore};

use super::{bad_request, db_error, require_pg, rotation_error, ApiResult};

// ── Types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AssignmentListItem {
    #[serde(flatten)]
    pub assignment: AssignmentView,
    pub state: WindowState,
}

#[derive(Debug, Deserialize)]
pub struct ReassignRequest {
    pub handle: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdvanceRequest {
    /// Defaults to today in the scheduling offset.
    pub date: Option<NaiveDate>,
    /// Advance a single duty instead of all of them.
    pub duty_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AdvanceResponse {
    Single(AdvanceOutcome),
    All { date: NaiveDate, results: Vec<DutyPassResult> },
}

const DEFAULT_HISTORY_LIMIT: i64 = 50;
const MAX_HISTORY_LIMIT: i64 = 500;

// ── Handlers ─────────────────────────────────────────────────────

/// GET /api/assignments -- every assignment with duty and holder.
pub async fn assignments_list(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<AssignmentListItem>>> {
    let pool = require_pg(&state)?;
    let today = state.today();
    let views = PgAssignmentStore::list_views(pool).await.map_err(db_error)?;
    Ok(Json(
        views
            .into_iter()
            .map(|assignment| AssignmentListItem {
                state: assignment.state(today),
                assignment,
            })
            .collect(),
    ))
}

/// PUT /api/assignments/{id} -- manual reassignment.
///
/// Waits for any running advancement pass, so the pass cannot commit a
/// window loaded before the override.
pub async fn assignments_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ReassignRequest>,
) -> ApiResult<Json<Assignment>> {
    let _guard = state.pass_lock.lock().await;
    let pool = require_pg(&state)?;
    state
        .reassigner(pool)
        .reassign(AssignmentId(id), req.handle.trim(), req.start_date, req.end_date)
        .await
        .map(Json)
        .map_err(rotation_error)
}

/// GET /api/assignments/{id}/history -- committed window changes, newest first.
pub async fn assignments_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(q): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<HistoryEntry>>> {
    let pool = require_pg(&state)?;
    let limit = q
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    PgAssignmentStore::history(pool, AssignmentId(id), limit)
        .await
        .map(Json)
        .map_err(db_error)
}

/// POST /api/assignments/advance -- run the catch-up pass now. The JSON body
/// is optional.
pub async fn assignments_advance(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<AdvanceResponse>> {
    let pool = require_pg(&state)?;
    let req: AdvanceRequest = if body.iter().all(u8::is_ascii_whitespace) {
        AdvanceRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| bad_request(format!("invalid advance request: {e}")))?
    };
    let date = req.date.unwrap_or_else(|| state.today());

    match req.duty_id {
        Some(duty_id) => {
            let _guard = state.pass_lock.lock().await;
            state
                .advancer(pool)
                .advance(DutyId(duty_id), date)
                .await
                .map(|outcome| Json(AdvanceResponse::Single(outcome)))
                .map_err(rotation_error)
        }
        None => advance_pass(&state, pool, date)
            .await
            .map(|results| Json(AdvanceResponse::All { date, results }))
            .map_err(rotation_error),
    }
}
