//! Roster CRUD endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use rotator_core::{Member, MemberId};

use crate::state::AppState;
use crate::store::{CreateMember, MemberStore, UpdateMember};

use super::{bad_request, db_error, not_found, require_pg, ApiResult};

fn validate_handle(handle: &str) -> ApiResult<()> {
    if handle.trim().is_empty() {
        return Err(bad_request("handle must not be empty"));
    }
    Ok(())
}

/// GET /api/members
pub async fn members_list(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Member>>> {
    let pool = require_pg(&state)?;
    MemberStore::list(pool).await.map(Json).map_err(db_error)
}

/// GET /api/members/{id}
pub async fn members_get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Member>> {
    let pool = require_pg(&state)?;
    MemberStore::get(pool, MemberId(id))
        .await
        .map_err(db_error)?
        .map(Json)
        .ok_or_else(|| not_found("Member", id))
}

/// POST /api/members
pub async fn members_create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMember>,
) -> ApiResult<(StatusCode, Json<Member>)> {
    validate_handle(&req.handle)?;
    let pool = require_pg(&state)?;
    let member = MemberStore::create(pool, req).await.map_err(db_error)?;
    info!(member_id = %member.id, handle = %member.handle, "member created");
    Ok((StatusCode::CREATED, Json(member)))
}

/// PUT /api/members/{id}
pub async fn members_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateMember>,
) -> ApiResult<Json<Member>> {
    if let Some(ref handle) = req.handle {
        validate_handle(handle)?;
    }
    let pool = require_pg(&state)?;
    MemberStore::update(pool, MemberId(id), req)
        .await
        .map_err(db_error)?
        .map(Json)
        .ok_or_else(|| not_found("Member", id))
}

/// DELETE /api/members/{id}. 409 while the member holds an assignment.
pub async fn members_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let pool = require_pg(&state)?;
    if MemberStore::delete(pool, MemberId(id)).await.map_err(db_error)? {
        info!(member_id = id, "member deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Member", id))
    }
}
