//! Duty CRUD endpoints. Rotation rules are validated and stored in
//! canonical form, so a bad rule never reaches the advancement pass.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use rotator_core::{Duty, DutyId};
use rotator_rotation::RotationRule;

use crate::state::AppState;
use crate::store::{CreateDuty, DutyStore, UpdateDuty};

use super::{bad_request, db_error, not_found, require_pg, rotation_error, ApiResult};

fn canonical_rule(raw: &str) -> ApiResult<String> {
    raw.parse::<RotationRule>()
        .map(|rule| rule.to_string())
        .map_err(rotation_error)
}

/// GET /api/duties
pub async fn duties_list(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Duty>>> {
    let pool = require_pg(&state)?;
    DutyStore::list(pool).await.map(Json).map_err(db_error)
}

/// GET /api/duties/{id}
pub async fn duties_get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Duty>> {
    let pool = require_pg(&state)?;
    DutyStore::get(pool, DutyId(id))
        .await
        .map_err(db_error)?
        .map(Json)
        .ok_or_else(|| not_found("Duty", id))
}

/// POST /api/duties
pub async fn duties_create(
    State(state): State<Arc<AppState>>,
    Json(mut req): Json<CreateDuty>,
) -> ApiResult<(StatusCode, Json<Duty>)> {
    if req.name.trim().is_empty() {
        return Err(bad_request("name must not be empty"));
    }
    req.rotation_rule = canonical_rule(&req.rotation_rule)?;
    let pool = require_pg(&state)?;

    let duty = DutyStore::create(pool, req).await.map_err(db_error)?;
    info!(duty_id = %duty.id, rule = %duty.rotation_rule, "duty created");
    Ok((StatusCode::CREATED, Json(duty)))
}

/// PUT /api/duties/{id}. A changed rule applies from the next window on.
pub async fn duties_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(mut req): Json<UpdateDuty>,
) -> ApiResult<Json<Duty>> {
    if req.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(bad_request("name must not be empty"));
    }
    if let Some(raw) = req.rotation_rule.take() {
        req.rotation_rule = Some(canonical_rule(&raw)?);
    }
    let pool = require_pg(&state)?;

    DutyStore::update(pool, DutyId(id), req)
        .await
        .map_err(db_error)?
        .map(Json)
        .ok_or_else(|| not_found("Duty", id))
}

/// DELETE /api/duties/{id}. Removes the duty's assignment and history too.
pub async fn duties_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let pool = require_pg(&state)?;
    if DutyStore::delete(pool, DutyId(id)).await.map_err(db_error)? {
        info!(duty_id = id, "duty deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Duty", id))
    }
}
