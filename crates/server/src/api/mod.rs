//! HTTP API endpoint modules.
//!
//! Shared error types and helpers live here in mod.rs.

mod assignments;
mod config;
mod digest;
mod duties;
mod health;
mod members;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use rotator_core::RotatorError;

use crate::state::AppState;

// ── Shared types ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);
pub(crate) type ApiResult<T> = Result<T, ApiError>;

// ── Helpers ──────────────────────────────────────────────────────

pub(crate) fn error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: msg.into() }))
}

pub(crate) fn require_pg(state: &AppState) -> ApiResult<&sqlx::PgPool> {
    state
        .pg_pool
        .as_ref()
        .ok_or_else(|| error(StatusCode::SERVICE_UNAVAILABLE, "PostgreSQL not configured"))
}

pub(crate) fn bad_request(msg: impl Into<String>) -> ApiError {
    error(StatusCode::BAD_REQUEST, msg)
}

pub(crate) fn not_found(resource: &str, id: impl std::fmt::Display) -> ApiError {
    error(StatusCode::NOT_FOUND, format!("{} not found: {}", resource, id))
}

pub(crate) fn internal_error(e: impl std::fmt::Display) -> ApiError {
    error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Map a database error, turning constraint violations into 409.
pub(crate) fn db_error(e: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return error(StatusCode::CONFLICT, format!("already exists: {}", db.message()));
        }
        if db.is_foreign_key_violation() {
            return error(StatusCode::CONFLICT, format!("still referenced: {}", db.message()));
        }
    }
    internal_error(e)
}

/// Status for each rotation failure class.
pub(crate) fn rotation_status(e: &RotatorError) -> StatusCode {
    match e {
        RotatorError::InvalidRule { .. }
        | RotatorError::InvalidWindow { .. }
        | RotatorError::EmptyRoster(_) => StatusCode::BAD_REQUEST,
        RotatorError::MemberNotFound(_)
        | RotatorError::AssignmentNotFound(_)
        | RotatorError::DutyNotFound(_) => StatusCode::NOT_FOUND,
        RotatorError::OracleUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        RotatorError::Notify(_) => StatusCode::BAD_GATEWAY,
        RotatorError::RotationStalled { .. } | RotatorError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub(crate) fn rotation_error(e: RotatorError) -> ApiError {
    error(rotation_status(&e), e.to_string())
}

// ── Re-exports ───────────────────────────────────────────────────

pub use assignments::{assignments_advance, assignments_history, assignments_list, assignments_update};
pub use config::{config_summary, webhook_url_delete, webhook_url_get, webhook_url_put, webhook_url_test};
pub use digest::{digest_preview, digest_send};
pub use duties::{duties_create, duties_delete, duties_get, duties_list, duties_update};
pub use health::health;
pub use members::{members_create, members_delete, members_get, members_list, members_update};
