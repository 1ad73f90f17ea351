use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::digest::{self, DigestError, DigestReport};
use crate::state::AppState;

use super::{bad_request, internal_error, require_pg, rotation_error, ApiError, ApiResult};

#[derive(Debug, Default, Deserialize)]
pub struct DigestRequest {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct DigestPreview {
    pub today: NaiveDate,
    pub text: String,
}

fn digest_error(e: DigestError) -> ApiError {
    match e {
        DigestError::Rotation(e) => rotation_error(e),
        DigestError::Notify(e) => internal_error(e),
    }
}

/// POST /api/digest/send -- post today's digest to the team channel.
pub async fn digest_send(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<DigestReport>)> {
    let pool = require_pg(&state)?;
    let req: DigestRequest = if body.iter().all(u8::is_ascii_whitespace) {
        DigestRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| bad_request(format!("invalid digest request: {e}")))?
    };
    let today = req.date.unwrap_or_else(|| state.today());

    let report = digest::send(&state, pool, today).await.map_err(digest_error)?;
    let status = if report.delivered || report.text.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    Ok((status, Json(report)))
}

/// GET /api/digest/preview -- render the digest without sending it.
pub async fn digest_preview(State(state): State<Arc<AppState>>) -> ApiResult<Json<DigestPreview>> {
    let pool = require_pg(&state)?;
    let today = state.today();
    let ctx = digest::compose(pool, today).await.map_err(digest_error)?;
    let text = state
        .digest
        .render(&ctx)
        .map_err(|e| digest_error(e.into()))?;
    Ok(Json(DigestPreview { today, text }))
}
