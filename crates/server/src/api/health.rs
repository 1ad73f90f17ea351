use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use rotator_notify::Channel;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: bool,
    pub scheduler: bool,
    pub digest_channel: bool,
    pub alert_channel: bool,
    pub today: String,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let dispatcher = state.dispatcher.read().await;
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        database: state.pg_pool.is_some(),
        scheduler: state.config.scheduler.enabled && state.pg_pool.is_some(),
        digest_channel: dispatcher.is_configured(Channel::Digest),
        alert_channel: dispatcher.is_configured(Channel::Alert),
        today: state.today().to_string(),
    })
}
