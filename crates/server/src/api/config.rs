//! Runtime configuration: redacted summary and the team webhook override.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use rotator_notify::{Channel, Notifier, SlackWebhookNotifier};

use crate::state::{AppState, WebhookSource};
use crate::store::{ConfigStore, SLACK_WEBHOOK_URL_KEY};

use super::{bad_request, db_error, error, require_pg, ApiResult};

#[derive(Debug, Serialize)]
pub struct WebhookUrlResponse {
    pub webhook_url: Option<String>,
    pub source: WebhookSource,
}

#[derive(Debug, Deserialize)]
pub struct WebhookUrlRequest {
    pub webhook_url: String,
}

/// GET /api/config -- redacted configuration summary.
pub async fn config_summary(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(state.config.redacted_summary())
}

/// GET /api/config/webhook-url
pub async fn webhook_url_get(State(state): State<Arc<AppState>>) -> Json<WebhookUrlResponse> {
    let (url, source) = state.webhook.read().await.clone();
    Json(WebhookUrlResponse {
        webhook_url: url,
        source,
    })
}

/// PUT /api/config/webhook-url -- persist a new team webhook and switch the
/// digest channel to it immediately.
pub async fn webhook_url_put(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WebhookUrlRequest>,
) -> ApiResult<Json<WebhookUrlResponse>> {
    let url = req.webhook_url.trim().to_string();
    let notifier = SlackWebhookNotifier::named(&url, "slack-digest").map_err(|e| bad_request(e.to_string()))?;
    let pool = require_pg(&state)?;

    ConfigStore::set(pool, SLACK_WEBHOOK_URL_KEY, &url)
        .await
        .map_err(db_error)?;

    state
        .dispatcher
        .write()
        .await
        .set_channel(Channel::Digest, vec![Box::new(notifier)]);
    *state.webhook.write().await = (Some(url.clone()), WebhookSource::Database);
    info!("digest webhook updated");

    Ok(Json(WebhookUrlResponse {
        webhook_url: Some(url),
        source: WebhookSource::Database,
    }))
}

/// DELETE /api/config/webhook-url -- drop the override and fall back to the
/// environment webhook, if any.
pub async fn webhook_url_delete(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<WebhookUrlResponse>> {
    let pool = require_pg(&state)?;
    ConfigStore::delete(pool, SLACK_WEBHOOK_URL_KEY)
        .await
        .map_err(db_error)?;

    let (url, source) = match &state.config.slack.webhook_url {
        Some(url) => (Some(url.clone()), WebhookSource::Environment),
        None => (None, WebhookSource::None),
    };

    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();
    if let Some(url) = &url {
        let notifier =
            SlackWebhookNotifier::named(url, "slack-digest").map_err(|e| bad_request(e.to_string()))?;
        notifiers.push(Box::new(notifier));
    }
    state.dispatcher.write().await.set_channel(Channel::Digest, notifiers);
    *state.webhook.write().await = (url.clone(), source);
    info!(?source, "digest webhook override removed");

    Ok(Json(WebhookUrlResponse {
        webhook_url: url,
        source,
    }))
}

/// POST /api/config/webhook-url/test -- send a test message to the team channel.
pub async fn webhook_url_test(State(state): State<Arc<AppState>>) -> ApiResult<StatusCode> {
    state
        .dispatcher
        .read()
        .await
        .test_notify(Channel::Digest)
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(|e| error(StatusCode::BAD_GATEWAY, e.to_string()))
}
