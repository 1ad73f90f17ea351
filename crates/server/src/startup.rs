//! Assembles shared state from configuration.

use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use rotator_calendar::{HolidayApiOracle, WeekendOracle};
use rotator_core::Config;
use rotator_notify::{Channel, DigestRenderer, Dispatcher, SlackWebhookNotifier};
use rotator_rotation::WorkingDayOracle;

use crate::state::{AppState, WebhookSource};
use crate::store::{ConfigStore, SLACK_WEBHOOK_URL_KEY};

pub fn build_oracle(config: &Config) -> anyhow::Result<Arc<dyn WorkingDayOracle>> {
    match HolidayApiOracle::from_config(&config.holiday)? {
        Some(oracle) => {
            info!(url = ?config.holiday.api_url, "holiday calendar enabled");
            Ok(Arc::new(oracle))
        }
        None => {
            info!("no holiday API configured, weekends are the only days off");
            Ok(Arc::new(WeekendOracle))
        }
    }
}

/// Team webhook: a database override wins over the environment.
async fn resolve_digest_webhook(config: &Config, pool: Option<&PgPool>) -> (Option<String>, WebhookSource) {
    if let Some(pool) = pool {
        match ConfigStore::get(pool, SLACK_WEBHOOK_URL_KEY).await {
            Ok(Some(url)) if !url.trim().is_empty() => return (Some(url), WebhookSource::Database),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "failed to read webhook override, using environment"),
        }
    }
    match &config.slack.webhook_url {
        Some(url) => (Some(url.clone()), WebhookSource::Environment),
        None => (None, WebhookSource::None),
    }
}

fn add_webhook(dispatcher: &mut Dispatcher, channel: Channel, url: &str, name: &str) {
    match SlackWebhookNotifier::named(url, name) {
        Ok(notifier) => {
            info!(%channel, "slack channel configured");
            dispatcher.add(channel, Box::new(notifier));
        }
        Err(e) => warn!(%channel, error = %e, "invalid webhook URL, channel disabled"),
    }
}

pub async fn build_state(config: Config, pg_pool: Option<PgPool>) -> anyhow::Result<AppState> {
    let oracle = build_oracle(&config)?;
    let digest = DigestRenderer::new(config.slack.digest_template.clone())?;

    let (digest_url, source) = resolve_digest_webhook(&config, pg_pool.as_ref()).await;
    let mut dispatcher = Dispatcher::empty();
    if let Some(url) = &digest_url {
        add_webhook(&mut dispatcher, Channel::Digest, url, "slack-digest");
    }
    if let Some(url) = &config.slack.alert_webhook_url {
        add_webhook(&mut dispatcher, Channel::Alert, url, "slack-alert");
    }

    Ok(AppState {
        config,
        pg_pool,
        oracle,
        dispatcher: Arc::new(RwLock::new(dispatcher)),
        digest,
        webhook: RwLock::new((digest_url, source)),
        pass_lock: Mutex::new(()),
    })
}
