use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::PgPool;
use tokio::sync::{Mutex, RwLock};

use rotator_core::Config;
use rotator_notify::{DigestRenderer, Dispatcher};
use rotator_rotation::{ManualReassigner, RotationAdvancer, WorkingDayOracle};

use crate::alerts::DispatchAlerts;
use crate::scheduler::local_today;
use crate::store::PgAssignmentStore;

/// Where the digest webhook currently in use came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookSource {
    Database,
    Environment,
    None,
}

pub struct AppState {
    pub config: Config,
    pub pg_pool: Option<PgPool>,
    pub oracle: Arc<dyn WorkingDayOracle>,
    pub dispatcher: Arc<RwLock<Dispatcher>>,
    pub digest: DigestRenderer,
    /// Digest webhook in use and its origin.
    pub webhook: RwLock<(Option<String>, WebhookSource)>,
    /// Serializes advancement passes so one duty is never advanced twice
    /// at once.
    pub pass_lock: Mutex<()>,
}

impl AppState {
    pub fn advancer(&self, pool: &PgPool) -> RotationAdvancer {
        RotationAdvancer::new(
            Arc::new(PgAssignmentStore::new(pool.clone())),
            self.oracle.clone(),
            Arc::new(DispatchAlerts::new(self.dispatcher.clone())),
        )
        .with_max_iterations(self.config.rotation.max_catch_up)
    }

    pub fn reassigner(&self, pool: &PgPool) -> ManualReassigner {
        ManualReassigner::new(Arc::new(PgAssignmentStore::new(pool.clone())))
    }

    /// Today's date in the configured scheduling offset.
    pub fn today(&self) -> NaiveDate {
        local_today(self.config.scheduler.utc_offset_minutes, chrono::Utc::now())
    }
}
