//! Holiday calendar fetched from an HTTP API, one document per year.
//!
//! The API serves `{base_url}/{year}.json`:
//!
//! ```json
//! {"year": 2024, "days": [{"name": "National Day", "date": "2024-10-01", "isOffDay": true}]}
//! ```
//!
//! Listed dates override the weekend rule in both directions, so a
//! Saturday make-up workday is listed with `isOffDay: false`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use rotator_core::config::HolidayConfig;
use rotator_core::Result;
use rotator_rotation::WorkingDayOracle;

use crate::error::CalendarError;
use crate::weekend::is_weekday;

/// One listed date of a holiday document.
#[derive(Debug, Clone, Deserialize)]
pub struct HolidayDay {
    pub date: NaiveDate,
    #[serde(rename = "isOffDay")]
    pub is_off_day: bool,
}

/// The per-year document served by the holiday API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HolidayYear {
    #[serde(default)]
    pub days: Vec<HolidayDay>,
}

impl HolidayYear {
    fn into_overrides(self) -> HashMap<NaiveDate, bool> {
        self.days
            .into_iter()
            .map(|d| (d.date, !d.is_off_day))
            .collect()
    }
}

/// Whether `date` is a working day given one year's overrides.
pub fn resolve(date: NaiveDate, overrides: &HashMap<NaiveDate, bool>) -> bool {
    overrides
        .get(&date)
        .copied()
        .unwrap_or_else(|| is_weekday(date))
}

/// [`WorkingDayOracle`] backed by the holiday API.
///
/// Successfully fetched years are cached for the lifetime of the oracle.
/// A failed fetch is not cached, so the next call retries.
pub struct HolidayApiOracle {
    base_url: String,
    client: reqwest::Client,
    cache: RwLock<HashMap<i32, Arc<HashMap<NaiveDate, bool>>>>,
}

impl HolidayApiOracle {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> std::result::Result<Self, CalendarError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Build from config. Returns `None` when no API URL is configured.
    pub fn from_config(config: &HolidayConfig) -> std::result::Result<Option<Self>, CalendarError> {
        match config.api_url.as_deref() {
            Some(url) if !url.is_empty() => {
                Self::new(url, Duration::from_secs(config.timeout_secs)).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Seed the cache with a known document, bypassing the network.
    pub async fn prime(&self, year: i32, document: HolidayYear) {
        self.cache
            .write()
            .await
            .insert(year, Arc::new(document.into_overrides()));
    }

    pub async fn cached_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.cache.read().await.keys().copied().collect();
        years.sort_unstable();
        years
    }

    async fn overrides_for(&self, year: i32) -> std::result::Result<Arc<HashMap<NaiveDate, bool>>, CalendarError> {
        if let Some(cached) = self.cache.read().await.get(&year) {
            return Ok(cached.clone());
        }

        let document = self.fetch(year).await?;
        let overrides = Arc::new(document.into_overrides());
        info!(year, listed = overrides.len(), "holiday calendar loaded");

        self.cache.write().await.insert(year, overrides.clone());
        Ok(overrides)
    }

    async fn fetch(&self, year: i32) -> std::result::Result<HolidayYear, CalendarError> {
        let url = format!("{}/{}.json", self.base_url, year);
        debug!(%url, "fetching holiday calendar");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "holiday API returned non-2xx status");
            return Err(CalendarError::Status {
                year,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| CalendarError::Decode {
            year,
            reason: e.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl WorkingDayOracle for HolidayApiOracle {
    async fn is_working_day(&self, date: NaiveDate) -> Result<bool> {
        let overrides = self.overrides_for(date.year()).await?;
        Ok(resolve(date, &overrides))
    }
}
