use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key).as_deref() {
        Some("1") | Some("true") | Some("yes") => true,
        Some("0") | Some("false") | Some("no") => false,
        _ => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub postgres: PostgresConfig,
    pub slack: SlackConfig,
    pub holiday: HolidayConfig,
    pub scheduler: SchedulerConfig,
    pub rotation: RotationConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `ROTATOR_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("ROTATOR_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            postgres: PostgresConfig::from_env_profiled(p),
            slack: SlackConfig::from_env_profiled(p),
            holiday: HolidayConfig::from_env_profiled(p),
            scheduler: SchedulerConfig::from_env_profiled(p),
            rotation: RotationConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:      {}:{}", self.server.host, self.server.port);
        tracing::info!("  postgres:    host={}, db={}", self.postgres.host, self.postgres.database);
        tracing::info!(
            "  slack:       digest={}, alerts={}",
            self.slack.webhook_url.is_some(),
            self.slack.alert_webhook_url.is_some()
        );
        tracing::info!("  holiday:     url={}", self.holiday.api_url.as_deref().unwrap_or("(weekends only)"));
        tracing::info!(
            "  scheduler:   enabled={}, advance='{}', digest='{}', utc_offset={}m",
            self.scheduler.enabled,
            self.scheduler.advance_cron,
            self.scheduler.digest_cron,
            self.scheduler.utc_offset_minutes
        );
        tracing::info!("  rotation:    max_catch_up={}", self.rotation.max_catch_up);
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": { "host": self.server.host, "port": self.server.port },
            "postgres": {
                "host": self.postgres.host,
                "port": self.postgres.port,
                "database": self.postgres.database,
                "configured": self.postgres.is_configured(),
            },
            "slack": {
                "digest_configured": self.slack.webhook_url.is_some(),
                "alerts_configured": self.slack.alert_webhook_url.is_some(),
                "custom_template": self.slack.digest_template.is_some(),
            },
            "holiday": {
                "api_url": self.holiday.api_url,
                "timeout_secs": self.holiday.timeout_secs,
            },
            "scheduler": {
                "enabled": self.scheduler.enabled,
                "advance_cron": self.scheduler.advance_cron,
                "digest_cron": self.scheduler.digest_cron,
                "utc_offset_minutes": self.scheduler.utc_offset_minutes,
            },
            "rotation": { "max_catch_up": self.rotation.max_catch_up },
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_parse(p, "PORT", 5000),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "http://localhost:3000"),
        }
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Full connection URL; takes precedence over the individual fields.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: String,
    pub max_connections: u32,
}

impl PostgresConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_opt(p, "DATABASE_URL"),
            host: profiled_env_or(p, "PG_HOST", "localhost"),
            port: profiled_env_parse(p, "PG_PORT", 5432),
            database: profiled_env_or(p, "PG_DATABASE", "rotator"),
            username: profiled_env_opt(p, "PG_USERNAME"),
            password: profiled_env_opt(p, "PG_PASSWORD"),
            ssl_mode: profiled_env_or(p, "PG_SSL_MODE", "prefer"),
            max_connections: profiled_env_parse(p, "PG_MAX_CONNECTIONS", 5),
        }
    }

    /// Connection string, or `None` when the database is not configured.
    ///
    /// Credentials are percent-encoded into the userinfo part.
    pub fn database_url(&self) -> Option<String> {
        if let Some(url) = &self.url {
            return Some(url.clone());
        }
        let user = urlencoding::encode(self.username.as_deref()?);
        let pass = urlencoding::encode(self.password.as_deref().unwrap_or(""));
        Some(format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            user, pass, self.host, self.port, self.database, self.ssl_mode
        ))
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some() || self.username.is_some()
    }
}

// ── Slack ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Team channel webhook receiving the daily digest.
    pub webhook_url: Option<String>,
    /// Personal webhook receiving rotation failure alerts.
    pub alert_webhook_url: Option<String>,
    /// Optional minijinja template replacing the default digest layout.
    pub digest_template: Option<String>,
}

impl SlackConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            webhook_url: profiled_env_opt(p, "SLACK_WEBHOOK_URL"),
            alert_webhook_url: profiled_env_opt(p, "SLACK_ALERT_WEBHOOK_URL"),
            digest_template: profiled_env_opt(p, "SLACK_DIGEST_TEMPLATE"),
        }
    }
}

// ── Holiday calendar ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolidayConfig {
    /// Base URL serving `{year}.json` holiday documents.
    pub api_url: Option<String>,
    pub timeout_secs: u64,
}

impl HolidayConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            api_url: profiled_env_opt(p, "HOLIDAY_API_URL"),
            timeout_secs: profiled_env_parse(p, "HOLIDAY_API_TIMEOUT_SECS", 10),
        }
    }
}

// ── Scheduler ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// 6-field cron expression for the rotation pass.
    pub advance_cron: String,
    /// 6-field cron expression for the Slack digest.
    pub digest_cron: String,
    /// Offset from UTC that defines the team's calendar day.
    pub utc_offset_minutes: i32,
}

impl SchedulerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            enabled: profiled_env_bool(p, "SCHEDULER_ENABLED", true),
            advance_cron: profiled_env_or(p, "ADVANCE_CRON", "0 0 0 * * *"),
            digest_cron: profiled_env_or(p, "DIGEST_CRON", "0 0 10 * * *"),
            utc_offset_minutes: profiled_env_parse(p, "SCHEDULER_UTC_OFFSET_MINUTES", 0),
        }
    }
}

// ── Rotation ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Upper bound on catch-up iterations for a single duty per pass.
    pub max_catch_up: usize,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self { max_catch_up: 10_000 }
    }
}

impl RotationConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            max_catch_up: profiled_env_parse(p, "ROTATION_MAX_CATCH_UP", Self::default().max_catch_up),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiled_lookup_prefers_prefixed_key() {
        std::env::set_var("CFGTEST_PG_HOST", "db.prod");
        std::env::set_var("PG_HOST_CFGTEST_UNUSED", "x");
        assert_eq!(profiled_env_or("CFGTEST", "PG_HOST", "localhost"), "db.prod");
        std::env::remove_var("CFGTEST_PG_HOST");
        std::env::remove_var("PG_HOST_CFGTEST_UNUSED");
    }

    #[test]
    fn profiled_bool_parses_common_spellings() {
        std::env::set_var("CFGTEST2_FLAG", "no");
        assert!(!profiled_env_bool("CFGTEST2", "FLAG", true));
        std::env::set_var("CFGTEST2_FLAG", "yes");
        assert!(profiled_env_bool("CFGTEST2", "FLAG", false));
        std::env::remove_var("CFGTEST2_FLAG");
    }

    #[test]
    fn database_url_requires_username_or_url() {
        let mut pg = PostgresConfig {
            url: None,
            host: "localhost".into(),
            port: 5432,
            database: "rotator".into(),
            username: None,
            password: None,
            ssl_mode: "prefer".into(),
            max_connections: 5,
        };
        assert_eq!(pg.database_url(), None);

        pg.username = Some("app".into());
        pg.password = Some("pw".into());
        assert_eq!(
            pg.database_url().as_deref(),
            Some("postgres://app:pw@localhost:5432/rotator?sslmode=prefer")
        );

        pg.url = Some("postgres://override/db".into());
        assert_eq!(pg.database_url().as_deref(), Some("postgres://override/db"));
    }

    #[test]
    fn database_url_encodes_credentials() {
        let pg = PostgresConfig {
            url: None,
            host: "db".into(),
            port: 5432,
            database: "rotator".into(),
            username: Some("ops@team".into()),
            password: Some("p@ss/w:rd".into()),
            ssl_mode: "require".into(),
            max_connections: 5,
        };
        assert_eq!(
            pg.database_url().as_deref(),
            Some("postgres://ops%40team:p%40ss%2Fw%3Ard@db:5432/rotator?sslmode=require")
        );
    }
}
