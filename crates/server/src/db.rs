use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

/// Create a PostgreSQL connection pool and run migrations.
/// Returns None if no database is configured or it cannot be reached.
pub async fn init_pg_pool(config: &rotator_core::config::PostgresConfig) -> Option<PgPool> {
    let Some(url) = config.database_url() else {
        warn!("DATABASE_URL not configured, persistence and API disabled");
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            warn!(error = %e, "failed to connect to PostgreSQL, persistence disabled");
            return None;
        }
    };
    info!(host = %config.host, database = %config.database, "PostgreSQL connected");

    match sqlx::migrate!("../../migrations").run(&pool).await {
        Ok(()) => {
            info!("database migrations applied");
            Some(pool)
        }
        Err(e) => {
            warn!(error = %e, "failed to run migrations, persistence disabled");
            None
        }
    }
}

/// Map a sqlx error into the rotation error taxonomy.
pub fn storage_error(e: sqlx::Error) -> rotator_core::RotatorError {
    rotator_core::RotatorError::Storage(e.to_string())
}
