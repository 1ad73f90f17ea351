use serde::Deserialize;
use sqlx::PgPool;

use rotator_core::{Duty, DutyId};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct DutyRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub rotation_rule: String,
    pub digest_lookahead: i32,
}

impl From<DutyRow> for Duty {
    fn from(row: DutyRow) -> Self {
        Duty {
            id: DutyId(row.id),
            name: row.name,
            description: row.description,
            rotation_rule: row.rotation_rule,
            // The column carries a non-negative check.
            digest_lookahead: u32::try_from(row.digest_lookahead).unwrap_or(0),
        }
    }
}

const DUTY_COLUMNS: &str = "id, name, description, rotation_rule, digest_lookahead";

/// Request body for creating a duty.
#[derive(Debug, Deserialize)]
pub struct CreateDuty {
    pub name: String,
    pub description: Option<String>,
    pub rotation_rule: String,
    pub digest_lookahead: Option<u32>,
}

/// Request body for updating a duty (all fields optional).
#[derive(Debug, Deserialize)]
pub struct UpdateDuty {
    pub name: Option<String>,
    pub description: Option<String>,
    pub rotation_rule: Option<String>,
    pub digest_lookahead: Option<u32>,
}

/// Stateless CRUD store for `duties`.
///
/// Rule strings are stored as given; callers validate and canonicalize
/// them first.
pub struct DutyStore;

impl DutyStore {
    pub async fn list(pool: &PgPool) -> Result<Vec<Duty>, sqlx::Error> {
        let rows = sqlx::query_as::<_, DutyRow>(&format!(
            "SELECT {DUTY_COLUMNS} FROM duties ORDER BY id"
        ))
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(Duty::from).collect())
    }

    pub async fn get(pool: &PgPool, id: DutyId) -> Result<Option<Duty>, sqlx::Error> {
        let row = sqlx::query_as::<_, DutyRow>(&format!(
            "SELECT {DUTY_COLUMNS} FROM duties WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(Duty::from))
    }

    pub async fn create(pool: &PgPool, req: CreateDuty) -> Result<Duty, sqlx::Error> {
        let row = sqlx::query_as::<_, DutyRow>(&format!(
            "INSERT INTO duties (name, description, rotation_rule, digest_lookahead) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {DUTY_COLUMNS}"
        ))
        .bind(req.name.trim())
        .bind(req.description.unwrap_or_default())
        .bind(&req.rotation_rule)
        .bind(lookahead_column(req.digest_lookahead.unwrap_or(0)))
        .fetch_one(pool)
        .await?;
        Ok(row.into())
    }

    pub async fn update(pool: &PgPool, id: DutyId, req: UpdateDuty) -> Result<Option<Duty>, sqlx::Error> {
        let row = sqlx::query_as::<_, DutyRow>(&format!(
            "UPDATE duties SET \
                name             = COALESCE($2, name), \
                description      = COALESCE($3, description), \
                rotation_rule    = COALESCE($4, rotation_rule), \
                digest_lookahead = COALESCE($5, digest_lookahead) \
             WHERE id = $1 \
             RETURNING {DUTY_COLUMNS}"
        ))
        .bind(id.0)
        .bind(req.name.as_deref().map(str::trim))
        .bind(&req.description)
        .bind(&req.rotation_rule)
        .bind(req.digest_lookahead.map(lookahead_column))
        .fetch_optional(pool)
        .await?;
        Ok(row.map(Duty::from))
    }

    /// Delete a duty together with its assignment and history.
    pub async fn delete(pool: &PgPool, id: DutyId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM duties WHERE id = $1")
            .bind(id.0)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn lookahead_column(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
