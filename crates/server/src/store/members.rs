use serde::Deserialize;
use sqlx::PgPool;

use rotator_core::{Member, MemberId};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MemberRow {
    pub id: i64,
    pub handle: String,
    pub notify_id: String,
}

impl From<MemberRow> for Member {
    fn from(row: MemberRow) -> Self {
        Member {
            id: MemberId(row.id),
            handle: row.handle,
            notify_id: row.notify_id,
        }
    }
}

/// Request body for creating a member.
#[derive(Debug, Deserialize)]
pub struct CreateMember {
    pub handle: String,
    /// Defaults to empty (no mention).
    pub notify_id: Option<String>,
}

/// Request body for updating a member (all fields optional).
#[derive(Debug, Deserialize)]
pub struct UpdateMember {
    pub handle: Option<String>,
    pub notify_id: Option<String>,
}

/// Stateless CRUD store for `members`.
pub struct MemberStore;

impl MemberStore {
    pub async fn list(pool: &PgPool) -> Result<Vec<Member>, sqlx::Error> {
        let rows = sqlx::query_as::<_, MemberRow>(
            "SELECT id, handle, notify_id FROM members ORDER BY id",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(Member::from).collect())
    }

    pub async fn get(pool: &PgPool, id: MemberId) -> Result<Option<Member>, sqlx::Error> {
        let row = sqlx::query_as::<_, MemberRow>(
            "SELECT id, handle, notify_id FROM members WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(Member::from))
    }

    pub async fn create(pool: &PgPool, req: CreateMember) -> Result<Member, sqlx::Error> {
        let row = sqlx::query_as::<_, MemberRow>(
            "INSERT INTO members (handle, notify_id) VALUES ($1, $2) \
             RETURNING id, handle, notify_id",
        )
        .bind(req.handle.trim())
        .bind(req.notify_id.unwrap_or_default())
        .fetch_one(pool)
        .await?;
        Ok(row.into())
    }

    pub async fn update(
        pool: &PgPool,
        id: MemberId,
        req: UpdateMember,
    ) -> Result<Option<Member>, sqlx::Error> {
        let row = sqlx::query_as::<_, MemberRow>(
            "UPDATE members SET \
                handle    = COALESCE($2, handle), \
                notify_id = COALESCE($3, notify_id) \
             WHERE id = $1 \
             RETURNING id, handle, notify_id",
        )
        .bind(id.0)
        .bind(req.handle.as_deref().map(str::trim))
        .bind(&req.notify_id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(Member::from))
    }

    /// Delete a member. Fails with a foreign-key violation while the member
    /// still holds an assignment.
    pub async fn delete(pool: &PgPool, id: MemberId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id.0)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
