use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;

use rotator_core::{
    Assignment, AssignmentId, DutyId, Member, MemberId, Result, RotatorError, WindowState,
};
use rotator_rotation::{AssignmentStore, ChangeKind, DutySnapshot, Window};

use super::duties::DutyRow;
use super::members::MemberRow;
use crate::db::storage_error;

#[derive(Debug, sqlx::FromRow)]
struct AssignmentRow {
    id: i64,
    duty_id: i64,
    member_id: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl From<AssignmentRow> for Assignment {
    fn from(row: AssignmentRow) -> Self {
        Assignment {
            id: AssignmentId(row.id),
            duty_id: DutyId(row.duty_id),
            start_date: row.start_date,
            end_date: row.end_date,
            member_id: MemberId(row.member_id),
        }
    }
}

const ASSIGNMENT_COLUMNS: &str = "id, duty_id, member_id, start_date, end_date";

/// An assignment joined with its duty and holder, as listed by the API.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AssignmentView {
    pub id: i64,
    pub duty_id: i64,
    pub duty_name: String,
    pub rotation_rule: String,
    pub digest_lookahead: i32,
    pub member_id: i64,
    pub handle: String,
    pub notify_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl AssignmentView {
    pub fn state(&self, today: NaiveDate) -> WindowState {
        WindowState::of(self.start_date, self.end_date, today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn view_state_matches_the_assignment_state() {
        let view = AssignmentView {
            id: 1,
            duty_id: 1,
            duty_name: "Standup".to_string(),
            rotation_rule: "weekly_monday".to_string(),
            digest_lookahead: 0,
            member_id: 2,
            handle: "bob".to_string(),
            notify_id: "U2".to_string(),
            start_date: date(2024, 1, 8),
            end_date: date(2024, 1, 14),
        };
        let assignment = Assignment {
            id: AssignmentId(1),
            duty_id: DutyId(1),
            start_date: view.start_date,
            end_date: view.end_date,
            member_id: MemberId(2),
        };

        for day in [date(2024, 1, 7), date(2024, 1, 8), date(2024, 1, 14), date(2024, 1, 15)] {
            assert_eq!(view.state(day), assignment.state(day), "{day}");
        }
        assert_eq!(view.state(date(2024, 1, 15)), WindowState::Stale);
    }
}

/// One committed change of an assignment window.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct HistoryEntry {
    pub id: i64,
    pub assignment_id: i64,
    pub member_id: i64,
    pub handle: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub change_kind: String,
    pub recorded_at: DateTime<Utc>,
}

/// [`AssignmentStore`] over PostgreSQL.
///
/// Every save or seed writes the assignment row and appends its
/// `assignment_history` entry in one transaction.
#[derive(Clone)]
pub struct PgAssignmentStore {
    pool: PgPool,
}

impl PgAssignmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All assignments with duty and holder, in assignment-id order.
    pub async fn list_views(pool: &PgPool) -> std::result::Result<Vec<AssignmentView>, sqlx::Error> {
        sqlx::query_as::<_, AssignmentView>(
            "SELECT a.id, a.duty_id, d.name AS duty_name, d.rotation_rule, d.digest_lookahead, \
                    a.member_id, m.handle, m.notify_id, a.start_date, a.end_date \
             FROM assignments a \
             JOIN duties d ON d.id = a.duty_id \
             JOIN members m ON m.id = a.member_id \
             ORDER BY a.id",
        )
        .fetch_all(pool)
        .await
    }

    /// Commit history of one assignment, newest first.
    pub async fn history(
        pool: &PgPool,
        id: AssignmentId,
        limit: i64,
    ) -> std::result::Result<Vec<HistoryEntry>, sqlx::Error> {
        sqlx::query_as::<_, HistoryEntry>(
            "SELECT h.id, h.assignment_id, h.member_id, m.handle, h.start_date, h.end_date, \
                    h.change_kind, h.recorded_at \
             FROM assignment_history h \
             LEFT JOIN members m ON m.id = h.member_id \
             WHERE h.assignment_id = $1 \
             ORDER BY h.recorded_at DESC, h.id DESC \
             LIMIT $2",
        )
        .bind(id.0)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    async fn record(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        assignment: &Assignment,
        kind: ChangeKind,
    ) -> std::result::Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO assignment_history \
                (assignment_id, duty_id, member_id, start_date, end_date, change_kind) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(assignment.id.0)
        .bind(assignment.duty_id.0)
        .bind(assignment.member_id.0)
        .bind(assignment.start_date)
        .bind(assignment.end_date)
        .bind(kind.as_str())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl AssignmentStore for PgAssignmentStore {
    async fn list_duties(&self) -> Result<Vec<DutyId>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM duties ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(ids.into_iter().map(DutyId).collect())
    }

    async fn load(&self, duty_id: DutyId) -> Result<DutySnapshot> {
        let duty = sqlx::query_as::<_, DutyRow>(
            "SELECT id, name, description, rotation_rule, digest_lookahead \
             FROM duties WHERE id = $1",
        )
        .bind(duty_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?
        .ok_or(RotatorError::DutyNotFound(duty_id))?;
        let duty: rotator_core::Duty = duty.into();
        let rule = duty.rotation_rule.parse()?;

        let assignment = sqlx::query_as::<_, AssignmentRow>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE duty_id = $1"
        ))
        .bind(duty_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?
        .map(Assignment::from);

        let members = sqlx::query_as::<_, MemberRow>(
            "SELECT id, handle, notify_id FROM members ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?
        .into_iter()
        .map(Member::from)
        .collect();

        Ok(DutySnapshot {
            duty,
            rule,
            assignment,
            members,
        })
    }

    async fn save(&self, assignment: &Assignment, kind: ChangeKind) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let result = sqlx::query(
            "UPDATE assignments SET member_id = $2, start_date = $3, end_date = $4, \
                 updated_at = now() \
             WHERE id = $1",
        )
        .bind(assignment.id.0)
        .bind(assignment.member_id.0)
        .bind(assignment.start_date)
        .bind(assignment.end_date)
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(RotatorError::AssignmentNotFound(format!("id {}", assignment.id)));
        }

        Self::record(&mut tx, assignment, kind)
            .await
            .map_err(storage_error)?;
        tx.commit().await.map_err(storage_error)
    }

    async fn seed(&self, duty_id: DutyId, member_id: MemberId, window: Window) -> Result<Assignment> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let assignment: Assignment = sqlx::query_as::<_, AssignmentRow>(&format!(
            "INSERT INTO assignments (duty_id, member_id, start_date, end_date) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {ASSIGNMENT_COLUMNS}"
        ))
        .bind(duty_id.0)
        .bind(member_id.0)
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_error)?
        .into();

        Self::record(&mut tx, &assignment, ChangeKind::Seed)
            .await
            .map_err(storage_error)?;
        tx.commit().await.map_err(storage_error)?;
        Ok(assignment)
    }

    async fn load_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>> {
        let row = sqlx::query_as::<_, AssignmentRow>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(row.map(Assignment::from))
    }

    async fn find_member_by_handle(&self, handle: &str) -> Result<Option<Member>> {
        let row = sqlx::query_as::<_, MemberRow>(
            "SELECT id, handle, notify_id FROM members WHERE handle = $1",
        )
        .bind(handle)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(row.map(Member::from))
    }
}
