//! PostgreSQL persistence.
//!
//! [`PgAssignmentStore`] backs the rotation engine. The remaining stores
//! are stateless unit structs with async methods taking a `&PgPool`,
//! serving the CRUD API.

mod assignments;
mod duties;
mod members;
mod system_config;

pub use assignments::{AssignmentView, HistoryEntry, PgAssignmentStore};
pub use duties::{CreateDuty, DutyStore, UpdateDuty};
pub use members::{CreateMember, MemberStore, UpdateMember};
pub use system_config::{ConfigStore, SLACK_WEBHOOK_URL_KEY};
