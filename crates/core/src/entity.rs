use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(v: i64) -> Self {
                Self(v)
            }
        }
    };
}

id_type!(DutyId);
id_type!(MemberId);
id_type!(AssignmentId);

/// A recurring duty handed around the team.
///
/// `rotation_rule` is kept in its wire form here; the rotation crate parses it
/// into a closed rule type when the duty is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duty {
    pub id: DutyId,
    pub name: String,
    pub description: String,
    pub rotation_rule: String,
    /// How many upcoming holders the daily digest lists after the current one.
    pub digest_lookahead: u32,
}

/// A team member taking part in every rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    /// Human name or contact handle, unique across the roster.
    pub handle: String,
    /// Chat identity used for mentions (e.g. a Slack user id).
    pub notify_id: String,
}

/// Where an assignment window sits relative to a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowState {
    /// The window starts after today (only reachable through manual reassignment).
    Upcoming,
    /// Today falls inside `[start_date, end_date]`.
    Current,
    /// The window ended before today and must roll over.
    Stale,
}

impl WindowState {
    /// Classify the inclusive window `[start, end]` against `today`.
    pub fn of(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Self {
        if today > end {
            WindowState::Stale
        } else if today < start {
            WindowState::Upcoming
        } else {
            WindowState::Current
        }
    }
}

/// The live rotation state of one duty: an inclusive window and its holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub duty_id: DutyId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub member_id: MemberId,
}

impl Assignment {
    pub fn state(&self, today: NaiveDate) -> WindowState {
        WindowState::of(self.start_date, self.end_date, today)
    }

    pub fn is_stale(&self, today: NaiveDate) -> bool {
        self.state(today) == WindowState::Stale
    }
}
