//! Assignment window arithmetic.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::rule::RotationRule;

/// An inclusive `[start, end]` date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Number of calendar days covered, both ends included.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// First date strictly after `from` that falls on `anchor`.
///
/// When `from` already is an `anchor` day the result is a full week later.
pub fn next_occurrence(from: NaiveDate, anchor: Weekday) -> NaiveDate {
    let current = from.weekday().num_days_from_monday() as i64;
    let target = anchor.num_days_from_monday() as i64;
    let mut delta = (target - current + 7) % 7;
    if delta == 0 {
        delta = 7;
    }
    from + Duration::days(delta)
}

/// Window following the one that started on `previous_start`.
///
/// The returned `start` is always strictly later than `previous_start`.
pub fn next_window(rule: RotationRule, previous_start: NaiveDate) -> Window {
    match rule {
        RotationRule::Daily => {
            let next = previous_start + Duration::days(1);
            Window::new(next, next)
        }
        RotationRule::Weekly(anchor) => {
            let start = next_occurrence(previous_start, anchor);
            Window::new(start, start + Duration::days(6))
        }
        RotationRule::Biweekly(anchor) => {
            let first = next_occurrence(previous_start, anchor);
            let start = next_occurrence(first, anchor);
            Window::new(start, start + Duration::days(13))
        }
    }
}

/// Latest date on or before `from` that falls on `anchor`.
pub fn last_occurrence(from: NaiveDate, anchor: Weekday) -> NaiveDate {
    let current = from.weekday().num_days_from_monday() as i64;
    let target = anchor.num_days_from_monday() as i64;
    from - Duration::days((current - target + 7) % 7)
}

/// Seed window for a fresh assignment created on `today`.
///
/// Anchored rules start on the latest anchor day not after `today`, so the
/// window covers `today` and lines up with the windows that follow it.
pub fn initial_window(rule: RotationRule, today: NaiveDate) -> Window {
    let start = match rule.anchor() {
        Some(anchor) => last_occurrence(today, anchor),
        None => today,
    };
    Window::new(start, start + Duration::days(rule.window_days() - 1))
}
