//! Rotation rule grammar.
//!
//! A rule is persisted as a short ASCII string: either `daily`, or
//! `<frequency>_<weekday>` with `frequency` one of `weekly` / `biweekly` and
//! `weekday` a full English day name (case-insensitive). The string form is
//! stored as configuration, so [`Display`](std::fmt::Display) always renders
//! the canonical lowercase spelling that [`FromStr`] accepts.

use std::fmt;
use std::str::FromStr;

use chrono::Weekday;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use rotator_core::RotatorError;

/// How often a duty changes hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationRule {
    /// One-day windows; handoff is deferred across non-working days.
    Daily,
    /// Seven-day windows starting on the anchor weekday.
    Weekly(Weekday),
    /// Fourteen-day windows starting on the anchor weekday.
    Biweekly(Weekday),
}

impl RotationRule {
    /// The anchor weekday, if the rule has one.
    pub fn anchor(&self) -> Option<Weekday> {
        match self {
            Self::Daily => None,
            Self::Weekly(day) | Self::Biweekly(day) => Some(*day),
        }
    }

    /// Whether member rotation is skipped when a new window starts on a
    /// non-working day.
    pub fn skips_non_working_days(&self) -> bool {
        matches!(self, Self::Daily)
    }

    /// Length of one window in days.
    pub fn window_days(&self) -> i64 {
        match self {
            Self::Daily => 1,
            Self::Weekly(_) => 7,
            Self::Biweekly(_) => 14,
        }
    }
}

fn parse_weekday(token: &str) -> Option<Weekday> {
    let day = match token.to_ascii_lowercase().as_str() {
        "monday" => Weekday::Mon,
        "tuesday" => Weekday::Tue,
        "wednesday" => Weekday::Wed,
        "thursday" => Weekday::Thu,
        "friday" => Weekday::Fri,
        "saturday" => Weekday::Sat,
        "sunday" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

impl FromStr for RotationRule {
    type Err = RotatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "daily" {
            return Ok(Self::Daily);
        }

        let (frequency, day) = s
            .split_once('_')
            .ok_or_else(|| RotatorError::invalid_rule(s, "expected 'daily' or '<frequency>_<weekday>'"))?;

        let build: fn(Weekday) -> RotationRule = match frequency {
            "weekly" => RotationRule::Weekly,
            "biweekly" => RotationRule::Biweekly,
            other => {
                return Err(RotatorError::invalid_rule(
                    s,
                    format!("unsupported frequency '{other}'"),
                ))
            }
        };

        let weekday = parse_weekday(day)
            .ok_or_else(|| RotatorError::invalid_rule(s, format!("unknown weekday '{day}'")))?;

        Ok(build(weekday))
    }
}

impl fmt::Display for RotationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly(day) => write!(f, "weekly_{}", weekday_name(*day)),
            Self::Biweekly(day) => write!(f, "biweekly_{}", weekday_name(*day)),
        }
    }
}

impl Serialize for RotationRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RotationRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
