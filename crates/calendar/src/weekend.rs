use chrono::{Datelike, NaiveDate, Weekday};

use rotator_core::Result;
use rotator_rotation::WorkingDayOracle;

/// Monday to Friday are working days; nothing else is known.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeekendOracle;

pub(crate) fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

#[async_trait::async_trait]
impl WorkingDayOracle for WeekendOracle {
    async fn is_working_day(&self, date: NaiveDate) -> Result<bool> {
        Ok(is_weekday(date))
    }
}
