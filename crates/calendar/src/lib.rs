//! Working-day oracles.
//!
//! - `HolidayApiOracle` consults a per-year holiday document over HTTP
//! - `WeekendOracle` treats Monday to Friday as working days

pub mod error;
pub mod holiday;
pub mod weekend;

pub use error::CalendarError;
pub use holiday::{HolidayApiOracle, HolidayDay, HolidayYear};
pub use weekend::WeekendOracle;
