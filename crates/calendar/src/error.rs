use rotator_core::RotatorError;

/// Errors raised while fetching or decoding a holiday calendar.
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("holiday API returned {status} for year {year}")]
    Status { year: i32, status: u16 },

    #[error("malformed holiday document for year {year}: {reason}")]
    Decode { year: i32, reason: String },
}

impl From<CalendarError> for RotatorError {
    fn from(e: CalendarError) -> Self {
        RotatorError::OracleUnavailable(e.to_string())
    }
}
