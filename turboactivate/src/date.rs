//! Date strings accepted by the date validity check.
//!
//! The engine expects UTC in the fixed form `YYYY-MM-DD HH-MM-SS`.

use crate::error::{LicenseResult, TurboActivateError};
use chrono::{DateTime, NaiveDateTime, Utc};

/// `strftime` pattern for the date validity check.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H-%M-%S";

/// Formats a UTC timestamp for the engine.
#[must_use]
pub fn format_date(at: DateTime<Utc>) -> String {
    at.format(DATE_FORMAT).to_string()
}

/// The current UTC time, formatted for the engine.
#[must_use]
pub fn now() -> String {
    format_date(Utc::now())
}

/// Parses a date string in the engine's format.
pub fn parse_date(date: &str) -> LicenseResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(date.trim(), DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| TurboActivateError::InvalidDate(format!("'{date}': {e}")))
}
