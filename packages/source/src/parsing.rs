//! Shared field parsing utilities for source adapters.
//!
//! Upstream files mark missing values in several ways (empty cell, `NA`,
//! `NaN`, FRED's `.`). All of them parse to `None` so that a blank upstream
//! value becomes a NULL column rather than a zero.

use chrono::NaiveDate;

use crate::SourceError;

/// Cell values that mean "no value".
const MISSING_MARKERS: &[&str] = &["", ".", "NA", "N/A", "NaN", "nan", "null", "NULL"];

/// Returns `true` if the trimmed cell is one of the missing-value markers.
#[must_use]
pub fn is_missing(value: &str) -> bool {
    MISSING_MARKERS.contains(&value.trim())
}

/// Parses a calendar date (`YYYY-MM-DD`, optionally followed by a time
/// component that is discarded).
#[must_use]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    // Some exports append a midnight timestamp to date columns.
    value
        .split_once([' ', 'T'])
        .and_then(|(date, _)| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
}

/// Parses a required date field.
///
/// # Errors
///
/// Returns [`SourceError::Parse`] if the value is not a valid date.
pub fn require_date(field: &str, value: &str) -> Result<NaiveDate, SourceError> {
    parse_date(value).ok_or_else(|| SourceError::Parse {
        message: format!("{field}: invalid date {value:?}"),
    })
}

/// Parses an optional floating-point field. Missing markers and non-finite
/// values yield `None`.
///
/// # Errors
///
/// Returns [`SourceError::Parse`] if the value is present but not numeric.
pub fn parse_optional_f64(field: &str, value: &str) -> Result<Option<f64>, SourceError> {
    if is_missing(value) {
        return Ok(None);
    }
    let parsed = value
        .trim()
        .parse::<f64>()
        .map_err(|e| SourceError::Parse {
            message: format!("{field}: invalid number {value:?}: {e}"),
        })?;
    Ok(parsed.is_finite().then_some(parsed))
}

/// Parses an optional count field.
///
/// Counts exported with a trailing zero fraction (`"42.0"`) are accepted.
/// A fractional value (`"0.187"`) is not a count: it is logged and yields
/// `None` so that the stored column stays NULL rather than a rounded zero.
///
/// # Errors
///
/// Returns [`SourceError::Parse`] if the value is present but not numeric.
pub fn parse_optional_count(field: &str, value: &str) -> Result<Option<i64>, SourceError> {
    if is_missing(value) {
        return Ok(None);
    }
    if let Ok(count) = value.trim().parse::<i64>() {
        return Ok(Some(count));
    }
    let Some(parsed) = parse_optional_f64(field, value)? else {
        return Ok(None);
    };
    if parsed.fract().abs() > f64::EPSILON {
        log::warn!("{field}: {value:?} is not a whole count, storing NULL");
        return Ok(None);
    }
    #[allow(clippy::cast_possible_truncation)]
    Ok(Some(parsed as i64))
}
