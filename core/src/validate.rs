//! Local input checks shared by all clients.
//!
//! Every check runs before a request is built, so a failing check never
//! reaches the network.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::ApiError;

// Compile patterns once and reuse them
static URL_PATTERN: OnceLock<Regex> = OnceLock::new();
static HEX_COLOR_PATTERN: OnceLock<Regex> = OnceLock::new();
static AGE_RANGE_PATTERN: OnceLock<Regex> = OnceLock::new();
static PASSCODE_PATTERN: OnceLock<Regex> = OnceLock::new();
static DATE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn url_pattern() -> &'static Regex {
    URL_PATTERN.get_or_init(|| {
        Regex::new(
            r"(http(s)?://.)(www\.)?[-a-zA-Z0-9@:%._+~#=]{2,256}\.[a-z]{2,6}\b([-a-zA-Z0-9@:%_+.~#?&/=]*)",
        )
        .unwrap()
    })
}

/// Whether `url` looks like an `http(s)` URL with a dotted host.
///
/// The match is unanchored: a string merely containing such a URL passes.
pub fn is_valid_url(url: &str) -> bool {
    url_pattern().is_match(url)
}

/// Exactly six hexadecimal digits, no leading `#`.
pub fn is_hex_color(color: &str) -> bool {
    HEX_COLOR_PATTERN
        .get_or_init(|| Regex::new(r"^[0-9a-fA-F]{6}$").unwrap())
        .is_match(color)
}

/// `<min>-<max>`, e.g. `18-40`.
pub fn is_age_range(range: &str) -> bool {
    AGE_RANGE_PATTERN
        .get_or_init(|| Regex::new(r"^\d+-\d+$").unwrap())
        .is_match(range)
}

/// Four decimal digits.
pub fn is_video_passcode(passcode: &str) -> bool {
    PASSCODE_PATTERN
        .get_or_init(|| Regex::new(r"^[0-9]{4}$").unwrap())
        .is_match(passcode)
}

/// A real calendar date written exactly as `YYYY/MM/DD`.
pub fn is_date(date: &str) -> bool {
    let shape = DATE_PATTERN.get_or_init(|| Regex::new(r"^\d{4}/\d{2}/\d{2}$").unwrap());
    shape.is_match(date) && NaiveDate::parse_from_str(date, "%Y/%m/%d").is_ok()
}

pub(crate) fn require_url(url: &str, what: &str) -> Result<(), ApiError> {
    if is_valid_url(url) {
        Ok(())
    } else {
        Err(ApiError::validation(format!("Invalid URL format for {what}")))
    }
}

pub(crate) fn require_non_empty(value: &str, msg: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        Err(ApiError::validation(msg))
    } else {
        Ok(())
    }
}

/// Empty clears the check; anything else must be a `YYYY/MM/DD` date.
pub(crate) fn optional_date(dob: &str) -> Result<String, ApiError> {
    if dob.is_empty() || is_date(dob) {
        Ok(dob.to_string())
    } else {
        Err(ApiError::validation("Invalid birthday format (YYYY/MM/DD)"))
    }
}

/// Empty clears the check; anything else must be `<min>-<max>`.
pub(crate) fn optional_age_range(range: &str) -> Result<String, ApiError> {
    if range.is_empty() || is_age_range(range) {
        Ok(range.to_string())
    } else {
        Err(ApiError::validation("Invalid age range format (minAge-maxAge)"))
    }
}
