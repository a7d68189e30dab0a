//! Date normalizer: turns a free-text date fragment ("October 2Nd",
//! "December", "April 13th 2017") into a canonical month/day/year triple and
//! from there into an epoch-millisecond timestamp.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use crate::tags::title_case;

#[derive(Error, Debug)]
pub enum DateError {
    #[error("malformed date: {0:?} does not name a calendar day")]
    MalformedDate(String),
}

/// A normalized date, one string per role, canonical form
/// `"<3-letter month> <day> <year>"` (e.g. "Oct 2 2017").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParts {
    pub month: String,
    pub day: String,
    pub year: String,
}

impl DateParts {
    pub fn canonical(&self) -> String {
        format!("{} {} {}", self.month, self.day, self.year)
    }
}

fn month_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z]+$").unwrap())
}

fn day_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\d{1,2}(st|nd|rd|th)?$").unwrap())
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}$").unwrap())
}

/// Classifies each whitespace token of `fragment` into at most one of the
/// month/day/year roles; a later token overwrites an earlier one in the same
/// role. Roles absent from the fragment default to the corresponding
/// component of `reference` rather than staying empty, so a month-only
/// fragment inherits today's day and year. That default can compose a
/// nonsensical day-in-month, which then fails in `to_epoch_millis`.
pub fn normalize(fragment: &str, reference: NaiveDate) -> DateParts {
    let mut month = None;
    let mut day = None;
    let mut year = None;

    for word in fragment.split_whitespace() {
        if month_re().is_match(word) {
            // abbreviate to the first three letters
            month = Some(if word.len() > 3 {
                title_case(&word[..3])
            } else {
                title_case(word)
            });
        }
        if day_re().is_match(word) {
            // strip the two-letter ordinal suffix
            day = Some(if word.len() > 2 {
                word[..word.len() - 2].to_string()
            } else {
                word.to_string()
            });
        }
        if year_re().is_match(word) {
            year = Some(word.to_string());
        }
    }

    DateParts {
        month: month.unwrap_or_else(|| reference.format("%b").to_string()),
        day: day.unwrap_or_else(|| reference.format("%d").to_string()),
        year: year.unwrap_or_else(|| reference.format("%Y").to_string()),
    }
}

/// Milliseconds since the epoch for midnight UTC of the given date.
/// Timestamps are pinned to UTC so the round trip is machine-independent.
pub fn to_epoch_millis(parts: &DateParts) -> Result<i64, DateError> {
    let canonical = parts.canonical();
    let date = NaiveDate::parse_from_str(&canonical, "%b %d %Y")
        .map_err(|_| DateError::MalformedDate(canonical.clone()))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| DateError::MalformedDate(canonical))?;
    Ok(midnight.and_utc().timestamp_millis())
}
