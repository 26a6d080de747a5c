use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::process::utils::{clean_str, is_missing};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse a `last_review` style cell into a calendar date.
/// Date-times are truncated to their date; anything unparseable is `None`.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let s = clean_str(raw);
    if is_missing(&s) {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(&s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(&s).ok().map(|dt| dt.date_naive())
}
