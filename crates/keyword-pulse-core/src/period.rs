//! Period extraction from export file names.
//!
//! A file name identifies its period by containing an ISO `YYYY-MM-DD` or
//! compact `YYYYMMDD` date. The leftmost valid candidate wins. A candidate
//! that is part of a longer digit run (e.g. inside a 12-digit id) or is not
//! a real calendar date is skipped.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DATE_CANDIDATE: Regex =
        Regex::new(r"(\d{4})-(\d{2})-(\d{2})|(\d{4})(\d{2})(\d{2})").expect("static regex");
}

/// Extract the period date from a file name.
///
/// ```rust
/// use chrono::NaiveDate;
/// use keyword_pulse_core::period::extract_period;
///
/// let expected = NaiveDate::from_ymd_opt(2025, 11, 14);
/// assert_eq!(extract_period("gsc-export-2025-11-14.xlsx"), expected);
/// assert_eq!(extract_period("report_20251114_final.xlsx"), expected);
/// assert_eq!(extract_period("latest.xlsx"), None);
/// ```
pub fn extract_period(file_name: &str) -> Option<NaiveDate> {
    let bytes = file_name.as_bytes();
    for caps in DATE_CANDIDATE.captures_iter(file_name) {
        let whole = caps.get(0)?;
        let before_is_digit = whole.start() > 0 && bytes[whole.start() - 1].is_ascii_digit();
        let after_is_digit = bytes.get(whole.end()).is_some_and(u8::is_ascii_digit);
        if before_is_digit || after_is_digit {
            continue;
        }

        let (y, m, d) = if caps.get(1).is_some() {
            (&caps[1], &caps[2], &caps[3])
        } else {
            (&caps[4], &caps[5], &caps[6])
        };
        if let Some(date) = ymd(y, m, d) {
            return Some(date);
        }
    }
    None
}

/// Parse a user-supplied period (`YYYY-MM-DD` or `YYYYMMDD`, nothing else).
pub fn parse_period_arg(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            (text.len() == 8 && text.bytes().all(|b| b.is_ascii_digit()))
                .then(|| ymd(&text[0..4], &text[4..6], &text[6..8]))
                .flatten()
        })
}

fn ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}
