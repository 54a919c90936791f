//! Canonical data types shared by snapshots, comparisons, and trends.
//!
//! Every loosely-typed export row is converted into a [`KeywordRow`]
//! before any analytics run. Cross-period records use explicit `Option`
//! fields for "absent in this period" instead of missing keys.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

/// One keyword's metrics in the normalized schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordRow {
    /// Keyword exactly as it appeared in the export (display form).
    pub keyword: String,
    /// Average rank; lower is better. `0` only when the source reports it.
    pub position: f64,
    pub impressions: u64,
    /// Not clamped to `impressions`; real exports occasionally exceed it.
    pub clicks: u64,
    /// Click-through rate as a fraction in `[0, 1]`.
    pub ctr: f64,
}

impl KeywordRow {
    /// Build a row whose CTR is derived from clicks and impressions.
    pub fn new(keyword: impl Into<String>, position: f64, impressions: u64, clicks: u64) -> Self {
        Self {
            keyword: keyword.into(),
            position,
            impressions,
            clicks,
            ctr: derive_ctr(clicks, impressions),
        }
    }

    /// Join key used to match this keyword across snapshots.
    pub fn key(&self) -> String {
        keyword_key(&self.keyword)
    }
}

/// Case-insensitive, whitespace-normalized join key for a keyword.
///
/// ```rust
/// use keyword_pulse_core::models::keyword_key;
///
/// assert_eq!(keyword_key("  SEO   Tools "), "seo tools");
/// ```
pub fn keyword_key(keyword: &str) -> String {
    keyword
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// `clicks / impressions`, `0` when there are no impressions, capped at `1`.
pub fn derive_ctr(clicks: u64, impressions: u64) -> f64 {
    if impressions == 0 {
        return 0.0;
    }
    (clicks as f64 / impressions as f64).min(1.0)
}

/// The reporting period a snapshot belongs to.
///
/// `Unknown` sorts after every dated period, so undated files form a
/// consistent tail when periods are listed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Dated(NaiveDate),
    Unknown,
}

impl Period {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Period::Dated(d) => Some(*d),
            Period::Unknown => None,
        }
    }
}

impl From<Option<NaiveDate>> for Period {
    fn from(date: Option<NaiveDate>) -> Self {
        date.map_or(Period::Unknown, Period::Dated)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Dated(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Period::Unknown => f.write_str("unknown"),
        }
    }
}

/// Position movement of a keyword between two periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Improved,
    Declined,
    New,
    Dropped,
    Unchanged,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Improved => "improved",
            Classification::Declined => "declined",
            Classification::New => "new",
            Classification::Dropped => "dropped",
            Classification::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One keyword's record in a two-period comparison.
///
/// `delta = position_earlier - position_later`, so a positive delta is an
/// improvement. It is `None` whenever either side is absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub keyword: String,
    pub position_earlier: Option<f64>,
    pub position_later: Option<f64>,
    pub delta: Option<f64>,
    pub classification: Classification,
    pub impressions_earlier: Option<u64>,
    pub impressions_later: Option<u64>,
    pub clicks_earlier: Option<u64>,
    pub clicks_later: Option<u64>,
}

impl ComparisonRow {
    /// Change in impressions; only defined when the keyword is in both periods.
    pub fn impressions_delta(&self) -> Option<i64> {
        signed_delta(self.impressions_earlier, self.impressions_later)
    }

    /// Change in clicks; only defined when the keyword is in both periods.
    pub fn clicks_delta(&self) -> Option<i64> {
        signed_delta(self.clicks_earlier, self.clicks_later)
    }
}

/// `later - earlier`, saturating at the bounds of `i64`.
fn signed_delta(earlier: Option<u64>, later: Option<u64>) -> Option<i64> {
    let diff = i128::from(later?) - i128::from(earlier?);
    Some(diff.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64)
}

/// A keyword's position in one dated period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub position: f64,
    pub impressions: u64,
    pub clicks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctr_zero_impressions() {
        let row = KeywordRow::new("empty", 12.0, 0, 0);
        assert_eq!(row.ctr, 0.0);
    }

    #[test]
    fn test_ctr_capped_when_clicks_exceed_impressions() {
        assert_eq!(derive_ctr(15, 10), 1.0);
    }

    #[test]
    fn test_keyword_key_collapses_whitespace_and_case() {
        assert_eq!(keyword_key("Cloud\tStorage"), "cloud storage");
        assert_eq!(keyword_key("backup"), keyword_key(" BACKUP "));
    }

    #[test]
    fn test_unknown_period_sorts_last() {
        let d = Period::Dated(NaiveDate::from_ymd_opt(2099, 12, 31).unwrap());
        assert!(d < Period::Unknown);
        assert_eq!(Period::Unknown.to_string(), "unknown");
        assert_eq!(d.to_string(), "2099-12-31");
    }

    #[test]
    fn test_deltas_require_both_sides() {
        let row = ComparisonRow {
            keyword: "seo tools".into(),
            position_earlier: Some(5.0),
            position_later: Some(3.0),
            delta: Some(2.0),
            classification: Classification::Improved,
            impressions_earlier: Some(1000),
            impressions_later: Some(1200),
            clicks_earlier: Some(20),
            clicks_later: Some(15),
        };
        assert_eq!(row.impressions_delta(), Some(200));
        assert_eq!(row.clicks_delta(), Some(-5));

        let new = ComparisonRow {
            impressions_earlier: None,
            ..row
        };
        assert_eq!(new.impressions_delta(), None);
    }

    #[test]
    fn test_deltas_saturate_on_huge_counts() {
        assert_eq!(signed_delta(Some(0), Some(u64::MAX)), Some(i64::MAX));
        assert_eq!(signed_delta(Some(u64::MAX), Some(0)), Some(i64::MIN));
        assert_eq!(signed_delta(Some(u64::MAX), Some(u64::MAX - 1)), Some(-1));
    }
}
