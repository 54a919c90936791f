//! Filtered, sorted keyword listings and summary metrics for one snapshot.
//!
//! [`select`] applies, in order: position range, case-insensitive keyword
//! substring search, minimum CTR, sort, and limit.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{keyword_key, KeywordRow};
use crate::snapshot::Snapshot;

/// Field a listing is sorted by. Counts and CTR sort descending; position
/// sorts ascending (rank 1 first).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Impressions,
    Clicks,
    Ctr,
    Position,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "impressions" => Ok(SortField::Impressions),
            "clicks" => Ok(SortField::Clicks),
            "ctr" => Ok(SortField::Ctr),
            "position" => Ok(SortField::Position),
            other => Err(format!(
                "unknown sort field '{other}' (expected impressions, clicks, ctr, or position)"
            )),
        }
    }
}

/// Inclusive position bands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionRange {
    #[serde(rename = "1-3")]
    Top3,
    #[serde(rename = "4-6")]
    Mid,
    #[serde(rename = "7-10")]
    Low,
    #[serde(rename = "1-10")]
    FirstPage,
    #[default]
    #[serde(rename = "none")]
    Any,
}

impl PositionRange {
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match self {
            PositionRange::Top3 => Some((1.0, 3.0)),
            PositionRange::Mid => Some((4.0, 6.0)),
            PositionRange::Low => Some((7.0, 10.0)),
            PositionRange::FirstPage => Some((1.0, 10.0)),
            PositionRange::Any => None,
        }
    }

    pub fn contains(&self, position: f64) -> bool {
        self.bounds()
            .map_or(true, |(lo, hi)| (lo..=hi).contains(&position))
    }
}

impl FromStr for PositionRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1-3" => Ok(PositionRange::Top3),
            "4-6" => Ok(PositionRange::Mid),
            "7-10" => Ok(PositionRange::Low),
            "1-10" => Ok(PositionRange::FirstPage),
            "none" | "all" | "any" => Ok(PositionRange::Any),
            other => Err(format!(
                "unknown position range '{other}' (expected 1-3, 4-6, 7-10, 1-10, or none)"
            )),
        }
    }
}

impl fmt::Display for PositionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bounds() {
            Some((lo, hi)) => write!(f, "{lo}-{hi}"),
            None => f.write_str("none"),
        }
    }
}

/// Listing options supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewOptions {
    pub sort: SortField,
    pub range: PositionRange,
    /// Case-insensitive substring match on the keyword.
    pub search: Option<String>,
    pub min_ctr: f64,
    pub limit: Option<usize>,
}

/// Rows of `snapshot` matching `options`, sorted and truncated.
pub fn select<'a>(snapshot: &'a Snapshot, options: &ViewOptions) -> Vec<&'a KeywordRow> {
    let needle = options
        .search
        .as_deref()
        .map(keyword_key)
        .filter(|n| !n.is_empty());

    let mut rows: Vec<&KeywordRow> = snapshot
        .rows()
        .filter(|r| options.range.contains(r.position))
        .filter(|r| {
            needle
                .as_deref()
                .map_or(true, |n| keyword_key(&r.keyword).contains(n))
        })
        .filter(|r| r.ctr >= options.min_ctr)
        .collect();

    rows.sort_by(|a, b| order_by(options.sort, a, b));
    if let Some(limit) = options.limit {
        rows.truncate(limit);
    }
    rows
}

fn order_by(field: SortField, a: &KeywordRow, b: &KeywordRow) -> Ordering {
    let primary = match field {
        SortField::Impressions => b.impressions.cmp(&a.impressions),
        SortField::Clicks => b.clicks.cmp(&a.clicks),
        SortField::Ctr => b.ctr.total_cmp(&a.ctr),
        SortField::Position => a.position.total_cmp(&b.position),
    };
    primary
        .then_with(|| b.impressions.cmp(&a.impressions))
        .then_with(|| keyword_key(&a.keyword).cmp(&keyword_key(&b.keyword)))
}

/// Totals over a set of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Summary {
    pub keywords: usize,
    pub impressions: u64,
    pub clicks: u64,
    /// Arithmetic mean position; `None` for an empty set.
    pub mean_position: Option<f64>,
}

pub fn summarize<'a>(rows: impl IntoIterator<Item = &'a KeywordRow>) -> Summary {
    let mut summary = Summary::default();
    let mut position_sum = 0.0;
    for row in rows {
        summary.keywords += 1;
        summary.impressions = summary.impressions.saturating_add(row.impressions);
        summary.clicks = summary.clicks.saturating_add(row.clicks);
        position_sum += row.position;
    }
    if summary.keywords > 0 {
        summary.mean_position = Some(position_sum / summary.keywords as f64);
    }
    summary
}

/// Rounded-position bucket used by the distribution view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PositionBucket {
    /// Rounds to 0: the source reported the keyword as unranked.
    Unranked,
    Rank(u8),
    BeyondTen,
}

impl fmt::Display for PositionBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionBucket::Unranked => f.write_str("0"),
            PositionBucket::Rank(n) => write!(f, "{n}"),
            PositionBucket::BeyondTen => f.write_str(">10"),
        }
    }
}

impl PositionBucket {
    pub fn of(position: f64) -> Self {
        let rounded = position.round();
        if rounded < 1.0 {
            PositionBucket::Unranked
        } else if rounded > 10.0 {
            PositionBucket::BeyondTen
        } else {
            PositionBucket::Rank(rounded as u8)
        }
    }
}

/// Keyword count per rounded position, ascending by bucket; empty buckets
/// are omitted.
pub fn position_distribution<'a>(
    rows: impl IntoIterator<Item = &'a KeywordRow>,
) -> Vec<(PositionBucket, usize)> {
    let mut counts = std::collections::BTreeMap::new();
    for row in rows {
        *counts.entry(PositionBucket::of(row.position)).or_insert(0) += 1;
    }
    counts.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Period;

    fn snapshot() -> Snapshot {
        Snapshot::from_rows(
            "view",
            Period::Unknown,
            vec![
                KeywordRow::new("rust tutorial", 1.2, 900, 300),
                KeywordRow::new("rust book", 3.0, 1500, 90),
                KeywordRow::new("learn rust", 5.4, 700, 7),
                KeywordRow::new("go tutorial", 8.0, 2000, 20),
                KeywordRow::new("python", 14.0, 5000, 5),
            ],
        )
    }

    fn keywords(rows: &[&KeywordRow]) -> Vec<String> {
        rows.iter().map(|r| r.keyword.clone()).collect()
    }

    #[test]
    fn test_default_sorts_by_impressions() {
        let snap = snapshot();
        let rows = select(&snap, &ViewOptions::default());
        assert_eq!(keywords(&rows)[0], "python");
        assert_eq!(rows.len(), 5);
    }

    #[test]
    fn test_first_page_filter_like_dashboard() {
        let snap = snapshot();
        let options = ViewOptions {
            range: PositionRange::FirstPage,
            limit: Some(3),
            ..ViewOptions::default()
        };
        assert_eq!(
            keywords(&select(&snap, &options)),
            vec!["go tutorial", "rust book", "rust tutorial"]
        );
    }

    #[test]
    fn test_search_and_position_sort() {
        let snap = snapshot();
        let options = ViewOptions {
            search: Some("RUST".into()),
            sort: SortField::Position,
            ..ViewOptions::default()
        };
        assert_eq!(
            keywords(&select(&snap, &options)),
            vec!["rust tutorial", "rust book", "learn rust"]
        );
    }

    #[test]
    fn test_min_ctr_and_range() {
        let snap = snapshot();
        let options = ViewOptions {
            range: PositionRange::Top3,
            min_ctr: 0.1,
            sort: SortField::Ctr,
            ..ViewOptions::default()
        };
        assert_eq!(keywords(&select(&snap, &options)), vec!["rust tutorial"]);
    }

    #[test]
    fn test_range_parsing() {
        assert_eq!("4-6".parse::<PositionRange>(), Ok(PositionRange::Mid));
        assert_eq!("none".parse::<PositionRange>(), Ok(PositionRange::Any));
        assert!("2-5".parse::<PositionRange>().is_err());
        assert_eq!("CTR".parse::<SortField>(), Ok(SortField::Ctr));
        assert_eq!(PositionRange::Low.to_string(), "7-10");
    }

    #[test]
    fn test_summary() {
        let snap = snapshot();
        let s = summarize(snap.rows());
        assert_eq!(s.keywords, 5);
        assert_eq!(s.impressions, 10_100);
        assert_eq!(s.clicks, 422);
        assert!((s.mean_position.unwrap() - 6.32).abs() < 1e-9);
        assert_eq!(summarize(std::iter::empty()).mean_position, None);
    }

    #[test]
    fn test_position_distribution() {
        let snap = snapshot();
        let dist = position_distribution(snap.rows());
        assert_eq!(
            dist,
            vec![
                (PositionBucket::Rank(1), 1),
                (PositionBucket::Rank(3), 1),
                (PositionBucket::Rank(5), 1),
                (PositionBucket::Rank(8), 1),
                (PositionBucket::BeyondTen, 1),
            ]
        );
    }
}
