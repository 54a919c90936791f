//! Cross-period comparison engine.
//!
//! # Algorithm
//!
//! 1. Take the union of keyword keys from both snapshots.
//! 2. Keys in both: `delta = position_earlier - position_later`;
//!    `improved` when positive, `declined` when negative, `unchanged` when
//!    exactly zero. No epsilon: both positions come from the same rounded
//!    export format.
//! 3. Keys only in `later`: `new`. Keys only in `earlier`: `dropped`.
//! 4. Output is ordered by keyword key, one row per key in the union.
//!
//! Impression and click changes are carried on each row but never affect
//! the classification.
//!
//! # Movers
//!
//! [`biggest_movers`] ranks `improved` and `declined` rows separately by
//! `|delta|` descending. Ties break on later impressions (descending), then
//! keyword key (ascending), so rankings are stable across runs.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{keyword_key, Classification, ComparisonRow};
use crate::repository::PeriodRepository;
use crate::snapshot::Snapshot;

/// Compare two snapshots keyword by keyword.
///
/// Neither snapshot is modified; the same snapshot can be compared against
/// any number of others.
pub fn compare(earlier: &Snapshot, later: &Snapshot) -> Vec<ComparisonRow> {
    let keys: BTreeSet<&str> = earlier.keys().chain(later.keys()).collect();

    keys.into_iter()
        .map(|key| {
            let before = earlier.get_by_key(key);
            let after = later.get_by_key(key);

            let position_earlier = before.map(|r| r.position);
            let position_later = after.map(|r| r.position);

            let (delta, classification) = match (position_earlier, position_later) {
                (Some(e), Some(l)) => {
                    let delta = e - l;
                    (Some(delta), classify_delta(delta))
                }
                (None, Some(_)) => (None, Classification::New),
                (Some(_), None) => (None, Classification::Dropped),
                (None, None) => unreachable!("key comes from one of the snapshots"),
            };

            let keyword = after
                .or(before)
                .map(|r| r.keyword.clone())
                .unwrap_or_else(|| key.to_string());

            ComparisonRow {
                keyword,
                position_earlier,
                position_later,
                delta,
                classification,
                impressions_earlier: before.map(|r| r.impressions),
                impressions_later: after.map(|r| r.impressions),
                clicks_earlier: before.map(|r| r.clicks),
                clicks_later: after.map(|r| r.clicks),
            }
        })
        .collect()
}

fn classify_delta(delta: f64) -> Classification {
    if delta > 0.0 {
        Classification::Improved
    } else if delta < 0.0 {
        Classification::Declined
    } else {
        Classification::Unchanged
    }
}

/// Top-N improvements and top-N declines, each ranked by `|delta|`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Movers {
    pub improved: Vec<ComparisonRow>,
    pub declined: Vec<ComparisonRow>,
}

/// Rank the biggest position changes. `n` caps each list independently.
pub fn biggest_movers(rows: &[ComparisonRow], n: usize) -> Movers {
    let ranked = |class: Classification| -> Vec<ComparisonRow> {
        let mut picked: Vec<&ComparisonRow> =
            rows.iter().filter(|r| r.classification == class).collect();
        picked.sort_by(|a, b| mover_order(a, b));
        picked.into_iter().take(n).cloned().collect()
    };

    Movers {
        improved: ranked(Classification::Improved),
        declined: ranked(Classification::Declined),
    }
}

fn mover_order(a: &ComparisonRow, b: &ComparisonRow) -> Ordering {
    let magnitude = |r: &ComparisonRow| r.delta.map_or(0.0, f64::abs);
    magnitude(b)
        .total_cmp(&magnitude(a))
        .then_with(|| b.impressions_later.cmp(&a.impressions_later))
        .then_with(|| keyword_key(&a.keyword).cmp(&keyword_key(&b.keyword)))
}

/// Row counts per classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ComparisonSummary {
    pub improved: usize,
    pub declined: usize,
    pub unchanged: usize,
    pub new: usize,
    pub dropped: usize,
}

impl ComparisonSummary {
    pub fn from_rows(rows: &[ComparisonRow]) -> Self {
        let mut summary = Self::default();
        for row in rows {
            match row.classification {
                Classification::Improved => summary.improved += 1,
                Classification::Declined => summary.declined += 1,
                Classification::Unchanged => summary.unchanged += 1,
                Classification::New => summary.new += 1,
                Classification::Dropped => summary.dropped += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.improved + self.declined + self.unchanged + self.new + self.dropped
    }
}

/// Rows with the given classification, in comparison order.
pub fn with_classification(
    rows: &[ComparisonRow],
    class: Classification,
) -> impl Iterator<Item = &ComparisonRow> {
    rows.iter().filter(move |r| r.classification == class)
}

/// One step of the chronological series.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodStep {
    pub earlier: NaiveDate,
    pub later: NaiveDate,
    pub summary: ComparisonSummary,
    pub rows: Vec<ComparisonRow>,
}

/// Compare every adjacent pair of dated periods, oldest first.
pub fn compare_consecutive(repo: &PeriodRepository) -> Vec<PeriodStep> {
    let series: Vec<(NaiveDate, &Snapshot)> = repo.all().collect();
    series
        .windows(2)
        .map(|pair| {
            let (earlier_date, earlier) = pair[0];
            let (later_date, later) = pair[1];
            let rows = compare(earlier, later);
            PeriodStep {
                earlier: earlier_date,
                later: later_date,
                summary: ComparisonSummary::from_rows(&rows),
                rows,
            }
        })
        .collect()
}
