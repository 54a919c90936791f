//! Opportunity classifier: segments a snapshot into actionable buckets.
//!
//! | Bucket | Rule | Order |
//! |--------|------|-------|
//! | high impression, low click | `impressions >= impression_threshold && ctr <= ctr_low_threshold` | impressions desc |
//! | quick win | `4 <= position <= 6` | impressions desc |
//! | high CTR | `ctr >= ctr_high_threshold` | CTR desc |
//!
//! Ties fall back to impressions (for CTR ordering) and then keyword key,
//! so output order is deterministic. A keyword may land in several buckets,
//! except that high-CTR and high-impression/low-click are disjoint whenever
//! `ctr_high_threshold > ctr_low_threshold`.

use std::cmp::Ordering;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::models::{keyword_key, KeywordRow};
use crate::snapshot::Snapshot;

/// Positions one step below the top three.
pub const QUICK_WIN_POSITIONS: RangeInclusive<f64> = 4.0..=6.0;

/// Caller-supplied thresholds. [`Default`] is the only place defaults live.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub impression_threshold: u64,
    pub ctr_low_threshold: f64,
    pub ctr_high_threshold: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            impression_threshold: 100,
            ctr_low_threshold: 0.02,
            ctr_high_threshold: 0.10,
        }
    }
}

/// The three opportunity buckets, each a sorted subsequence of the input.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Opportunities<'a> {
    pub high_impression_low_click: Vec<&'a KeywordRow>,
    pub quick_win: Vec<&'a KeywordRow>,
    pub high_ctr: Vec<&'a KeywordRow>,
}

impl Opportunities<'_> {
    pub fn is_empty(&self) -> bool {
        self.high_impression_low_click.is_empty()
            && self.quick_win.is_empty()
            && self.high_ctr.is_empty()
    }
}

pub fn classify<'a>(snapshot: &'a Snapshot, thresholds: &Thresholds) -> Opportunities<'a> {
    let pick = |keep: &dyn Fn(&KeywordRow) -> bool| -> Vec<&'a KeywordRow> {
        snapshot.rows().filter(|r| keep(*r)).collect()
    };

    let mut high_impression_low_click = pick(&|r| {
        r.impressions >= thresholds.impression_threshold && r.ctr <= thresholds.ctr_low_threshold
    });
    high_impression_low_click.sort_by(|a, b| by_impressions(a, b));

    let mut quick_win = pick(&|r| QUICK_WIN_POSITIONS.contains(&r.position));
    quick_win.sort_by(|a, b| by_impressions(a, b));

    let mut high_ctr = pick(&|r| r.ctr >= thresholds.ctr_high_threshold);
    high_ctr.sort_by(|a, b| {
        b.ctr
            .total_cmp(&a.ctr)
            .then_with(|| by_impressions(a, b))
    });

    Opportunities {
        high_impression_low_click,
        quick_win,
        high_ctr,
    }
}

fn by_impressions(a: &KeywordRow, b: &KeywordRow) -> Ordering {
    b.impressions
        .cmp(&a.impressions)
        .then_with(|| keyword_key(&a.keyword).cmp(&keyword_key(&b.keyword)))
}
