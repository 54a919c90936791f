//! Snapshot construction: coercion, validation, and duplicate aggregation.
//!
//! A [`Snapshot`] holds at most one [`KeywordRow`] per keyword key. Rows
//! sharing a key are merged:
//!
//! - impressions and clicks are summed;
//! - position becomes the impression-weighted mean (plain mean when the
//!   merged rows have no impressions at all);
//! - CTR is recomputed from the merged clicks and impressions.
//!
//! A key seen once keeps its row untouched, including a source-provided
//! CTR, which makes aggregation idempotent.
//!
//! # Cell coercion
//!
//! | Cell | Missing / non-numeric / negative |
//! |------|----------------------------------|
//! | keyword | row dropped |
//! | position | row dropped |
//! | impressions | `0`, counted as defaulted |
//! | clicks | `0`, counted as defaulted (no column: `0`, not counted) |
//! | ctr | derived, counted as defaulted (no column: derived, not counted) |
//!
//! The CTR scale is decided once per column: if any cell carries a `%` or
//! exceeds 1, every cell in that column is read as a percentage.
//!
//! Blank rows are ignored entirely. Nothing here returns an error for a
//! single bad cell or row.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::models::{derive_ctr, keyword_key, KeywordRow, Period};
use crate::normalize::{normalize_columns, ColumnMap};
use crate::table::RawTable;

/// Row-level diagnostics retained from building a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    /// Non-blank data rows seen.
    pub rows_read: usize,
    /// Rows discarded for a missing keyword or unusable position.
    pub rows_dropped: usize,
    /// Numeric cells replaced by their default.
    pub cells_defaulted: usize,
    /// Rows folded into an earlier row with the same keyword.
    pub duplicates_merged: usize,
}

/// Normalized, deduplicated keyword table for one period.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    name: String,
    period: Period,
    rows: BTreeMap<String, KeywordRow>,
    stats: LoadStats,
}

impl Snapshot {
    pub fn empty(name: impl Into<String>, period: Period) -> Self {
        Self {
            name: name.into(),
            period,
            rows: BTreeMap::new(),
            stats: LoadStats::default(),
        }
    }

    /// Build a snapshot from canonical rows, merging duplicate keywords.
    pub fn from_rows(
        name: impl Into<String>,
        period: Period,
        rows: impl IntoIterator<Item = KeywordRow>,
    ) -> Self {
        let rows: Vec<KeywordRow> = rows.into_iter().collect();
        let read = rows.len();
        let aggregated = aggregate(rows);
        Self {
            name: name.into(),
            period,
            stats: LoadStats {
                rows_read: read,
                duplicates_merged: read - aggregated.len(),
                ..LoadStats::default()
            },
            rows: aggregated,
        }
    }

    /// Build a snapshot from a raw table: resolve columns, coerce cells,
    /// drop malformed rows, and aggregate duplicates.
    ///
    /// The only failure is a [`Schema`](crate::Error::Schema) error when
    /// the header row lacks a required column.
    pub fn from_table(name: impl Into<String>, period: Period, table: &RawTable) -> Result<Self> {
        let name = name.into();
        let columns = normalize_columns(&table.headers)?;
        let ctr_percent = columns
            .ctr
            .as_ref()
            .is_some_and(|col| is_percent_column(table, col.index));

        let mut stats = LoadStats::default();
        let mut canonical = Vec::with_capacity(table.rows.len());
        for (i, raw) in table.rows.iter().enumerate() {
            if raw.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            stats.rows_read += 1;
            match coerce_row(table, i, &columns, ctr_percent, &mut stats) {
                Some(row) => canonical.push(row),
                None => stats.rows_dropped += 1,
            }
        }

        let kept = canonical.len();
        let rows = aggregate(canonical);
        stats.duplicates_merged = kept - rows.len();

        if stats.rows_dropped > 0 || stats.cells_defaulted > 0 {
            debug!(
                snapshot = %name,
                dropped = stats.rows_dropped,
                defaulted = stats.cells_defaulted,
                "coerced malformed rows"
            );
        }

        Ok(Self {
            name,
            period,
            rows,
            stats,
        })
    }

    /// Re-run aggregation over this snapshot's rows.
    pub fn aggregate(&self) -> Snapshot {
        Snapshot {
            name: self.name.clone(),
            period: self.period,
            rows: aggregate(self.rows.values().cloned()),
            stats: self.stats,
        }
    }

    /// Source name (usually the file name).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in keyword-key order.
    pub fn rows(&self) -> impl Iterator<Item = &KeywordRow> {
        self.rows.values()
    }

    /// Keyword keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// Look up a keyword case-insensitively.
    pub fn get(&self, keyword: &str) -> Option<&KeywordRow> {
        self.rows.get(&keyword_key(keyword))
    }

    pub(crate) fn get_by_key(&self, key: &str) -> Option<&KeywordRow> {
        self.rows.get(key)
    }
}

struct Accumulator {
    first: KeywordRow,
    count: usize,
    impressions: u64,
    clicks: u64,
    weighted_position: f64,
    position_sum: f64,
}

impl Accumulator {
    fn new(row: KeywordRow) -> Self {
        Self {
            count: 1,
            impressions: row.impressions,
            clicks: row.clicks,
            weighted_position: row.position * row.impressions as f64,
            position_sum: row.position,
            first: row,
        }
    }

    fn merge(&mut self, row: &KeywordRow) {
        self.count += 1;
        self.impressions = self.impressions.saturating_add(row.impressions);
        self.clicks = self.clicks.saturating_add(row.clicks);
        self.weighted_position += row.position * row.impressions as f64;
        self.position_sum += row.position;
    }

    fn finish(self) -> KeywordRow {
        if self.count == 1 {
            return self.first;
        }
        let position = if self.impressions > 0 {
            self.weighted_position / self.impressions as f64
        } else {
            self.position_sum / self.count as f64
        };
        KeywordRow {
            keyword: self.first.keyword,
            position,
            impressions: self.impressions,
            clicks: self.clicks,
            ctr: derive_ctr(self.clicks, self.impressions),
        }
    }
}

fn aggregate(rows: impl IntoIterator<Item = KeywordRow>) -> BTreeMap<String, KeywordRow> {
    let mut acc: BTreeMap<String, Accumulator> = BTreeMap::new();
    for row in rows {
        match acc.entry(row.key()) {
            Entry::Occupied(mut existing) => existing.get_mut().merge(&row),
            Entry::Vacant(slot) => {
                slot.insert(Accumulator::new(row));
            }
        }
    }
    acc.into_iter().map(|(k, a)| (k, a.finish())).collect()
}

fn coerce_row(
    table: &RawTable,
    row: usize,
    columns: &ColumnMap,
    ctr_percent: bool,
    stats: &mut LoadStats,
) -> Option<KeywordRow> {
    let keyword = table.cell(row, columns.keyword.index).trim();
    if keyword.is_empty() {
        return None;
    }
    let position = parse_number(table.cell(row, columns.position.index)).filter(|p| *p >= 0.0)?;

    let mut count = |column: Option<usize>| -> u64 {
        let Some(index) = column else {
            return 0;
        };
        parse_count(table.cell(row, index)).unwrap_or_else(|| {
            stats.cells_defaulted += 1;
            0
        })
    };
    let impressions = count(Some(columns.impressions.index));
    let clicks = count(columns.clicks.as_ref().map(|c| c.index));

    let ctr = match &columns.ctr {
        Some(col) => parse_ratio(table.cell(row, col.index), ctr_percent).unwrap_or_else(|| {
            stats.cells_defaulted += 1;
            derive_ctr(clicks, impressions)
        }),
        None => derive_ctr(clicks, impressions),
    };

    Some(KeywordRow {
        keyword: keyword.to_string(),
        position,
        impressions,
        clicks,
        ctr,
    })
}

/// Parse a numeric cell, tolerating thousands separators and a trailing `%`.
fn parse_number(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | ' ' | '\u{a0}'))
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_count(cell: &str) -> Option<u64> {
    parse_number(cell)
        .filter(|v| *v >= 0.0)
        .map(|v| v.round() as u64)
}

/// Whether a CTR column is written in percent rather than as fractions.
fn is_percent_column(table: &RawTable, index: usize) -> bool {
    (0..table.rows.len()).any(|row| {
        let cell = table.cell(row, index);
        cell.trim().ends_with('%') || parse_number(cell).is_some_and(|v| v > 1.0)
    })
}

/// Parse a CTR cell on the column's scale, clamped to `[0, 1]`.
fn parse_ratio(cell: &str, percent: bool) -> Option<f64> {
    let value = parse_number(cell).filter(|v| *v >= 0.0)?;
    let fraction = if percent { value / 100.0 } else { value };
    Some(fraction.min(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_duplicates_are_aggregated() {
        let snap = Snapshot::from_rows(
            "dup",
            Period::Unknown,
            vec![
                KeywordRow::new("SEO tools", 2.0, 300, 30),
                KeywordRow::new("seo tools", 6.0, 100, 10),
            ],
        );
        assert_eq!(snap.len(), 1);
        let row = snap.get("seo tools").unwrap();
        assert_eq!(row.keyword, "SEO tools");
        assert_eq!(row.impressions, 400);
        assert_eq!(row.clicks, 40);
        assert!((row.position - 3.0).abs() < 1e-9);
        assert!((row.ctr - 0.1).abs() < 1e-9);
        assert_eq!(snap.stats().duplicates_merged, 1);
    }

    #[test]
    fn test_duplicates_without_impressions_use_plain_mean() {
        let snap = Snapshot::from_rows(
            "zero",
            Period::Unknown,
            vec![
                KeywordRow::new("a", 2.0, 0, 0),
                KeywordRow::new("A", 4.0, 0, 0),
            ],
        );
        let row = snap.get("a").unwrap();
        assert!((row.position - 3.0).abs() < 1e-9);
        assert_eq!(row.ctr, 0.0);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let snap = Snapshot::from_rows(
            "idem",
            Period::Unknown,
            vec![
                KeywordRow::new("x", 1.5, 10, 1),
                KeywordRow::new("X", 2.5, 30, 2),
                KeywordRow::new("y", 9.0, 5, 0),
            ],
        );
        assert_eq!(snap.aggregate(), snap);
    }

    #[test]
    fn test_from_table_coerces_bad_cells() {
        let t = table(
            &["Query", "Position", "Impressions", "Clicks"],
            &[
                &["alpha", "3.2", "1,200", "24"],
                &["beta", "4", "n/a", "5"],
                &["", "1", "10", "1"],
                &["gamma", "not ranked", "10", "1"],
                &["delta", "7", "50"],
                &["", "", "", ""],
            ],
        );
        let snap = Snapshot::from_table("t.csv", Period::Unknown, &t).unwrap();
        assert_eq!(snap.len(), 3);

        let alpha = snap.get("alpha").unwrap();
        assert_eq!(alpha.impressions, 1200);
        assert!((alpha.ctr - 0.02).abs() < 1e-9);

        let beta = snap.get("beta").unwrap();
        assert_eq!(beta.impressions, 0);
        assert_eq!(beta.ctr, 0.0);

        // Short row: the missing clicks cell defaults to zero.
        assert_eq!(snap.get("delta").unwrap().clicks, 0);

        let stats = snap.stats();
        assert_eq!(stats.rows_read, 5);
        assert_eq!(stats.rows_dropped, 2);
        assert_eq!(stats.cells_defaulted, 2);
    }

    fn ctr_of(cells: &[&str]) -> Vec<f64> {
        let names: Vec<String> = (0..cells.len()).map(|i| format!("kw{i}")).collect();
        let rows: Vec<Vec<&str>> = cells
            .iter()
            .zip(&names)
            .map(|(ctr, name)| vec![name.as_str(), "1", "1000", "10", *ctr])
            .collect();
        let rows: Vec<&[&str]> = rows.iter().map(Vec::as_slice).collect();
        let t = table(&["keyword", "position", "impressions", "clicks", "ctr"], &rows);
        let snap = Snapshot::from_table("ctr.csv", Period::Unknown, &t).unwrap();
        names.iter().map(|n| snap.get(n).unwrap().ctr).collect()
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_ctr_column_formats() {
        assert_close(&ctr_of(&["5%", "12.5%"]), &[0.05, 0.125]);
        assert_close(&ctr_of(&["0.05", "0.5"]), &[0.05, 0.5]);
        assert_close(&ctr_of(&["5", "12.5"]), &[0.05, 0.125]);
    }

    #[test]
    fn test_ctr_scale_is_decided_per_column() {
        // Bare percentages: "0.8" means 0.8%, not 80%.
        assert_close(&ctr_of(&["2.5", "0.8"]), &[0.025, 0.008]);
        assert_close(&ctr_of(&["5%", "0.5"]), &[0.05, 0.005]);
    }

    #[test]
    fn test_unparseable_ctr_is_derived() {
        let t = table(
            &["keyword", "position", "impressions", "clicks", "ctr"],
            &[&["junk", "1", "100", "5", "--"], &["ok", "1", "100", "5", "5%"]],
        );
        let snap = Snapshot::from_table("ctr.csv", Period::Unknown, &t).unwrap();
        assert!((snap.get("junk").unwrap().ctr - 0.05).abs() < 1e-9);
        assert_eq!(snap.stats().cells_defaulted, 1);
    }

    #[test]
    fn test_zero_impressions_missing_ctr_is_zero() {
        let t = table(
            &["query", "position", "impressions"],
            &[&["quiet", "8", "0"]],
        );
        let snap = Snapshot::from_table("q.csv", Period::Unknown, &t).unwrap();
        assert_eq!(snap.get("quiet").unwrap().ctr, 0.0);
    }

    #[test]
    fn test_clicks_above_impressions_does_not_fail() {
        let t = table(
            &["query", "position", "impressions", "clicks"],
            &[&["odd", "2", "10", "25"]],
        );
        let snap = Snapshot::from_table("odd.csv", Period::Unknown, &t).unwrap();
        let row = snap.get("odd").unwrap();
        assert_eq!(row.clicks, 25);
        assert!(row.ctr <= 1.0);
    }

    #[test]
    fn test_schema_error_propagates() {
        let t = table(&["query", "clicks"], &[&["a", "1"]]);
        assert!(Snapshot::from_table("bad.csv", Period::Unknown, &t).is_err());
    }

    #[test]
    fn test_negative_position_drops_row() {
        let t = table(
            &["query", "position", "impressions"],
            &[&["neg", "-1", "10"], &["ok", "0", "10"]],
        );
        let snap = Snapshot::from_table("n.csv", Period::Unknown, &t).unwrap();
        assert!(snap.get("neg").is_none());
        assert_eq!(snap.get("ok").unwrap().position, 0.0);
    }
}
