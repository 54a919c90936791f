//! Per-keyword position series across all dated periods.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::TrendPoint;
use crate::repository::PeriodRepository;

/// Positions of `keyword` in every dated period, ascending by date.
///
/// Periods where the keyword is absent are omitted (a gap, not a zero).
pub fn series_trend(keyword: &str, repo: &PeriodRepository) -> Vec<TrendPoint> {
    repo.all()
        .filter_map(|(date, snapshot)| {
            snapshot.get(keyword).map(|row| TrendPoint {
                date,
                position: row.position,
                impressions: row.impressions,
                clicks: row.clicks,
            })
        })
        .collect()
}

/// Overall direction of a keyword across its series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Rising,
    Falling,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSummary {
    pub first: TrendPoint,
    pub last: TrendPoint,
    /// Lowest (best) position seen.
    pub best: f64,
    pub best_date: NaiveDate,
    pub worst: f64,
    /// `first.position - last.position`; positive means the keyword climbed.
    pub net_change: f64,
    pub periods_present: usize,
    pub direction: Direction,
}

/// Summarize a series produced by [`series_trend`]. `None` for an empty series.
pub fn summarize(points: &[TrendPoint]) -> Option<TrendSummary> {
    let first = points.first()?.clone();
    let last = points.last()?.clone();

    let best_point = points
        .iter()
        .min_by(|a, b| a.position.total_cmp(&b.position))?;
    let worst = points
        .iter()
        .map(|p| p.position)
        .max_by(f64::total_cmp)?;

    let net_change = first.position - last.position;
    let direction = if net_change > 0.0 {
        Direction::Rising
    } else if net_change < 0.0 {
        Direction::Falling
    } else {
        Direction::Flat
    };

    Some(TrendSummary {
        best: best_point.position,
        best_date: best_point.date,
        worst,
        net_change,
        periods_present: points.len(),
        direction,
        first,
        last,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KeywordRow, Period};
    use crate::snapshot::Snapshot;

    fn d(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, 1).unwrap()
    }

    fn repo() -> PeriodRepository {
        let mut repo = PeriodRepository::new();
        repo.add(Snapshot::from_rows(
            "jan",
            Period::Dated(d(1)),
            vec![KeywordRow::new("Rust", 9.0, 100, 2)],
        ));
        repo.add(Snapshot::from_rows(
            "feb",
            Period::Dated(d(2)),
            vec![KeywordRow::new("other", 1.0, 100, 2)],
        ));
        repo.add(Snapshot::from_rows(
            "mar",
            Period::Dated(d(3)),
            vec![KeywordRow::new("rust", 4.0, 300, 30)],
        ));
        repo.add(Snapshot::from_rows(
            "misc",
            Period::Unknown,
            vec![KeywordRow::new("rust", 1.0, 1, 1)],
        ));
        repo
    }

    #[test]
    fn test_series_skips_gaps_and_undated() {
        let points = series_trend("RUST", &repo());
        let dates: Vec<NaiveDate> = points.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![d(1), d(3)]);
        assert_eq!(points[1].position, 4.0);
    }

    #[test]
    fn test_summary() {
        let points = series_trend("rust", &repo());
        let summary = summarize(&points).unwrap();
        assert_eq!(summary.net_change, 5.0);
        assert_eq!(summary.direction, Direction::Rising);
        assert_eq!(summary.best, 4.0);
        assert_eq!(summary.best_date, d(3));
        assert_eq!(summary.worst, 9.0);
        assert_eq!(summary.periods_present, 2);
    }

    #[test]
    fn test_absent_keyword() {
        let points = series_trend("python", &repo());
        assert!(points.is_empty());
        assert!(summarize(&points).is_none());
    }
}
