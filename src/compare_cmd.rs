//! `kwp compare` and `kwp history`: period-over-period position changes.

use anyhow::{bail, Result};
use chrono::NaiveDate;

use keyword_pulse_core::compare::{
    biggest_movers, compare, compare_consecutive, with_classification, ComparisonSummary,
};
use keyword_pulse_core::models::{Classification, ComparisonRow};
use keyword_pulse_core::repository::PeriodRepository;
use keyword_pulse_core::snapshot::Snapshot;

use crate::config::Config;
use crate::ingest::{run_ingest, NO_DATA_MESSAGE};
use crate::top::truncate;

/// Which two periods to compare. Unset ends fall back to the latest data.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodPair {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Resolve `pair` against the repository as `(earlier, later)`.
///
/// - both set: exactly those periods
/// - only `to`: `to` and the period before it
/// - only `from`: `from` and the latest period
/// - neither: the two latest periods
///
/// `Ok(None)` when fewer than two dated periods exist and no explicit
/// period was asked for.
pub fn resolve_pair(
    repo: &PeriodRepository,
    pair: PeriodPair,
) -> Result<Option<(&Snapshot, &Snapshot)>> {
    match (pair.from, pair.to) {
        (Some(from), Some(to)) => Ok(Some(repo.pair(from, to)?)),
        (None, Some(to)) => {
            let later = repo.require(to)?;
            match repo.previous(to) {
                Some(earlier) => Ok(Some((earlier, later))),
                None => bail!("No period before {} to compare against", to),
            }
        }
        (Some(from), None) => {
            let earlier = repo.require(from)?;
            match repo.all().next_back() {
                Some((latest, later)) if latest != from => Ok(Some((earlier, later))),
                _ => bail!("No period after {} to compare against", from),
            }
        }
        (None, None) => Ok(repo.latest_pair()),
    }
}

pub fn run_compare(config: &Config, pair: PeriodPair, movers: Option<usize>) -> Result<()> {
    let report = run_ingest(config)?;
    if report.is_empty() {
        println!("{}", NO_DATA_MESSAGE);
        return Ok(());
    }

    let Some((earlier, later)) = resolve_pair(&report.repository, pair)? else {
        println!(
            "Need at least two dated periods to compare ({} found).",
            report.repository.period_count()
        );
        return Ok(());
    };

    let n = movers.unwrap_or(config.compare.movers);
    let rows = compare(earlier, later);
    print_comparison(earlier, later, &rows, n);
    Ok(())
}

fn print_comparison(earlier: &Snapshot, later: &Snapshot, rows: &[ComparisonRow], n: usize) {
    let summary = ComparisonSummary::from_rows(rows);

    println!(
        "{} ({}) -> {} ({})",
        earlier.period(),
        earlier.name(),
        later.period(),
        later.name()
    );
    println!();
    print_summary(&summary);

    let movers = biggest_movers(rows, n);
    print_movers("Top improvements", &movers.improved);
    print_movers("Top declines", &movers.declined);

    print_keyword_list("New keywords", rows, Classification::New, n);
    print_keyword_list("Dropped keywords", rows, Classification::Dropped, n);
    println!();
}

fn print_summary(summary: &ComparisonSummary) {
    println!("  Improved:  {}", summary.improved);
    println!("  Declined:  {}", summary.declined);
    println!("  Unchanged: {}", summary.unchanged);
    println!("  New:       {}", summary.new);
    println!("  Dropped:   {}", summary.dropped);
    println!("  Total:     {}", summary.total());
}

fn print_movers(title: &str, rows: &[ComparisonRow]) {
    println!();
    println!("{}:", title);
    if rows.is_empty() {
        println!("  (none)");
        return;
    }
    println!(
        "  {:<40} {:>7} {:>7} {:>7} {:>12} {:>9}",
        "KEYWORD", "BEFORE", "AFTER", "DELTA", "IMPRESSIONS", "CLICKS +/-"
    );
    for row in rows {
        println!(
            "  {:<40} {:>7} {:>7} {:>+7.1} {:>12} {:>+9}",
            truncate(&row.keyword, 40),
            format_position(row.position_earlier),
            format_position(row.position_later),
            row.delta.unwrap_or(0.0),
            row.impressions_later.unwrap_or(0),
            row.clicks_delta().unwrap_or(0)
        );
    }
}

fn print_keyword_list(title: &str, rows: &[ComparisonRow], class: Classification, n: usize) {
    let mut picked: Vec<&ComparisonRow> = with_classification(rows, class).collect();
    println!();
    println!("{} ({}):", title, picked.len());
    if picked.is_empty() {
        println!("  (none)");
        return;
    }

    // Most visible first: the side of the comparison where the keyword exists.
    let impressions = |r: &ComparisonRow| r.impressions_later.or(r.impressions_earlier).unwrap_or(0);
    picked.sort_by(|a, b| impressions(*b).cmp(&impressions(*a)));

    for &row in picked.iter().take(n) {
        let position = row.position_later.or(row.position_earlier);
        println!(
            "  {:<40} pos {:>5}  impressions {}",
            truncate(&row.keyword, 40),
            format_position(position),
            impressions(row)
        );
    }
    if picked.len() > n {
        println!("  … {} more", picked.len() - n);
    }
}

fn format_position(position: Option<f64>) -> String {
    position.map_or_else(|| "-".to_string(), |p| format!("{:.1}", p))
}

pub fn run_history(config: &Config) -> Result<()> {
    let report = run_ingest(config)?;
    if report.is_empty() {
        println!("{}", NO_DATA_MESSAGE);
        return Ok(());
    }

    let steps = compare_consecutive(&report.repository);
    if steps.is_empty() {
        println!(
            "Need at least two dated periods for a history ({} found).",
            report.repository.period_count()
        );
        return Ok(());
    }

    println!(
        "{:<12} {:<12} {:>9} {:>9} {:>10} {:>6} {:>8}",
        "FROM", "TO", "IMPROVED", "DECLINED", "UNCHANGED", "NEW", "DROPPED"
    );
    for step in &steps {
        let s = &step.summary;
        println!(
            "{:<12} {:<12} {:>9} {:>9} {:>10} {:>6} {:>8}",
            step.earlier.format("%Y-%m-%d").to_string(),
            step.later.format("%Y-%m-%d").to_string(),
            s.improved,
            s.declined,
            s.unchanged,
            s.new,
            s.dropped
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyword_pulse_core::models::{KeywordRow, Period};
    use keyword_pulse_core::Error;

    fn date(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, 1).unwrap()
    }

    fn repo(months: &[u32]) -> PeriodRepository {
        let mut repo = PeriodRepository::new();
        for m in months {
            repo.add(Snapshot::from_rows(
                format!("export-2025-{m:02}-01.csv"),
                Period::Dated(date(*m)),
                vec![KeywordRow::new("kw", *m as f64, 10, 1)],
            ));
        }
        repo
    }

    #[test]
    fn test_default_pair_is_two_latest() {
        let repo = repo(&[1, 2, 3]);
        let (a, b) = resolve_pair(&repo, PeriodPair::default()).unwrap().unwrap();
        assert_eq!(a.period().date(), Some(date(2)));
        assert_eq!(b.period().date(), Some(date(3)));
    }

    #[test]
    fn test_single_period_has_no_default_pair() {
        let repo = repo(&[1]);
        assert!(resolve_pair(&repo, PeriodPair::default()).unwrap().is_none());
    }

    #[test]
    fn test_explicit_pair_keeps_requested_order() {
        let repo = repo(&[1, 2, 3]);
        let pair = PeriodPair {
            from: Some(date(3)),
            to: Some(date(1)),
        };
        let (a, b) = resolve_pair(&repo, pair).unwrap().unwrap();
        assert_eq!(a.period().date(), Some(date(3)));
        assert_eq!(b.period().date(), Some(date(1)));
    }

    #[test]
    fn test_only_to_uses_previous_period() {
        let repo = repo(&[1, 2, 3]);
        let pair = PeriodPair {
            from: None,
            to: Some(date(2)),
        };
        let (a, _) = resolve_pair(&repo, pair).unwrap().unwrap();
        assert_eq!(a.period().date(), Some(date(1)));

        let first = PeriodPair {
            from: None,
            to: Some(date(1)),
        };
        assert!(resolve_pair(&repo, first).is_err());
    }

    #[test]
    fn test_only_from_uses_latest() {
        let repo = repo(&[1, 2, 3]);
        let pair = PeriodPair {
            from: Some(date(1)),
            to: None,
        };
        let (_, b) = resolve_pair(&repo, pair).unwrap().unwrap();
        assert_eq!(b.period().date(), Some(date(3)));

        let last = PeriodPair {
            from: Some(date(3)),
            to: None,
        };
        assert!(resolve_pair(&repo, last).is_err());
    }

    #[test]
    fn test_missing_period_is_not_found() {
        let repo = repo(&[1, 2]);
        let pair = PeriodPair {
            from: Some(date(1)),
            to: Some(date(9)),
        };
        let err = resolve_pair(&repo, pair).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_format_position() {
        assert_eq!(format_position(None), "-");
        assert_eq!(format_position(Some(3.26)), "3.3");
    }
}
