//! Chronological collection of snapshots.
//!
//! Dated snapshots are kept in ascending date order. When two snapshots
//! resolve to the same date, the one added last replaces the earlier one;
//! the replaced snapshot's name is retained in [`superseded`]. Undated
//! snapshots are kept in insertion order outside the series and remain
//! reachable by name for single-file views.
//!
//! [`superseded`]: PeriodRepository::superseded

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::Period;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Default)]
pub struct PeriodRepository {
    dated: BTreeMap<NaiveDate, Snapshot>,
    undated: Vec<Snapshot>,
    superseded: Vec<String>,
}

impl PeriodRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a snapshot under its own period.
    ///
    /// Returns the snapshot it replaced, if one already held that date.
    pub fn add(&mut self, snapshot: Snapshot) -> Option<Snapshot> {
        match snapshot.period() {
            Period::Dated(date) => {
                debug!(%date, name = snapshot.name(), rows = snapshot.len(), "adding period");
                let replaced = self.dated.insert(date, snapshot);
                if let Some(old) = &replaced {
                    warn!(%date, superseded = old.name(), "duplicate period, keeping last ingested");
                    self.superseded.push(old.name().to_string());
                }
                replaced
            }
            Period::Unknown => {
                debug!(name = snapshot.name(), "adding undated snapshot");
                self.undated.push(snapshot);
                None
            }
        }
    }

    /// Most recent dated snapshot; falls back to the last undated one
    /// added when nothing is dated.
    pub fn latest(&self) -> Option<&Snapshot> {
        self.dated
            .values()
            .next_back()
            .or_else(|| self.undated.last())
    }

    /// The chronological series, ascending by date.
    pub fn all(&self) -> impl DoubleEndedIterator<Item = (NaiveDate, &Snapshot)> {
        self.dated.iter().map(|(d, s)| (*d, s))
    }

    pub fn get(&self, date: NaiveDate) -> Option<&Snapshot> {
        self.dated.get(&date)
    }

    /// Snapshot for `date`, or [`Error::NotFound`].
    pub fn require(&self, date: NaiveDate) -> Result<&Snapshot> {
        self.get(date).ok_or(Error::NotFound { period: date })
    }

    /// Snapshots for two dates, in the order requested.
    pub fn pair(&self, a: NaiveDate, b: NaiveDate) -> Result<(&Snapshot, &Snapshot)> {
        Ok((self.require(a)?, self.require(b)?))
    }

    /// The two most recent dated snapshots as `(earlier, later)`.
    pub fn latest_pair(&self) -> Option<(&Snapshot, &Snapshot)> {
        let mut rev = self.dated.values().rev();
        let later = rev.next()?;
        let earlier = rev.next()?;
        Some((earlier, later))
    }

    /// The dated snapshot immediately before `date`.
    pub fn previous(&self, date: NaiveDate) -> Option<&Snapshot> {
        self.dated.range(..date).next_back().map(|(_, s)| s)
    }

    pub fn undated(&self) -> &[Snapshot] {
        &self.undated
    }

    /// Any snapshot (dated or not) by source name.
    pub fn find_by_name(&self, name: &str) -> Option<&Snapshot> {
        self.dated
            .values()
            .chain(self.undated.iter())
            .find(|s| s.name() == name)
    }

    /// Names of snapshots replaced by a later file with the same date.
    pub fn superseded(&self) -> &[String] {
        &self.superseded
    }

    /// Number of dated periods.
    pub fn period_count(&self) -> usize {
        self.dated.len()
    }

    /// Total usable snapshots, dated and undated.
    pub fn len(&self) -> usize {
        self.dated.len() + self.undated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KeywordRow;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snap(name: &str, period: Period) -> Snapshot {
        Snapshot::from_rows(name, period, vec![KeywordRow::new(name, 1.0, 1, 0)])
    }

    #[test]
    fn test_all_is_sorted_ascending() {
        let mut repo = PeriodRepository::new();
        repo.add(snap("mar", Period::Dated(date(2025, 3, 1))));
        repo.add(snap("jan", Period::Dated(date(2025, 1, 1))));
        repo.add(snap("feb", Period::Dated(date(2025, 2, 1))));

        let names: Vec<&str> = repo.all().map(|(_, s)| s.name()).collect();
        assert_eq!(names, vec!["jan", "feb", "mar"]);
        assert_eq!(repo.latest().unwrap().name(), "mar");
    }

    #[test]
    fn test_duplicate_date_last_ingested_wins() {
        let mut repo = PeriodRepository::new();
        let d = date(2025, 5, 5);
        assert!(repo.add(snap("first", Period::Dated(d))).is_none());
        let replaced = repo.add(snap("second", Period::Dated(d))).unwrap();

        assert_eq!(replaced.name(), "first");
        assert_eq!(repo.get(d).unwrap().name(), "second");
        assert_eq!(repo.superseded(), &["first".to_string()]);
        assert_eq!(repo.period_count(), 1);
    }

    #[test]
    fn test_pair_not_found() {
        let mut repo = PeriodRepository::new();
        repo.add(snap("a", Period::Dated(date(2025, 1, 1))));
        let missing = date(2025, 1, 2);
        match repo.pair(date(2025, 1, 1), missing) {
            Err(Error::NotFound { period }) => assert_eq!(period, missing),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_undated_kept_outside_series() {
        let mut repo = PeriodRepository::new();
        repo.add(snap("undated.csv", Period::Unknown));
        assert_eq!(repo.period_count(), 0);
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.latest().unwrap().name(), "undated.csv");
        assert!(repo.find_by_name("undated.csv").is_some());

        repo.add(snap("dated.csv", Period::Dated(date(2024, 6, 1))));
        assert_eq!(repo.latest().unwrap().name(), "dated.csv");
    }

    #[test]
    fn test_latest_pair_and_previous() {
        let mut repo = PeriodRepository::new();
        assert!(repo.latest_pair().is_none());
        repo.add(snap("a", Period::Dated(date(2025, 1, 1))));
        assert!(repo.latest_pair().is_none());
        repo.add(snap("b", Period::Dated(date(2025, 2, 1))));
        repo.add(snap("c", Period::Dated(date(2025, 3, 1))));

        let (earlier, later) = repo.latest_pair().unwrap();
        assert_eq!((earlier.name(), later.name()), ("b", "c"));
        assert_eq!(repo.previous(date(2025, 3, 1)).unwrap().name(), "b");
        assert!(repo.previous(date(2025, 1, 1)).is_none());
    }

    #[test]
    fn test_empty_repository() {
        let repo = PeriodRepository::new();
        assert!(repo.is_empty());
        assert!(repo.latest().is_none());
    }
}
