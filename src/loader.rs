//! Snapshot loader: one export file in, one [`Snapshot`] out.
//!
//! The period comes from the file name (see
//! [`extract_period`](keyword_pulse_core::period::extract_period)); files
//! without a recognizable date load as [`Period::Unknown`].

use std::path::Path;

use keyword_pulse_core::models::Period;
use keyword_pulse_core::period::extract_period;
use keyword_pulse_core::snapshot::Snapshot;
use keyword_pulse_core::{Error, Result};
use tracing::debug;

use crate::extract::{read_table, SheetFormat};

/// Load a snapshot from file contents already in memory.
///
/// `file_name` supplies both the format (by extension) and the period.
pub fn load_bytes(bytes: &[u8], file_name: &str) -> Result<Snapshot> {
    let format = SheetFormat::from_path(Path::new(file_name))
        .map_err(|e| Error::load(file_name, e))?;
    let table = read_table(bytes, format).map_err(|e| Error::load(file_name, e))?;
    let period = Period::from(extract_period(file_name));

    let snapshot = Snapshot::from_table(file_name, period, &table)?;
    let stats = snapshot.stats();
    debug!(
        file = file_name,
        %period,
        keywords = snapshot.len(),
        rows = stats.rows_read,
        dropped = stats.rows_dropped,
        merged = stats.duplicates_merged,
        "loaded snapshot"
    );
    Ok(snapshot)
}

/// Read and load a snapshot from disk. The snapshot is named after the
/// file's name (not its full path).
pub fn load_file(path: &Path) -> Result<Snapshot> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let bytes = std::fs::read(path).map_err(|e| Error::load(path.display().to_string(), e))?;
    load_bytes(&bytes, &file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_load_csv_with_dated_name() {
        let csv = "Top queries,Clicks,Impressions,CTR,Position\n\
                   seo tools,20,1000,2%,5\n\
                   backup,100,500,20%,2\n";
        let snap = load_bytes(csv.as_bytes(), "gsc-export-2025-11-14.csv").unwrap();
        assert_eq!(
            snap.period(),
            Period::Dated(NaiveDate::from_ymd_opt(2025, 11, 14).unwrap())
        );
        assert_eq!(snap.len(), 2);
        assert!((snap.get("backup").unwrap().ctr - 0.2).abs() < 1e-9);
        assert_eq!(snap.name(), "gsc-export-2025-11-14.csv");
    }

    #[test]
    fn test_undated_name_is_unknown_period() {
        let snap = load_bytes(b"query,position,impressions\na,1,1\n", "keywords.csv").unwrap();
        assert_eq!(snap.period(), Period::Unknown);
    }

    #[test]
    fn test_schema_error_surfaces() {
        let err = load_bytes(b"query,clicks\na,1\n", "x-20250101.csv").unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }

    #[test]
    fn test_unreadable_structure_is_load_error() {
        let err = load_bytes(b"garbage", "report_20251114.xlsx").unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
        let err = load_bytes(b"", "old.xls").unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = load_file(Path::new("/definitely/not/here-2025-01-01.csv")).unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
    }
}
