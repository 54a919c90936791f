//! Serialize snapshots and comparisons as flat tables (CSV) or JSON.
//!
//! Column orders are fixed:
//!
//! - snapshot: `keyword, position, impressions, clicks, ctr`
//! - comparison: `keyword, position_earlier, position_later, delta, classification`
//!
//! Absent values (a `new` keyword's earlier position, for example) are
//! written as empty CSV fields and JSON `null`.

use anyhow::{bail, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use keyword_pulse_core::compare::compare;
use keyword_pulse_core::models::{ComparisonRow, KeywordRow};

use crate::compare_cmd::{resolve_pair, PeriodPair};
use crate::config::Config;
use crate::ingest::{run_ingest, select_snapshot, SnapshotSelector, NO_DATA_MESSAGE};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => bail!("Unknown export format: '{}'. Use csv or json.", other),
        }
    }
}

#[derive(Serialize)]
struct SnapshotRecord<'a> {
    keyword: &'a str,
    position: f64,
    impressions: u64,
    clicks: u64,
    ctr: f64,
}

impl<'a> From<&'a KeywordRow> for SnapshotRecord<'a> {
    fn from(row: &'a KeywordRow) -> Self {
        Self {
            keyword: &row.keyword,
            position: row.position,
            impressions: row.impressions,
            clicks: row.clicks,
            ctr: row.ctr,
        }
    }
}

#[derive(Serialize)]
struct ComparisonRecord<'a> {
    keyword: &'a str,
    position_earlier: Option<f64>,
    position_later: Option<f64>,
    delta: Option<f64>,
    classification: &'static str,
}

impl<'a> From<&'a ComparisonRow> for ComparisonRecord<'a> {
    fn from(row: &'a ComparisonRow) -> Self {
        Self {
            keyword: &row.keyword,
            position_earlier: row.position_earlier,
            position_later: row.position_later,
            delta: row.delta,
            classification: row.classification.as_str(),
        }
    }
}

pub fn write_snapshot<'a, W: Write>(
    rows: impl IntoIterator<Item = &'a KeywordRow>,
    format: ExportFormat,
    out: W,
) -> Result<usize> {
    let records: Vec<SnapshotRecord> = rows.into_iter().map(SnapshotRecord::from).collect();
    write_records(&records, format, out)
}

pub fn write_comparison<'a, W: Write>(
    rows: impl IntoIterator<Item = &'a ComparisonRow>,
    format: ExportFormat,
    out: W,
) -> Result<usize> {
    let records: Vec<ComparisonRecord> = rows.into_iter().map(ComparisonRecord::from).collect();
    write_records(&records, format, out)
}

fn write_records<T: Serialize, W: Write>(
    records: &[T],
    format: ExportFormat,
    mut out: W,
) -> Result<usize> {
    match format {
        ExportFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut out, records)?;
            writeln!(out)?;
        }
    }
    Ok(records.len())
}

/// Run `write` against `output` (creating parent directories) or stdout.
pub fn to_destination<F>(output: Option<&Path>, write: F) -> Result<usize>
where
    F: FnOnce(&mut dyn Write) -> Result<usize>,
{
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
            let n = write(&mut file)?;
            file.flush()?;
            eprintln!("Exported {} rows to {}", n, path.display());
            Ok(n)
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write(&mut lock)
        }
    }
}

/// Export every keyword of the selected snapshot, in keyword order.
pub fn run_export_snapshot(
    config: &Config,
    selector: &SnapshotSelector,
    output: Option<&Path>,
    format: ExportFormat,
) -> Result<()> {
    let Some(snapshot) = select_snapshot(config, selector)? else {
        eprintln!("{}", NO_DATA_MESSAGE);
        return Ok(());
    };
    to_destination(output, |out| write_snapshot(snapshot.rows(), format, out))?;
    Ok(())
}

/// Export the full comparison of two periods, in keyword order.
pub fn run_export_compare(
    config: &Config,
    pair: PeriodPair,
    output: Option<&Path>,
    format: ExportFormat,
) -> Result<()> {
    let report = run_ingest(config)?;
    if report.is_empty() {
        eprintln!("{}", NO_DATA_MESSAGE);
        return Ok(());
    }
    let Some((earlier, later)) = resolve_pair(&report.repository, pair)? else {
        bail!(
            "Need at least two dated periods to compare ({} found)",
            report.repository.period_count()
        );
    };
    let rows = compare(earlier, later);
    to_destination(output, |out| write_comparison(&rows, format, out))?;
    Ok(())
}
