use anyhow::Result;

use crate::config::Config;
use crate::ingest::{run_ingest, IngestReport, NO_DATA_MESSAGE};

pub fn list_periods(config: &Config) -> Result<()> {
    let report = run_ingest(config)?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &IngestReport) {
    let repo = &report.repository;

    if report.is_empty() {
        println!("{}", NO_DATA_MESSAGE);
    } else {
        println!(
            "{:<12} {:>9} {:>8} {:>8}   FILE",
            "PERIOD", "KEYWORDS", "DROPPED", "MERGED"
        );
        for (date, snapshot) in repo.all() {
            let stats = snapshot.stats();
            println!(
                "{:<12} {:>9} {:>8} {:>8}   {}",
                date.format("%Y-%m-%d").to_string(),
                snapshot.len(),
                stats.rows_dropped,
                stats.duplicates_merged,
                snapshot.name()
            );
        }
        for snapshot in repo.undated() {
            let stats = snapshot.stats();
            println!(
                "{:<12} {:>9} {:>8} {:>8}   {}",
                "undated",
                snapshot.len(),
                stats.rows_dropped,
                stats.duplicates_merged,
                snapshot.name()
            );
        }
    }

    if !repo.superseded().is_empty() {
        println!();
        println!("Superseded (same period, replaced by a later file):");
        for name in repo.superseded() {
            println!("  {}", name);
        }
    }

    if !report.skipped.is_empty() {
        println!();
        println!("Skipped:");
        for skipped in &report.skipped {
            println!("  {}: {}", skipped.path.display(), skipped.reason);
        }
    }

    println!();
    println!(
        "{} files seen, {} periods, {} undated",
        report.files_seen,
        repo.period_count(),
        repo.undated().len()
    );
    println!("fingerprint: {}", report.fingerprint);
}
