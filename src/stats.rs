//! Summary metrics and position distribution for one snapshot.
//!
//! Used by `kwp stats`. Metrics cover the same filtered view `kwp top`
//! would show, without the row limit.

use anyhow::Result;

use keyword_pulse_core::snapshot::Snapshot;
use keyword_pulse_core::view::{position_distribution, select, summarize, ViewOptions};

use crate::config::Config;
use crate::ingest::{select_snapshot, SnapshotSelector, NO_DATA_MESSAGE};
use crate::top::ViewOverrides;

pub fn run_stats(
    config: &Config,
    selector: &SnapshotSelector,
    overrides: ViewOverrides,
) -> Result<()> {
    let Some(snapshot) = select_snapshot(config, selector)? else {
        println!("{}", NO_DATA_MESSAGE);
        return Ok(());
    };

    let options = ViewOptions {
        limit: None,
        ..overrides.apply(config)
    };
    print_stats(&snapshot, &options);
    Ok(())
}

fn print_stats(snapshot: &Snapshot, options: &ViewOptions) {
    let rows = select(snapshot, options);
    let summary = summarize(rows.iter().copied());
    let load = snapshot.stats();

    println!("Keyword Pulse — Snapshot Stats");
    println!("==============================");
    println!();
    println!("  File:        {}", snapshot.name());
    println!("  Period:      {}", snapshot.period());
    println!("  Range:       {}", options.range);
    println!();
    println!("  Keywords:    {}", summary.keywords);
    println!("  Impressions: {}", summary.impressions);
    println!("  Clicks:      {}", summary.clicks);
    println!(
        "  Avg. CTR:    {}",
        format_percent(summary.clicks, summary.impressions)
    );
    match summary.mean_position {
        Some(mean) => println!("  Avg. pos.:   {:.2}", mean),
        None => println!("  Avg. pos.:   -"),
    }
    println!();
    println!(
        "  Rows read {}, dropped {}, defaulted cells {}, merged duplicates {}",
        load.rows_read, load.rows_dropped, load.cells_defaulted, load.duplicates_merged
    );

    let distribution = position_distribution(rows.iter().copied());
    if distribution.is_empty() {
        println!();
        return;
    }

    let widest = distribution.iter().map(|(_, n)| *n).max().unwrap_or(0);
    println!();
    println!("  Position distribution:");
    println!("  {:>5} {:>7}", "POS", "COUNT");
    println!("  {}", "-".repeat(40));
    for (bucket, count) in &distribution {
        println!(
            "  {:>5} {:>7}  {}",
            bucket.to_string(),
            count,
            bar(*count, widest, 24)
        );
    }
    println!();
}

/// Overall CTR across rows (clicks / impressions), not a mean of row CTRs.
fn format_percent(clicks: u64, impressions: u64) -> String {
    if impressions == 0 {
        return "-".to_string();
    }
    format!("{:.2}%", clicks as f64 * 100.0 / impressions as f64)
}

fn bar(count: usize, widest: usize, width: usize) -> String {
    if widest == 0 {
        return String::new();
    }
    let len = (count * width).div_ceil(widest);
    "#".repeat(len)
}
