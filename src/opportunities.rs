use anyhow::Result;

use keyword_pulse_core::models::KeywordRow;
use keyword_pulse_core::opportunity::{classify, Thresholds, QUICK_WIN_POSITIONS};

use crate::config::Config;
use crate::ingest::{select_snapshot, SnapshotSelector, NO_DATA_MESSAGE};
use crate::top::print_rows;

pub fn run_opportunities(
    config: &Config,
    selector: &SnapshotSelector,
    limit: Option<usize>,
) -> Result<()> {
    let Some(snapshot) = select_snapshot(config, selector)? else {
        println!("{}", NO_DATA_MESSAGE);
        return Ok(());
    };

    let thresholds: &Thresholds = &config.opportunity;
    let limit = limit.unwrap_or(config.view.limit);
    let found = classify(&snapshot, thresholds);

    println!("{} ({})", snapshot.name(), snapshot.period());

    print_bucket(
        &format!(
            "High impressions, low clicks (impressions >= {}, CTR <= {:.1}%)",
            thresholds.impression_threshold,
            thresholds.ctr_low_threshold * 100.0
        ),
        &found.high_impression_low_click,
        limit,
    );
    print_bucket(
        &format!(
            "Quick wins (position {}-{})",
            QUICK_WIN_POSITIONS.start(),
            QUICK_WIN_POSITIONS.end()
        ),
        &found.quick_win,
        limit,
    );
    print_bucket(
        &format!(
            "High CTR (CTR >= {:.1}%)",
            thresholds.ctr_high_threshold * 100.0
        ),
        &found.high_ctr,
        limit,
    );
    println!();
    Ok(())
}

fn print_bucket(title: &str, rows: &[&KeywordRow], limit: usize) {
    println!();
    println!("{} — {}", title, rows.len());
    if rows.is_empty() {
        println!("  (none)");
        return;
    }
    let shown = &rows[..rows.len().min(limit)];
    print_rows(shown);
    if shown.len() < rows.len() {
        println!("  … {} more", rows.len() - shown.len());
    }
}
