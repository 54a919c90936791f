use anyhow::Result;

use keyword_pulse_core::models::TrendPoint;
use keyword_pulse_core::trend::{series_trend, summarize, Direction, TrendSummary};

use crate::config::Config;
use crate::ingest::{run_ingest, NO_DATA_MESSAGE};

pub fn run_trend(config: &Config, keyword: &str) -> Result<()> {
    let report = run_ingest(config)?;
    if report.is_empty() {
        println!("{}", NO_DATA_MESSAGE);
        return Ok(());
    }

    let points = series_trend(keyword, &report.repository);
    let Some(summary) = summarize(&points) else {
        println!(
            "'{}' does not appear in any of {} dated periods.",
            keyword,
            report.repository.period_count()
        );
        return Ok(());
    };

    print_series(&points);
    println!();
    print_summary(&summary, report.repository.period_count());
    Ok(())
}

fn print_series(points: &[TrendPoint]) {
    println!(
        "{:<12} {:>8} {:>12} {:>8}",
        "PERIOD", "POSITION", "IMPRESSIONS", "CLICKS"
    );
    for point in points {
        println!(
            "{:<12} {:>8.1} {:>12} {:>8}",
            point.date.format("%Y-%m-%d").to_string(),
            point.position,
            point.impressions,
            point.clicks
        );
    }
}

fn print_summary(summary: &TrendSummary, period_count: usize) {
    println!(
        "  Present in:  {} of {} periods",
        summary.periods_present, period_count
    );
    println!(
        "  First:       {:.1} ({})",
        summary.first.position, summary.first.date
    );
    println!(
        "  Last:        {:.1} ({})",
        summary.last.position, summary.last.date
    );
    println!("  Best:        {:.1} ({})", summary.best, summary.best_date);
    println!("  Worst:       {:.1}", summary.worst);
    println!(
        "  Net change:  {:+.1} ({})",
        summary.net_change,
        direction_label(summary.direction)
    );
}

fn direction_label(direction: Direction) -> &'static str {
    match direction {
        Direction::Rising => "rising",
        Direction::Falling => "falling",
        Direction::Flat => "flat",
    }
}
