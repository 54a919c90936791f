//! `kwp top`: the filtered, sorted keyword table for one snapshot.

use anyhow::Result;

use keyword_pulse_core::models::KeywordRow;
use keyword_pulse_core::view::{select, PositionRange, SortField, ViewOptions};

use crate::config::Config;
use crate::ingest::{select_snapshot, SnapshotSelector, NO_DATA_MESSAGE};

/// Per-invocation overrides of the `[view]` config section.
#[derive(Debug, Clone, Default)]
pub struct ViewOverrides {
    pub sort: Option<SortField>,
    pub range: Option<PositionRange>,
    pub search: Option<String>,
    pub min_ctr: Option<f64>,
    pub limit: Option<usize>,
}

impl ViewOverrides {
    pub fn apply(self, config: &Config) -> ViewOptions {
        let mut options = config.view.options();
        if let Some(sort) = self.sort {
            options.sort = sort;
        }
        if let Some(range) = self.range {
            options.range = range;
        }
        if self.search.is_some() {
            options.search = self.search;
        }
        if let Some(min_ctr) = self.min_ctr {
            options.min_ctr = min_ctr;
        }
        if let Some(limit) = self.limit {
            options.limit = Some(limit);
        }
        options
    }
}

pub fn run_top(
    config: &Config,
    selector: &SnapshotSelector,
    overrides: ViewOverrides,
) -> Result<()> {
    let Some(snapshot) = select_snapshot(config, selector)? else {
        println!("{}", NO_DATA_MESSAGE);
        return Ok(());
    };

    let options = overrides.apply(config);
    let rows = select(&snapshot, &options);

    println!(
        "{} ({}) sort={} range={}",
        snapshot.name(),
        snapshot.period(),
        sort_label(options.sort),
        options.range
    );
    println!();

    if rows.is_empty() {
        println!("No results.");
        return Ok(());
    }

    print_rows(&rows);
    println!();
    println!("{} of {} keywords", rows.len(), snapshot.len());
    Ok(())
}

pub(crate) fn print_rows(rows: &[&KeywordRow]) {
    println!(
        "  {:<40} {:>8} {:>12} {:>8} {:>7}",
        "KEYWORD", "POSITION", "IMPRESSIONS", "CLICKS", "CTR"
    );
    println!("  {}", "-".repeat(79));
    for row in rows {
        println!(
            "  {:<40} {:>8.1} {:>12} {:>8} {:>6.2}%",
            truncate(&row.keyword, 40),
            row.position,
            row.impressions,
            row.clicks,
            row.ctr * 100.0
        );
    }
}

fn sort_label(sort: SortField) -> &'static str {
    match sort {
        SortField::Impressions => "impressions",
        SortField::Clicks => "clicks",
        SortField::Ctr => "ctr",
        SortField::Position => "position",
    }
}

pub(crate) fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
