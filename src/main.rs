//! # Keyword Pulse CLI (`kwp`)
//!
//! Compares keyword-performance exports across periods.
//!
//! ## Usage
//!
//! ```bash
//! kwp --config ./config/kwp.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kwp periods` | List discovered periods, undated and skipped files |
//! | `kwp top` | Filtered, sorted keyword table for one snapshot |
//! | `kwp stats` | Summary metrics and position distribution |
//! | `kwp opportunities` | High-impression/low-click, quick-win and high-CTR keywords |
//! | `kwp compare` | Position changes between two periods |
//! | `kwp history` | Change counts for every pair of adjacent periods |
//! | `kwp trend <keyword>` | One keyword's position across all periods |
//! | `kwp export snapshot\|compare` | Write CSV or JSON |
//!
//! ## Examples
//!
//! ```bash
//! # Two most recent periods
//! kwp compare
//!
//! # Explicit periods, 20 movers each way
//! kwp compare --from 2025-10-01 --to 20251101 --movers 20
//!
//! # First-page keywords of a single file, by clicks
//! kwp top --file ./exports/gsc-2025-11-14.xlsx --range 1-10 --sort clicks
//!
//! # Comparison as CSV
//! kwp export compare --output ./out/changes.csv
//! ```
//!
//! ## Logging
//!
//! Logs go to stderr. `KWP_LOG` sets the filter (default
//! `keyword_pulse=info,warn`, or debug when `DEBUG` is set);
//! `KWP_LOG_FORMAT=json` switches to JSON lines.

use std::env;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use keyword_pulse::compare_cmd::{self, PeriodPair};
use keyword_pulse::config::{self, Config};
use keyword_pulse::export::{self, ExportFormat};
use keyword_pulse::ingest::SnapshotSelector;
use keyword_pulse::top::ViewOverrides;
use keyword_pulse::{opportunities, periods, stats, top, trend_cmd};
use keyword_pulse_core::period::parse_period_arg;
use keyword_pulse_core::view::{PositionRange, SortField};

const DEFAULT_CONFIG: &str = "./config/kwp.toml";

/// Keyword Pulse: historical comparison of keyword-performance exports.
///
/// Every command accepts `--config`, a TOML file. Without it,
/// `./config/kwp.toml` is used when present, otherwise the current
/// directory is scanned with default settings.
#[derive(Parser)]
#[command(
    name = "kwp",
    about = "Keyword Pulse — compare keyword-performance exports across periods",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults to `./config/kwp.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory to scan for exports, overriding `[source].root`.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Snapshot selection shared by the single-snapshot commands.
#[derive(clap::Args, Debug, Clone)]
struct SnapshotArgs {
    /// Read this export file directly instead of scanning the source root.
    #[arg(long, conflicts_with = "period")]
    file: Option<PathBuf>,

    /// Period to show (YYYY-MM-DD or YYYYMMDD). Defaults to the latest.
    #[arg(long, value_parser = parse_date)]
    period: Option<NaiveDate>,
}

impl From<SnapshotArgs> for SnapshotSelector {
    fn from(args: SnapshotArgs) -> Self {
        SnapshotSelector {
            file: args.file,
            period: args.period,
        }
    }
}

/// View filters shared by `top` and `stats`.
#[derive(clap::Args, Debug, Clone)]
struct ViewArgs {
    /// Position band: `1-3`, `4-6`, `7-10`, `1-10`, or `none`.
    #[arg(long)]
    range: Option<PositionRange>,

    /// Case-insensitive keyword substring.
    #[arg(long)]
    search: Option<String>,

    /// Minimum CTR as a fraction (0.05 = 5%).
    #[arg(long, value_parser = parse_fraction)]
    min_ctr: Option<f64>,
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct PairArgs {
    /// Earlier period (YYYY-MM-DD or YYYYMMDD).
    #[arg(long, value_parser = parse_date)]
    from: Option<NaiveDate>,

    /// Later period (YYYY-MM-DD or YYYYMMDD).
    #[arg(long, value_parser = parse_date)]
    to: Option<NaiveDate>,
}

impl From<PairArgs> for PeriodPair {
    fn from(args: PairArgs) -> Self {
        PeriodPair {
            from: args.from,
            to: args.to,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List dated periods, undated files, superseded and skipped files.
    Periods,

    /// Show the keyword table for the latest (or a chosen) snapshot.
    Top {
        #[command(flatten)]
        snapshot: SnapshotArgs,

        #[command(flatten)]
        view: ViewArgs,

        /// Sort by `impressions`, `clicks`, `ctr`, or `position`.
        #[arg(long)]
        sort: Option<SortField>,

        /// Maximum number of rows.
        #[arg(long, value_parser = parse_positive)]
        limit: Option<usize>,
    },

    /// Summary metrics and position distribution.
    Stats {
        #[command(flatten)]
        snapshot: SnapshotArgs,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Keywords worth acting on, in three buckets.
    Opportunities {
        #[command(flatten)]
        snapshot: SnapshotArgs,

        /// Maximum rows printed per bucket.
        #[arg(long, value_parser = parse_positive)]
        limit: Option<usize>,
    },

    /// Compare two periods. Defaults to the two most recent.
    Compare {
        #[command(flatten)]
        pair: PairArgs,

        /// Improvements and declines to list, each.
        #[arg(long, value_parser = parse_positive)]
        movers: Option<usize>,
    },

    /// Change counts between every pair of adjacent periods.
    History,

    /// Position of one keyword across all periods.
    Trend {
        /// Keyword (matched case- and whitespace-insensitively).
        keyword: String,
    },

    /// Write a snapshot or a comparison as CSV or JSON.
    Export {
        #[command(subcommand)]
        target: ExportTarget,
    },
}

#[derive(Subcommand)]
enum ExportTarget {
    /// All keywords of one snapshot.
    Snapshot {
        #[command(flatten)]
        snapshot: SnapshotArgs,

        /// Output file. Defaults to stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// `csv` or `json`.
        #[arg(long, default_value = "csv")]
        format: ExportFormat,
    },
    /// Every keyword of a two-period comparison.
    Compare {
        #[command(flatten)]
        pair: PairArgs,

        /// Output file. Defaults to stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// `csv` or `json`.
        #[arg(long, default_value = "csv")]
        format: ExportFormat,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    parse_period_arg(s).ok_or_else(|| format!("invalid date '{}': use YYYY-MM-DD or YYYYMMDD", s))
}

fn parse_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!("invalid count '{}': must be a whole number of at least 1", s)),
    }
}

fn parse_fraction(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if (0.0..=1.0).contains(&v) => Ok(v),
        _ => Err(format!("invalid CTR '{}': must be a fraction between 0 and 1", s)),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("KWP_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "keyword_pulse=debug,info"
        } else {
            "keyword_pulse=info,warn"
        })
    });

    let format = env::var("KWP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::load_or_minimal(Path::new(DEFAULT_CONFIG))?,
    };
    if let Some(root) = &cli.root {
        cfg.source.root = root.clone();
    }
    Ok(cfg)
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = load_config(&cli)?;

    match cli.command {
        Commands::Periods => {
            periods::list_periods(&cfg)?;
        }
        Commands::Top {
            snapshot,
            view,
            sort,
            limit,
        } => {
            let overrides = ViewOverrides {
                sort,
                range: view.range,
                search: view.search,
                min_ctr: view.min_ctr,
                limit,
            };
            top::run_top(&cfg, &snapshot.into(), overrides)?;
        }
        Commands::Stats { snapshot, view } => {
            let overrides = ViewOverrides {
                range: view.range,
                search: view.search,
                min_ctr: view.min_ctr,
                ..ViewOverrides::default()
            };
            stats::run_stats(&cfg, &snapshot.into(), overrides)?;
        }
        Commands::Opportunities { snapshot, limit } => {
            opportunities::run_opportunities(&cfg, &snapshot.into(), limit)?;
        }
        Commands::Compare { pair, movers } => {
            compare_cmd::run_compare(&cfg, pair.into(), movers)?;
        }
        Commands::History => {
            compare_cmd::run_history(&cfg)?;
        }
        Commands::Trend { keyword } => {
            trend_cmd::run_trend(&cfg, &keyword)?;
        }
        Commands::Export { target } => match target {
            ExportTarget::Snapshot {
                snapshot,
                output,
                format,
            } => {
                export::run_export_snapshot(&cfg, &snapshot.into(), output.as_deref(), format)?;
            }
            ExportTarget::Compare {
                pair,
                output,
                format,
            } => {
                export::run_export_compare(&cfg, pair.into(), output.as_deref(), format)?;
            }
        },
    }

    Ok(())
}
