//! # Keyword Pulse
//!
//! Historical comparison of keyword-performance exports (search-console
//! style spreadsheets).
//!
//! Each export file becomes a snapshot for the period named in its file
//! name. Snapshots are ordered into a chronological series and can be
//! compared pairwise, tracked per keyword, and mined for opportunities.
//! The pure engine lives in [`keyword_pulse_core`]; this crate adds file
//! discovery, spreadsheet reading, configuration and the `kwp` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │  Exports    │──▶│   Loader    │──▶│  Repository  │
//! │ CSV / XLSX  │   │ Normalize   │   │  by period   │
//! └─────────────┘   └─────────────┘   └──────┬───────┘
//!                                            │
//!                  ┌──────────────┬──────────┴───┐
//!                  ▼              ▼              ▼
//!            ┌──────────┐  ┌────────────┐  ┌──────────┐
//!            │ Compare  │  │ Opportunity│  │  Trend   │
//!            └──────────┘  └────────────┘  └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! kwp periods                       # what was found
//! kwp top --range 1-10 --limit 20   # latest snapshot
//! kwp compare                       # two latest periods
//! kwp compare --from 2025-10-01 --to 2025-11-01
//! kwp trend "rust tutorial"
//! kwp export compare --output changes.csv
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`connector_fs`] | Export file discovery |
//! | [`extract`] | CSV and XLSX readers |
//! | [`loader`] | File to snapshot |
//! | [`ingest`] | Repository assembly with skip-and-report |
//! | [`export`] | CSV / JSON serialization |
//! | [`compare_cmd`] | Period comparison and history |

pub mod compare_cmd;
pub mod config;
pub mod connector_fs;
pub mod export;
pub mod extract;
pub mod ingest;
pub mod loader;
pub mod opportunities;
pub mod periods;
pub mod stats;
pub mod top;
pub mod trend_cmd;
