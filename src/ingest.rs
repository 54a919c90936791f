//! Ingestion: discover export files, load each into a snapshot, and
//! assemble the period repository.
//!
//! A file that fails to load (missing column, unreadable structure) is
//! skipped with its reason recorded; the remaining files still load. An
//! ingest with no usable files is a normal, reportable state.

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::{info, warn};

use keyword_pulse_core::repository::PeriodRepository;
use keyword_pulse_core::snapshot::Snapshot;
use keyword_pulse_core::Error;

use crate::config::Config;
use crate::connector_fs::{scan_exports, ExportFile};
use crate::loader;

/// Printed by every command when ingestion produced no usable snapshot.
pub const NO_DATA_MESSAGE: &str = "No keyword data found.";

/// A file left out of the repository, and why.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug)]
pub struct IngestReport {
    pub repository: PeriodRepository,
    pub skipped: Vec<SkippedFile>,
    /// Hex SHA-256 over the discovered file set (path, size, mtime).
    pub fingerprint: String,
    pub files_seen: usize,
}

impl IngestReport {
    /// True when no file produced a usable snapshot.
    pub fn is_empty(&self) -> bool {
        self.repository.is_empty()
    }
}

/// Scan the configured source and load every export found.
pub fn run_ingest(config: &Config) -> Result<IngestReport> {
    let files = scan_exports(&config.source)?;
    info!(root = %config.source.root.display(), files = files.len(), "scanning exports");
    Ok(ingest_files(&files))
}

/// Load `files` in order into a fresh repository.
pub fn ingest_files(files: &[ExportFile]) -> IngestReport {
    let mut repository = PeriodRepository::new();
    let mut skipped = Vec::new();

    for file in files {
        match loader::load_file(&file.path) {
            Ok(snapshot) => {
                repository.add(snapshot);
            }
            Err(e) => {
                warn!(file = %file.path.display(), error = %e, "skipping export");
                skipped.push(SkippedFile {
                    path: file.path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    IngestReport {
        repository,
        skipped,
        fingerprint: fingerprint(files),
        files_seen: files.len(),
    }
}

/// Identity of a file set: changes whenever a file is added, removed,
/// resized, or touched.
pub fn fingerprint(files: &[ExportFile]) -> String {
    let mut hasher = Sha256::new();
    for f in files {
        hasher.update(f.relative.as_bytes());
        hasher.update([0u8]);
        hasher.update(f.size.to_le_bytes());
        hasher.update(f.modified_secs.to_le_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Snapshot selection shared by the single-snapshot commands.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSelector {
    /// Load this file directly, bypassing discovery.
    pub file: Option<PathBuf>,
    /// Pick this period from the repository.
    pub period: Option<chrono::NaiveDate>,
}

/// Resolve a selector into a snapshot.
///
/// Without a file or period the latest snapshot is used. `Ok(None)` means
/// there is no data at all.
pub fn select_snapshot(config: &Config, selector: &SnapshotSelector) -> Result<Option<Snapshot>> {
    if let Some(path) = &selector.file {
        return Ok(Some(loader::load_file(path)?));
    }

    let report = run_ingest(config)?;
    if report.is_empty() {
        return Ok(None);
    }
    let snapshot = match selector.period {
        Some(date) => report.repository.require(date)?.clone(),
        None => report
            .repository
            .latest()
            .cloned()
            .ok_or(Error::NoData)?,
    };
    Ok(Some(snapshot))
}
