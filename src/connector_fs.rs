use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::config::SourceConfig;

/// An export file found under the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub path: PathBuf,
    /// Path relative to the source root, `/`-separated.
    pub relative: String,
    pub size: u64,
    pub modified_secs: i64,
}

/// Find export files under `source.root`.
///
/// Results are sorted by relative path; that order is the ingestion order
/// used to settle files that resolve to the same period.
pub fn scan_exports(source: &SourceConfig) -> Result<Vec<ExportFile>> {
    let root = &source.root;
    if !root.exists() {
        bail!("Source root does not exist: {}", root.display());
    }

    let include_set = build_globset(&source.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/~$*".to_string(),
    ];
    default_excludes.extend(source.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut files = Vec::new();

    let walker = WalkDir::new(root).follow_links(source.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) {
            continue;
        }

        if !include_set.is_match(&rel_str) {
            continue;
        }

        let metadata = entry.metadata()?;
        let modified_secs = metadata
            .modified()
            .ok()
            .and_then(|m| m.duration_since(std::time::SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        files.push(ExportFile {
            path: path.to_path_buf(),
            relative: rel_str,
            size: metadata.len(),
            modified_secs,
        });
    }

    files.sort_by(|a, b| a.relative.cmp(&b.relative));

    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
