use anyhow::{Context, Result};
use globset::Glob;
use keyword_pulse_core::opportunity::Thresholds;
use keyword_pulse_core::view::{PositionRange, SortField, ViewOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub opportunity: Thresholds,
    #[serde(default)]
    pub compare: CompareConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.xlsx".to_string(),
        "**/*.csv".to_string(),
        "**/*.xls".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ViewConfig {
    #[serde(default)]
    pub sort: SortField,
    #[serde(default)]
    pub position_range: PositionRange,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub min_ctr: f64,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            sort: SortField::default(),
            position_range: PositionRange::default(),
            search: None,
            min_ctr: 0.0,
            limit: default_limit(),
        }
    }
}

fn default_limit() -> usize {
    50
}

impl ViewConfig {
    pub fn options(&self) -> ViewOptions {
        ViewOptions {
            sort: self.sort,
            range: self.position_range,
            search: self.search.clone(),
            min_ctr: self.min_ctr,
            limit: Some(self.limit),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompareConfig {
    #[serde(default = "default_movers")]
    pub movers: usize,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            movers: default_movers(),
        }
    }
}

fn default_movers() -> usize {
    10
}

impl Config {
    /// Configuration used when no config file exists: scan the current
    /// directory with default views and thresholds.
    pub fn minimal() -> Self {
        Self {
            source: SourceConfig::default(),
            view: ViewConfig::default(),
            opportunity: Thresholds::default(),
            compare: CompareConfig::default(),
        }
    }

    /// Load `path`, or [`Config::minimal`] if the file does not exist.
    pub fn load_or_minimal(path: &Path) -> Result<Self> {
        if path.exists() {
            load_config(path)
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::minimal())
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate source
    if config.source.include_globs.is_empty() {
        anyhow::bail!("source.include_globs must not be empty");
    }
    for pattern in config
        .source
        .include_globs
        .iter()
        .chain(&config.source.exclude_globs)
    {
        Glob::new(pattern).with_context(|| format!("Invalid glob pattern: '{}'", pattern))?;
    }

    // Validate view
    if config.view.limit < 1 {
        anyhow::bail!("view.limit must be >= 1");
    }
    if !(0.0..=1.0).contains(&config.view.min_ctr) {
        anyhow::bail!("view.min_ctr must be in [0.0, 1.0]");
    }

    // Validate thresholds
    let t = &config.opportunity;
    if !(0.0..=1.0).contains(&t.ctr_low_threshold) {
        anyhow::bail!("opportunity.ctr_low_threshold must be in [0.0, 1.0]");
    }
    if !(0.0..=1.0).contains(&t.ctr_high_threshold) {
        anyhow::bail!("opportunity.ctr_high_threshold must be in [0.0, 1.0]");
    }

    // Validate compare
    if config.compare.movers < 1 {
        anyhow::bail!("compare.movers must be >= 1");
    }

    Ok(())
}
