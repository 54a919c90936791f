//! Column normalizer: maps heterogeneous export headers onto the canonical
//! schema.
//!
//! # Matching
//!
//! Headers are compared after trimming, collapsing internal whitespace, and
//! lowercasing. Resolution runs in two passes:
//!
//! 1. **Synonyms.** Each field takes the first unclaimed header that equals
//!    one of its synonyms (`"top queries"`, `"avg. position"`, ...).
//! 2. **Stems.** Fields still unresolved take the first unclaimed header
//!    that *contains* one of their stems (`"position"`, `"impression"`, ...).
//!
//! A header is claimed by at most one field. `keyword`, `position`, and
//! `impressions` are required; `clicks` defaults to 0 and `ctr` is derived.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

/// A canonical field of the keyword schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Keyword,
    Position,
    Impressions,
    Clicks,
    Ctr,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Keyword,
        Field::Position,
        Field::Impressions,
        Field::Clicks,
        Field::Ctr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Keyword => "keyword",
            Field::Position => "position",
            Field::Impressions => "impressions",
            Field::Clicks => "clicks",
            Field::Ctr => "ctr",
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Field::Keyword | Field::Position | Field::Impressions)
    }

    fn synonyms(&self) -> &'static [&'static str] {
        match self {
            Field::Keyword => &[
                "query",
                "queries",
                "top queries",
                "search query",
                "search queries",
                "keyword",
                "keywords",
                "search term",
            ],
            Field::Position => &[
                "position",
                "avg. position",
                "avg position",
                "average position",
                "avg. pos.",
                "pos",
                "rank",
            ],
            Field::Impressions => &["impressions", "impr.", "impr", "impression"],
            Field::Clicks => &["clicks", "click", "url clicks"],
            Field::Ctr => &[
                "ctr",
                "url ctr",
                "click-through rate",
                "click through rate",
            ],
        }
    }

    fn stems(&self) -> &'static [&'static str] {
        match self {
            Field::Keyword => &["quer", "keyword"],
            Field::Position => &["position"],
            Field::Impressions => &["impression"],
            Field::Clicks => &["click"],
            Field::Ctr => &["ctr", "click-through", "click through"],
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stem pass order. CTR runs before clicks so "click-through rate" style
/// headers are not captured by the `click` stem.
const STEM_ORDER: [Field; 5] = [
    Field::Keyword,
    Field::Position,
    Field::Impressions,
    Field::Ctr,
    Field::Clicks,
];

/// A source column bound to a canonical field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Zero-based index into the header row.
    pub index: usize,
    /// Header text as it appears in the source.
    pub name: String,
}

/// Resolved mapping from canonical fields to source columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub keyword: ColumnRef,
    pub position: ColumnRef,
    pub impressions: ColumnRef,
    pub clicks: Option<ColumnRef>,
    pub ctr: Option<ColumnRef>,
}

impl ColumnMap {
    pub fn get(&self, field: Field) -> Option<&ColumnRef> {
        match field {
            Field::Keyword => Some(&self.keyword),
            Field::Position => Some(&self.position),
            Field::Impressions => Some(&self.impressions),
            Field::Clicks => self.clicks.as_ref(),
            Field::Ctr => self.ctr.as_ref(),
        }
    }
}

/// Normalize a header cell for comparison.
pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Resolve the canonical schema from a header row.
///
/// Fails with [`Error::Schema`] naming the first required field that has
/// no matching header.
///
/// ```rust
/// use keyword_pulse_core::normalize::normalize_columns;
///
/// let map = normalize_columns(&["Top queries", "Clicks", "Impressions", "Position"]).unwrap();
/// assert_eq!(map.keyword.name, "Top queries");
/// assert_eq!(map.position.index, 3);
/// assert!(map.ctr.is_none());
/// ```
pub fn normalize_columns<S: AsRef<str>>(headers: &[S]) -> Result<ColumnMap> {
    let normalized: Vec<String> = headers
        .iter()
        .map(|h| normalize_header(h.as_ref()))
        .collect();
    let mut claimed = vec![false; headers.len()];
    let mut resolved: [Option<usize>; 5] = [None; 5];

    for (slot, field) in Field::ALL.iter().enumerate() {
        let hit = (0..normalized.len()).find(|&i| {
            !claimed[i] && field.synonyms().contains(&normalized[i].as_str())
        });
        if let Some(i) = hit {
            claimed[i] = true;
            resolved[slot] = Some(i);
        }
    }

    for field in STEM_ORDER {
        let slot = field_slot(field);
        if resolved[slot].is_some() {
            continue;
        }
        let hit = (0..normalized.len()).find(|&i| {
            !claimed[i]
                && !normalized[i].is_empty()
                && field.stems().iter().any(|stem| normalized[i].contains(stem))
        });
        if let Some(i) = hit {
            claimed[i] = true;
            resolved[slot] = Some(i);
        }
    }

    let column = |field: Field| -> Option<ColumnRef> {
        resolved[field_slot(field)].map(|index| ColumnRef {
            index,
            name: headers[index].as_ref().to_string(),
        })
    };

    let required = |field: Field| -> Result<ColumnRef> {
        column(field).ok_or_else(|| Error::Schema {
            missing: field,
            available: headers.iter().map(|h| h.as_ref().to_string()).collect(),
        })
    };

    Ok(ColumnMap {
        keyword: required(Field::Keyword)?,
        position: required(Field::Position)?,
        impressions: required(Field::Impressions)?,
        clicks: column(Field::Clicks),
        ctr: column(Field::Ctr),
    })
}

fn field_slot(field: Field) -> usize {
    Field::ALL
        .iter()
        .position(|f| *f == field)
        .unwrap_or_default()
}
