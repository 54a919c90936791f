//! Error taxonomy for snapshot loading and period lookup.
//!
//! Row-level coercion problems are not errors: a bad cell is
//! defaulted and counted in [`LoadStats`](crate::snapshot::LoadStats),
//! never surfaced as an error.

use chrono::NaiveDate;

use crate::normalize::Field;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required column has no match among the known header synonyms.
    #[error("missing required column '{missing}' (available columns: {})", .available.join(", "))]
    Schema {
        missing: Field,
        available: Vec<String>,
    },

    /// The file could not be read or its table structure could not be parsed.
    #[error("failed to load '{name}': {reason}")]
    Load { name: String, reason: String },

    /// The requested period is not present in the repository.
    #[error("no snapshot for period {period}")]
    NotFound { period: NaiveDate },

    /// No usable snapshot exists at all.
    #[error("no keyword data available")]
    NoData,
}

impl Error {
    pub fn load(name: impl Into<String>, reason: impl ToString) -> Self {
        Error::Load {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the caller can fix this by choosing different input
    /// (another period, another file) rather than it being a broken file.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, Error::NotFound { .. } | Error::NoData)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
