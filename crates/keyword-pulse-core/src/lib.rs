//! # Keyword Pulse Core
//!
//! Pure analytics over keyword-performance exports: canonical models, the
//! column normalizer, snapshot construction, the period repository, the
//! comparison engine, and the opportunity classifier.
//!
//! This crate performs no filesystem or network I/O. Callers hand it raw
//! tables (header + string cells) and file names; everything downstream is
//! a function over immutable [`Snapshot`](snapshot::Snapshot) values.
//!
//! ```text
//! RawTable ──▶ normalize ──▶ Snapshot ──▶ PeriodRepository
//!                                │               │
//!                                ▼               ▼
//!                          opportunity      compare / trend
//! ```

pub mod compare;
pub mod error;
pub mod models;
pub mod normalize;
pub mod opportunity;
pub mod period;
pub mod repository;
pub mod snapshot;
pub mod table;
pub mod trend;
pub mod view;

pub use error::{Error, Result};
