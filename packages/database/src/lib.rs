#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Embedded `DuckDB` storage.
//!
//! Holds the Slovenian address matcher, which answers the pairwise checks
//! from a local address table, the importer that fills that table from the
//! national register, and the verdict cache keyed by a hash of the
//! normalized input.

pub mod cache;
pub mod paths;
pub mod si;
pub mod si_import;

pub use cache::{DuckDbResultCache, ResultCache};
pub use si::SiAddressDb;
pub use si_import::{ImportStats, import_si_addresses};

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    /// A cached value could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The database directory could not be created.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking database task panicked or was cancelled.
    #[error("Database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
