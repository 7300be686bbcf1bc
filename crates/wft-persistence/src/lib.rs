//! ---
//! wft_section: "03-persistence"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Persistence abstractions and storage bindings."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Storage primitives shared by every pipeline tier.
//!
//! [`PartitionedTable`] is an append-only, hive-partitioned CSV dataset and
//! [`ProcessedKeyStore`] keeps the named sets of bucket keys that make the
//! curation and aggregation stages idempotent.

use std::path::PathBuf;

/// Result alias used throughout the persistence crate.
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Error type for the persistence subsystem.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Wrapper for IO errors encountered while reading/writing table or state files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for CSV encoding and decoding failures.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    /// Wrapper for JSON serialization issues in state files.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Raised while walking a table directory tree.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    /// Raised when a temp file cannot be renamed into place.
    #[error("unable to persist {path}: {source}")]
    Persist {
        /// Final destination of the write.
        path: PathBuf,
        /// Underlying rename failure.
        #[source]
        source: std::io::Error,
    },
    /// A row produced the wrong number of partition values.
    #[error("expected {expected} partition values, got {actual}")]
    PartitionArity {
        /// Number of partition columns the table declares.
        expected: usize,
        /// Number of values supplied for the row.
        actual: usize,
    },
    /// A partition directory name could not be decoded.
    #[error("malformed partition segment '{segment}' under {path}")]
    MalformedPartition {
        /// Offending directory name.
        segment: String,
        /// Data file whose path contained the segment.
        path: PathBuf,
    },
}

pub mod state;
pub mod table;

pub use state::{ProcessedKeyStore, ProcessedSet};
pub use table::{PartitionedRow, PartitionedTable};
