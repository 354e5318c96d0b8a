//! Error types for the feature extraction pipeline.
//!
//! Only faults that abort a run live here. Degenerate windows (no downlink
//! traffic) and windows without a detectable spectral peak are ordinary data
//! outcomes and are modelled as `Option` / [`PeakProminence`] values instead.
//!
//! [`PeakProminence`]: crate::features::spectral::PeakProminence

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a feature extraction run.
#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Malformed record in {} at row {row}: {reason}", path.display())]
    MalformedRecord {
        path: PathBuf,
        row: usize,
        reason: String,
    },

    #[error("Invalid flow {flow}: {reason}")]
    InvalidFlow { flow: String, reason: String },

    #[error("Time index is not monotonic at position {index}: {current} < {previous}")]
    NonMonotonicIndex {
        index: usize,
        previous: i64,
        current: i64,
    },

    #[error("Unknown rolling aggregate '{0}'")]
    UnknownAggregate(String),

    #[error("Failed to create worker pool: {0}")]
    ThreadPool(String),

    #[error("Source directory does not exist: {}", .0.display())]
    SourceDirMissing(PathBuf),

    #[error("No flow files matching prefix '{prefix}' in {}", dir.display())]
    NoFlows { dir: PathBuf, prefix: String },

    #[error("No valid feature rows were produced from {windows} windows")]
    EmptyMatrix { windows: usize },

    #[error("Export failed: {0}")]
    Export(String),
}

impl FeatureError {
    /// Wrap a `csv::Error` with the path it came from.
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        FeatureError::Csv {
            path: path.into(),
            source,
        }
    }
}

impl From<String> for FeatureError {
    fn from(msg: String) -> Self {
        FeatureError::Config(msg)
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, FeatureError>;
