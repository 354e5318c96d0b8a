//! Feature matrix assembly.
//!
//! Rows arrive from the worker pool in no particular order. Assembly keeps
//! only complete rows (every feature finite) and reports how many were
//! removed.

use crate::features::FeatureVector;
use crate::flow::StreamingLabel;
use crate::schema::{COLUMN_COUNT, FEATURE_COLUMNS, FEATURE_COUNT};
use crate::validation::first_non_finite;

/// Stacked feature rows sharing the fixed column schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    rows: Vec<FeatureVector>,
    dropped_incomplete: usize,
}

impl FeatureMatrix {
    /// Stack `vectors`, dropping rows that contain NaN or infinite values.
    pub fn from_vectors<I>(vectors: I) -> Self
    where
        I: IntoIterator<Item = FeatureVector>,
    {
        let mut rows = Vec::new();
        let mut dropped = 0usize;

        for vector in vectors {
            match first_non_finite(&vector.features()) {
                None => rows.push(vector),
                Some(col) => {
                    dropped += 1;
                    log::debug!("Dropping incomplete row: {} is not finite", FEATURE_COLUMNS[col]);
                }
            }
        }

        if dropped > 0 {
            log::warn!(
                "Dropped {} incomplete rows ({} kept)",
                dropped,
                rows.len()
            );
        }

        Self {
            rows,
            dropped_incomplete: dropped,
        }
    }

    pub fn rows(&self) -> &[FeatureVector] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows removed for missing values.
    pub fn dropped_incomplete(&self) -> usize {
        self.dropped_incomplete
    }

    pub fn n_columns(&self) -> usize {
        COLUMN_COUNT
    }

    pub fn columns(&self) -> &'static [&'static str] {
        &FEATURE_COLUMNS
    }

    /// Rows in a stable order (lexicographic on values).
    ///
    /// Parallel extraction does not preserve row order; sorting makes two
    /// matrices from the same inputs directly comparable.
    pub fn sorted_rows(&self) -> Vec<[f64; COLUMN_COUNT]> {
        let mut rows: Vec<[f64; COLUMN_COUNT]> = self.rows.iter().map(|r| r.to_row()).collect();
        rows.sort_by(|a, b| {
            a.iter()
                .zip(b.iter())
                .map(|(x, y)| x.total_cmp(y))
                .find(|o| o.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        rows
    }

    /// Row-major feature values (label excluded).
    pub fn feature_values(&self) -> Vec<f64> {
        let mut values = Vec::with_capacity(self.rows.len() * FEATURE_COUNT);
        for row in &self.rows {
            values.extend_from_slice(&row.features());
        }
        values
    }

    /// Labels in row order.
    pub fn labels(&self) -> Vec<StreamingLabel> {
        self.rows.iter().map(|r| r.streaming).collect()
    }

    /// Number of streaming and non-streaming rows.
    pub fn label_counts(&self) -> (usize, usize) {
        let streaming = self.rows.iter().filter(|r| r.streaming.is_streaming()).count();
        (streaming, self.rows.len() - streaming)
    }
}
