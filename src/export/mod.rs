//! Matrix export.
//!
//! # Supported Formats
//!
//! - CSV with the fixed 14-column header (primary artifact)
//! - NumPy (.npy) features and labels plus JSON metadata, for Python tooling
//!
//! Every file is first written under a `.partial` staging name and collected
//! in a [`StagedFiles`] set. The set is renamed into place in one commit; if
//! any write or rename fails, nothing from the set is left in the output
//! directory.
//!
//! # Example
//!
//! ```ignore
//! use stream_feature_extractor::export::{CsvExporter, NumpyExporter, StagedFiles};
//!
//! let mut staged = StagedFiles::new();
//! CsvExporter::new().stage(&matrix, "data/features/features.csv", &mut staged)?;
//! NumpyExporter::new("data/features").stage(&matrix, Some(&config), &mut staged)?;
//! staged.commit()?;
//! ```

use crate::config::PipelineConfig;
use crate::error::{FeatureError, Result};
use crate::matrix::FeatureMatrix;
use crate::schema::{FeatureDef, FeatureSchema, FEATURE_COLUMNS, FEATURE_COUNT, SCHEMA_VERSION};
use ndarray::{Array1, Array2};
use ndarray_npy::WriteNpyExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

// ============================================================================
// Staging
// ============================================================================

/// Path used while a file is being written.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

/// Output files written under staging names, waiting to be committed.
///
/// Dropping an uncommitted set removes its staging files.
#[derive(Debug, Default)]
pub struct StagedFiles {
    /// `(staging, destination)` pairs in commit order
    entries: Vec<(PathBuf, PathBuf)>,
}

impl StagedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Destinations of the staged files, in commit order.
    pub fn destinations(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|(_, dest)| dest.as_path())
    }

    /// Write `path` under its staging name.
    ///
    /// The staging file is tracked as soon as it exists, so a failing
    /// `write` leaves it to be removed with the set.
    pub fn stage<F>(&mut self, path: &Path, write: F) -> Result<()>
    where
        F: FnOnce(&mut BufWriter<File>) -> Result<()>,
    {
        let staging = staging_path(path);
        let file = File::create(&staging)?;
        self.entries.push((staging, path.to_path_buf()));

        let mut file = BufWriter::new(file);
        write(&mut file)?;
        file.flush()?;
        Ok(())
    }

    /// Rename every staged file into place.
    ///
    /// If a rename fails, files already moved by this commit are removed
    /// and the remaining staging files are deleted.
    pub fn commit(mut self) -> Result<Vec<PathBuf>> {
        let entries = std::mem::take(&mut self.entries);
        let mut committed: Vec<PathBuf> = Vec::with_capacity(entries.len());

        for (i, (staging, dest)) in entries.iter().enumerate() {
            if let Err(e) = fs::rename(staging, dest) {
                log::warn!(
                    "Failed to move {} into place, rolling back {} files",
                    dest.display(),
                    committed.len()
                );
                for path in &committed {
                    fs::remove_file(path).ok();
                }
                for (pending, _) in &entries[i..] {
                    fs::remove_file(pending).ok();
                }
                return Err(FeatureError::Io(e));
            }
            committed.push(dest.clone());
        }

        Ok(committed)
    }
}

impl Drop for StagedFiles {
    fn drop(&mut self) {
        for (staging, _) in &self.entries {
            fs::remove_file(staging).ok();
        }
    }
}

/// Text form of a feature value: shortest round-trip digits, always with a
/// fractional part (`2.0`, `0.1`, `1e-7`).
fn format_value(value: f64) -> String {
    format!("{value:?}")
}

// ============================================================================
// CSV
// ============================================================================

/// Writes the matrix as CSV, no index column.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter;

impl CsvExporter {
    pub fn new() -> Self {
        Self
    }

    /// Write `matrix` to `path`, header first.
    ///
    /// The label column is written as `1` / `0`.
    pub fn export<P: AsRef<Path>>(&self, matrix: &FeatureMatrix, path: P) -> Result<PathBuf> {
        let path = path.as_ref();
        let mut staged = StagedFiles::new();
        self.stage(matrix, path, &mut staged)?;
        staged.commit()?;
        Ok(path.to_path_buf())
    }

    /// Write `matrix` under the staging name of `path` and add it to `staged`.
    pub fn stage<P: AsRef<Path>>(
        &self,
        matrix: &FeatureMatrix,
        path: P,
        staged: &mut StagedFiles,
    ) -> Result<()> {
        let path = path.as_ref();
        staged.stage(path, |file| Self::write_rows(matrix, path, file))?;
        log::info!("Staged {} rows for {}", matrix.len(), path.display());
        Ok(())
    }

    fn write_rows(matrix: &FeatureMatrix, path: &Path, file: &mut BufWriter<File>) -> Result<()> {
        let mut writer = csv::Writer::from_writer(file);
        writer
            .write_record(FEATURE_COLUMNS)
            .map_err(|e| FeatureError::csv(path, e))?;

        let mut record: Vec<String> = Vec::with_capacity(FEATURE_COLUMNS.len());
        for row in matrix.rows() {
            record.clear();
            record.extend(row.features().iter().map(|&v| format_value(v)));
            record.push(if row.streaming.is_streaming() { "1" } else { "0" }.to_string());
            writer
                .write_record(&record)
                .map_err(|e| FeatureError::csv(path, e))?;
        }

        writer.flush()?;
        Ok(())
    }
}

// ============================================================================
// NumPy
// ============================================================================

/// Metadata written next to the NumPy arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub n_rows: usize,
    pub n_features: usize,
    pub columns: Vec<String>,
    /// Name, category, description and unit of every column
    pub schema: Vec<FeatureDef>,
    pub streaming_rows: usize,
    pub not_streaming_rows: usize,
    /// Rows removed for missing values before export
    pub dropped_incomplete: usize,
    pub schema_version: String,
    pub export_timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<PipelineConfig>,
}

/// Writes `features.npy`, `labels.npy` and `metadata.json`.
#[derive(Debug, Clone)]
pub struct NumpyExporter {
    output_dir: PathBuf,
}

impl NumpyExporter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Export `matrix`, recording `config` in the metadata when given.
    pub fn export(
        &self,
        matrix: &FeatureMatrix,
        config: Option<&PipelineConfig>,
    ) -> Result<ExportMetadata> {
        let mut staged = StagedFiles::new();
        let metadata = self.stage(matrix, config, &mut staged)?;
        staged.commit()?;
        Ok(metadata)
    }

    /// Write all three files under staging names and add them to `staged`.
    pub fn stage(
        &self,
        matrix: &FeatureMatrix,
        config: Option<&PipelineConfig>,
        staged: &mut StagedFiles,
    ) -> Result<ExportMetadata> {
        if matrix.is_empty() {
            return Err(FeatureError::Export("no rows to export".to_string()));
        }
        fs::create_dir_all(&self.output_dir)?;

        let rows = matrix.len();
        let features = Array2::from_shape_vec((rows, FEATURE_COUNT), matrix.feature_values())
            .map_err(|e| FeatureError::Export(format!("Failed to create array: {e}")))?;
        let labels: Array1<f64> = matrix.labels().iter().map(|l| l.as_f64()).collect();

        staged.stage(&self.output_dir.join("features.npy"), |file| {
            features
                .write_npy(file)
                .map_err(|e| FeatureError::Export(format!("Failed to write features: {e}")))
        })?;
        staged.stage(&self.output_dir.join("labels.npy"), |file| {
            labels
                .write_npy(file)
                .map_err(|e| FeatureError::Export(format!("Failed to write labels: {e}")))
        })?;

        let (streaming_rows, not_streaming_rows) = matrix.label_counts();
        let metadata = ExportMetadata {
            n_rows: rows,
            n_features: FEATURE_COUNT,
            columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            schema: FeatureSchema::standard().all_features().to_vec(),
            streaming_rows,
            not_streaming_rows,
            dropped_incomplete: matrix.dropped_incomplete(),
            schema_version: SCHEMA_VERSION.to_string(),
            export_timestamp: chrono::Utc::now().to_rfc3339(),
            config: config.cloned(),
        };

        staged.stage(&self.output_dir.join("metadata.json"), |file| {
            serde_json::to_writer_pretty(file, &metadata)
                .map_err(|e| FeatureError::Export(format!("Failed to write metadata: {e}")))
        })?;

        log::info!(
            "NumPy export staged: {} [{} x {}]",
            self.output_dir.display(),
            rows,
            FEATURE_COUNT
        );
        Ok(metadata)
    }
}
