//! Fluent builder for pipeline configuration.
//!
//! # Quick Start
//!
//! ```ignore
//! use stream_feature_extractor::PipelineBuilder;
//!
//! let pipeline = PipelineBuilder::new()
//!     .source_dir("data/preprocessed")
//!     .build()?;
//!
//! let output = pipeline.run()?;
//! ```
//!
//! # Common Configurations
//!
//! ## Shorter windows, faster spectral sampling
//!
//! ```ignore
//! let pipeline = PipelineBuilder::new()
//!     .chunk_size_ms(30_000)
//!     .rolling_windows_ms(5_000, 20_000)
//!     .resample_rate_ms(250)
//!     .frequency(4.0)
//!     .build()?;
//! ```
//!
//! ## Explicit thread count with NumPy export
//!
//! ```ignore
//! let pipeline = PipelineBuilder::new()
//!     .threads(8)
//!     .output("data/features", "features_8t.csv")
//!     .with_numpy_export()
//!     .build()?;
//! ```

use crate::batch::BatchConfig;
use crate::config::{ExperimentMetadata, PipelineConfig};
use crate::error::Result;
use crate::features::FeatureConfig;
use crate::flow::LabelRule;
use crate::pipeline::Pipeline;
use std::path::Path;

/// Fluent builder for pipeline configurations.
///
/// Starts from [`PipelineConfig::default`]; the configuration is validated
/// when built.
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    // =========================================================================
    // Windowing and features
    // =========================================================================

    /// Window width in milliseconds.
    pub fn chunk_size_ms(mut self, chunk_size_ms: u64) -> Self {
        self.config.chunk_size_ms = chunk_size_ms;
        self
    }

    /// Short and long rolling-delay horizons in milliseconds.
    pub fn rolling_windows_ms(mut self, first_ms: u64, second_ms: u64) -> Self {
        self.config.features = self.config.features.with_rolling_windows(first_ms, second_ms);
        self
    }

    pub fn resample_rate_ms(mut self, resample_rate_ms: u64) -> Self {
        self.config.features = self.config.features.with_resample_rate(resample_rate_ms);
        self
    }

    /// Sampling frequency of the spectral estimate (Hz).
    pub fn frequency(mut self, frequency: f64) -> Self {
        self.config.features = self.config.features.with_frequency(frequency);
        self
    }

    /// Large/small packet size thresholds in bytes.
    pub fn size_thresholds(mut self, large: u64, small: u64) -> Self {
        self.config.features = self.config.features.with_size_thresholds(large, small);
        self
    }

    pub fn features(mut self, features: FeatureConfig) -> Self {
        self.config.features = features;
        self
    }

    // =========================================================================
    // Input / output
    // =========================================================================

    pub fn source_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.config = self.config.with_source_dir(dir);
        self
    }

    /// Output directory and CSV file name.
    pub fn output<P: AsRef<Path>>(mut self, dir: P, file: &str) -> Self {
        self.config = self.config.with_output(dir, file);
        self
    }

    pub fn file_prefix(mut self, prefix: &str) -> Self {
        self.config.file_prefix = prefix.to_string();
        self
    }

    /// Marker in file names of captures without video.
    pub fn no_video_marker(mut self, marker: &str) -> Self {
        self.config.label_rule = LabelRule::new(marker);
        self
    }

    pub fn with_numpy_export(mut self) -> Self {
        self.config.export_numpy = true;
        self
    }

    // =========================================================================
    // Parallelism
    // =========================================================================

    /// Number of worker threads.
    ///
    /// # Panics
    ///
    /// Panics if threads is 0.
    pub fn threads(mut self, threads: usize) -> Self {
        self.config.batch = self.config.batch.clone().with_threads(threads);
        self
    }

    pub fn batch(mut self, batch: BatchConfig) -> Self {
        self.config.batch = batch;
        self
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Set experiment metadata for tracking and reproducibility.
    pub fn experiment(mut self, name: &str, description: &str) -> Self {
        self.config.metadata = Some(ExperimentMetadata::new(name).with_description(description));
        self
    }

    pub fn with_metadata(mut self, metadata: ExperimentMetadata) -> Self {
        self.config.metadata = Some(metadata);
        self
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// Validate and return the configuration.
    pub fn build_config(self) -> std::result::Result<PipelineConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Build a ready-to-run pipeline.
    pub fn build(self) -> Result<Pipeline> {
        let config = self.build_config()?;
        Pipeline::from_config(config)
    }

    /// Human-readable summary of the current configuration.
    pub fn summary(&self) -> String {
        let c = &self.config;
        let threads = c
            .batch
            .num_threads
            .map_or_else(|| "auto".to_string(), |n| n.to_string());

        format!(
            "PipelineBuilder Summary:\n\
             - Source: {} (prefix '{}')\n\
             - Output: {}\n\
             - Window: {} ms\n\
             - Rolling delay: {} ms / {} ms\n\
             - Spectral: {} ms buckets at {} Hz\n\
             - Threads: {}\n\
             - NumPy export: {}",
            c.source_dir.display(),
            c.file_prefix,
            c.output_path().display(),
            c.chunk_size_ms,
            c.features.rolling_window_1_ms,
            c.features.rolling_window_2_ms,
            c.features.resample_rate_ms,
            c.features.frequency,
            threads,
            c.export_numpy,
        )
    }
}
