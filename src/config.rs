//! Pipeline configuration management.
//!
//! One struct holds every parameter of a run, so an experiment can be
//! reproduced from a single TOML or JSON file.
//!
//! # Example
//!
//! ```ignore
//! use stream_feature_extractor::config::PipelineConfig;
//!
//! let config = PipelineConfig::default().with_chunk_size(60_000);
//! config.save_toml("configs/chunk60.toml")?;
//!
//! let loaded = PipelineConfig::load_toml("configs/chunk60.toml")?;
//! let pipeline = Pipeline::from_config(loaded)?;
//! ```
//!
//! # File format
//!
//! ```toml
//! chunk_size_ms = 90000
//! source_dir = "data/preprocessed"
//! out_dir = "data/features"
//! out_file = "features.csv"
//! file_prefix = "preprocessed"
//! export_numpy = false
//!
//! [label_rule]
//! no_video_marker = "novideo"
//!
//! [features]
//! rolling_window_1_ms = 10000
//! rolling_window_2_ms = 60000
//! resample_rate_ms = 500
//! frequency = 2.0
//! large_packet_threshold = 1200
//! small_packet_threshold = 200
//!
//! [batch]
//! num_threads = 8
//! ```

use crate::batch::BatchConfig;
use crate::features::FeatureConfig;
use crate::flow::LabelRule;
use std::fs;
use std::path::{Path, PathBuf};

/// Unified pipeline configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Window width (ms)
    pub chunk_size_ms: u64,

    /// Directory holding the preprocessed flow files
    pub source_dir: PathBuf,

    /// Directory the matrix is written to (created if missing)
    pub out_dir: PathBuf,

    /// File name of the output CSV
    pub out_file: String,

    /// Only files whose name starts with this prefix are loaded
    pub file_prefix: String,

    /// Also write `features.npy`, `labels.npy` and `metadata.json`
    pub export_numpy: bool,

    /// Rule deriving flow labels from file names
    pub label_rule: LabelRule,

    /// Feature extraction parameters
    pub features: FeatureConfig,

    /// Worker pool parameters
    pub batch: BatchConfig,

    /// Experiment metadata (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExperimentMetadata>,
}

/// Experiment metadata for tracking and reproducibility.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExperimentMetadata {
    /// Experiment name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Creation timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Version or git commit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl ExperimentMetadata {
    /// Metadata stamped with the current UTC time.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            created_at: Some(chrono::Utc::now().to_rfc3339()),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
            tags: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size_ms: 90_000,
            source_dir: PathBuf::from("data/preprocessed"),
            out_dir: PathBuf::from("data/features"),
            out_file: "features.csv".to_string(),
            file_prefix: "preprocessed".to_string(),
            label_rule: LabelRule::default(),
            export_numpy: false,
            features: FeatureConfig::default(),
            batch: BatchConfig::default(),
            metadata: None,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(mut self, chunk_size_ms: u64) -> Self {
        self.chunk_size_ms = chunk_size_ms;
        self
    }

    pub fn with_source_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.source_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the output directory and file name.
    pub fn with_output<P: AsRef<Path>>(mut self, dir: P, file: impl Into<String>) -> Self {
        self.out_dir = dir.as_ref().to_path_buf();
        self.out_file = file.into();
        self
    }

    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    pub fn with_label_rule(mut self, rule: LabelRule) -> Self {
        self.label_rule = rule;
        self
    }

    pub fn with_numpy_export(mut self, enabled: bool) -> Self {
        self.export_numpy = enabled;
        self
    }

    pub fn with_features(mut self, config: FeatureConfig) -> Self {
        self.features = config;
        self
    }

    pub fn with_batch(mut self, config: BatchConfig) -> Self {
        self.batch = config;
        self
    }

    pub fn with_metadata(mut self, metadata: ExperimentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Full path of the output CSV.
    pub fn output_path(&self) -> PathBuf {
        self.out_dir.join(&self.out_file)
    }

    /// Validate the configuration.
    ///
    /// Returns Ok(()) if valid, Err(msg) otherwise.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size_ms == 0 {
            return Err("chunk_size_ms must be > 0".to_string());
        }
        if self.chunk_size_ms > i64::MAX as u64 {
            return Err(format!("chunk_size_ms too large: {}", self.chunk_size_ms));
        }
        if self.out_file.trim().is_empty() {
            return Err("out_file must not be empty".to_string());
        }
        if Path::new(&self.out_file).components().count() != 1 {
            return Err(format!(
                "out_file must be a plain file name (got {:?}), use out_dir for the directory",
                self.out_file
            ));
        }
        if self.label_rule.no_video_marker.is_empty() {
            return Err("label_rule.no_video_marker must not be empty".to_string());
        }

        self.features.validate()?;
        self.batch.validate()?;

        Ok(())
    }

    /// Save configuration to TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Load and validate configuration from TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(path, json_string)?;
        Ok(())
    }

    /// Load and validate configuration from JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }
}
