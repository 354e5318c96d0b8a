//! Stream Feature Extractor
//!
//! Windowed statistical and spectral features for detecting video streaming
//! inside tunneled network flows.
//!
//! # Overview
//!
//! Each preprocessed flow (packet time, size, direction) is cut into
//! fixed-duration windows. Every window becomes one row of 13 features plus
//! a binary `streaming` label:
//!
//! - uplink/downlink byte and packet ratios
//! - rolling mean inter-packet delay over two time horizons
//! - mean packet size and large/small size-class proportions per direction
//! - longest uplink and downlink streaks
//! - the strongest peak prominence of the traffic's amplitude spectrum
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   Stream Feature Extractor                      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  flow/        - Packet records, flow loading, labelling         │
//! │  windowing/   - Fixed-width time windows                        │
//! │  features/    - Per-window features (rolling, spectral, ...)    │
//! │  matrix/      - Row assembly, incomplete-row filtering          │
//! │  batch/       - Worker pool fan-out / fan-in                    │
//! │  pipeline/    - End-to-end run                                  │
//! │  export/      - CSV and NumPy output                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use stream_feature_extractor::prelude::*;
//!
//! let pipeline = Pipeline::from_config(PipelineConfig::load_toml("features.toml")?)?;
//! let output = pipeline.run()?;
//! println!("{} rows", output.rows);
//! ```

pub mod batch;
pub mod builder;
pub mod config;
pub mod error;
pub mod export;
pub mod features;
pub mod flow;
pub mod matrix;
pub mod pipeline;
pub mod prelude;
pub mod schema;
pub mod validation;
pub mod windowing;

// Re-exports - Errors
pub use error::{FeatureError, Result};

// Re-exports - Schema
pub use schema::{FeatureCategory, FeatureDef, FeatureSchema, FEATURE_COLUMNS};

// Re-exports - Config
pub use builder::PipelineBuilder;
pub use config::{ExperimentMetadata, PipelineConfig};

// Re-exports - Flows and windows
pub use flow::{
    discover_sources, Direction, FlowSeries, FlowSource, LabelRule, PacketRecord, StreamingLabel,
};
pub use windowing::{Window, Windower};

// Re-exports - Features
pub use features::{
    longest_streak, FeatureConfig, FeatureExtractor, FeatureVector, PeakProminence,
    RollingAggregator, RollingStat, SpectralProminenceEstimator,
};
pub use matrix::FeatureMatrix;

// Re-exports - Parallelism
pub use batch::{BatchConfig, BatchOutput, BatchProcessor};

// Re-exports - Export
pub use export::{CsvExporter, ExportMetadata, NumpyExporter, StagedFiles};

// Re-exports - Validation
pub use validation::{validate_flow_times, ValidationLevel, ValidationResult};

// Re-exports - Pipeline
pub use pipeline::{Extraction, Pipeline, PipelineOutput};
