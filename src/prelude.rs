//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```ignore
//! use stream_feature_extractor::prelude::*;
//!
//! let pipeline = PipelineBuilder::new().source_dir("data/preprocessed").build()?;
//! let output = pipeline.run()?;
//! ```
//!
//! # What's Included
//!
//! ## Core Pipeline
//! - [`Pipeline`], [`PipelineBuilder`], [`PipelineConfig`], [`PipelineOutput`]
//!
//! ## Flows
//! - [`FlowSeries`], [`FlowSource`], [`PacketRecord`], [`Direction`], [`StreamingLabel`]
//!
//! ## Feature Extraction
//! - [`Windower`], [`FeatureExtractor`], [`FeatureConfig`], [`FeatureVector`], [`FeatureMatrix`]
//!
//! ## Errors
//! - [`FeatureError`], [`Result`]

pub use crate::batch::{BatchConfig, BatchProcessor};
pub use crate::builder::PipelineBuilder;
pub use crate::config::{ExperimentMetadata, PipelineConfig};
pub use crate::error::{FeatureError, Result};
pub use crate::export::{CsvExporter, NumpyExporter};
pub use crate::features::{FeatureConfig, FeatureExtractor, FeatureVector};
pub use crate::flow::{Direction, FlowSeries, FlowSource, LabelRule, PacketRecord, StreamingLabel};
pub use crate::matrix::FeatureMatrix;
pub use crate::pipeline::{Pipeline, PipelineOutput};
pub use crate::schema::FEATURE_COLUMNS;
pub use crate::windowing::{Window, Windower};
