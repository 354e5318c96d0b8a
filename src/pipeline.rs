//! Parallel feature pipeline.
//!
//! Connects every stage of a run:
//!
//! ```text
//! source_dir ──discover──► FlowSource[] ──load (pool)──► FlowSeries[]
//!                                                            │
//!                                                        Windower
//!                                                            ▼
//!                          FeatureMatrix ◄──assemble── Window[] (flattened)
//!                                │                           │
//!                              CSV (+ .npy)      FeatureExtractor (pool)
//! ```
//!
//! # Failure model
//!
//! - Windows without downlink traffic are skipped and counted
//! - Rows with missing values are dropped at assembly and counted
//! - Any other fault (I/O, malformed input, pool creation) aborts the run
//!   before the output file is written
//! - A run that produces no valid row fails with [`FeatureError::EmptyMatrix`]
//!
//! # Example
//!
//! ```ignore
//! use stream_feature_extractor::prelude::*;
//!
//! let pipeline = PipelineBuilder::new()
//!     .source_dir("data/preprocessed")
//!     .output("data/features", "features.csv")
//!     .chunk_size_ms(90_000)
//!     .build()?;
//!
//! let output = pipeline.run()?;
//! println!("{} rows in {:?}", output.rows, output.output_path);
//! ```
//!
//! # Output Structure
//!
//! | Field | Description |
//! |-------|-------------|
//! | `flows` | Flows loaded |
//! | `packets` | Packets across all flows |
//! | `windows` | Windows extracted |
//! | `skipped` | Windows without downlink traffic |
//! | `dropped_incomplete` | Rows removed for missing values |
//! | `rows` | Rows written |

use crate::batch::{BatchOutput, BatchProcessor};
use crate::config::PipelineConfig;
use crate::error::{FeatureError, Result};
use crate::export::{CsvExporter, NumpyExporter, StagedFiles};
use crate::features::FeatureExtractor;
use crate::flow::{discover_sources, FlowSeries, FlowSource};
use crate::matrix::FeatureMatrix;
use crate::schema::FEATURE_COLUMNS;
use crate::windowing::{Window, Windower};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Flows loaded
    pub flows: usize,

    /// Packets across all flows
    pub packets: usize,

    /// Input rows dropped for missing fields
    pub dropped_input_rows: usize,

    /// Windows submitted for extraction
    pub windows: usize,

    /// Windows skipped for lack of downlink traffic
    pub skipped: usize,

    /// Rows removed at assembly for missing values
    pub dropped_incomplete: usize,

    /// Rows in the final matrix
    pub rows: usize,

    /// Worker threads used
    pub threads: usize,

    /// Wall-clock time of the run
    pub elapsed: Duration,

    /// Path of the written CSV (None when nothing was written)
    pub output_path: Option<PathBuf>,
}

/// Matrix and counters of an extraction, before anything is written.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub matrix: FeatureMatrix,
    pub flows: usize,
    pub packets: usize,
    pub dropped_input_rows: usize,
    pub windows: usize,
    pub skipped: usize,
    pub threads: usize,
}

impl Extraction {
    fn into_output(self, elapsed: Duration, output_path: Option<PathBuf>) -> PipelineOutput {
        PipelineOutput {
            flows: self.flows,
            packets: self.packets,
            dropped_input_rows: self.dropped_input_rows,
            windows: self.windows,
            skipped: self.skipped,
            dropped_incomplete: self.matrix.dropped_incomplete(),
            rows: self.matrix.len(),
            threads: self.threads,
            elapsed,
            output_path,
        }
    }
}

/// Feature extraction pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    windower: Windower,
    extractor: FeatureExtractor,
}

impl Pipeline {
    /// Validate `config` and prepare the stages.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let windower = Windower::new(config.chunk_size_ms);
        let extractor = FeatureExtractor::with_config(config.features.clone())?;
        Ok(Self {
            config,
            windower,
            extractor,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Discover flows in `source_dir`, extract and write the matrix.
    pub fn run(&self) -> Result<PipelineOutput> {
        let start = Instant::now();

        let sources = discover_sources(
            &self.config.source_dir,
            &self.config.file_prefix,
            &self.config.label_rule,
        )?;
        if sources.is_empty() {
            return Err(FeatureError::NoFlows {
                dir: self.config.source_dir.clone(),
                prefix: self.config.file_prefix.clone(),
            });
        }
        let streaming = sources.iter().filter(|s| s.label.is_streaming()).count();
        log::info!(
            "Found {} flows in {} ({} streaming, {} not streaming)",
            sources.len(),
            self.config.source_dir.display(),
            streaming,
            sources.len() - streaming
        );

        // Fail on an unusable output location before doing any work
        fs::create_dir_all(&self.config.out_dir)?;

        let extraction = self.process_sources(&sources)?;
        if extraction.matrix.is_empty() {
            return Err(FeatureError::EmptyMatrix {
                windows: extraction.windows,
            });
        }

        // All files are committed together or not at all
        let output_path = self.config.output_path();
        let mut staged = StagedFiles::new();
        CsvExporter::new().stage(&extraction.matrix, &output_path, &mut staged)?;
        if self.config.export_numpy {
            NumpyExporter::new(&self.config.out_dir).stage(
                &extraction.matrix,
                Some(&self.config),
                &mut staged,
            )?;
        }
        let written = staged.commit()?;
        log::info!("Wrote {} files to {}", written.len(), self.config.out_dir.display());

        log::info!(
            "Feature matrix: {} rows, columns: {}",
            extraction.matrix.len(),
            FEATURE_COLUMNS.join(", ")
        );

        Ok(extraction.into_output(start.elapsed(), Some(output_path)))
    }

    /// Load explicitly labelled flows and extract their matrix.
    ///
    /// Nothing is written.
    pub fn process_sources(&self, sources: &[FlowSource]) -> Result<Extraction> {
        let processor = BatchProcessor::new(self.config.batch.clone())?;
        let flows = processor.load_flows(sources)?;
        self.extract_with(&processor, &flows)
    }

    /// Extract the matrix of flows already in memory.
    pub fn process_flows(&self, flows: &[FlowSeries]) -> Result<Extraction> {
        let processor = BatchProcessor::new(self.config.batch.clone())?;
        self.extract_with(&processor, flows)
    }

    fn extract_with(&self, processor: &BatchProcessor, flows: &[FlowSeries]) -> Result<Extraction> {
        let tasks: Vec<Window<'_>> = flows
            .iter()
            .flat_map(|flow| self.windower.windows(flow))
            .collect();

        let packets = flows.iter().map(FlowSeries::len).sum();
        let dropped_input_rows = flows.iter().map(FlowSeries::dropped_rows).sum();
        log::info!(
            "{} flows, {} packets, {} windows of {} ms",
            flows.len(),
            packets,
            tasks.len(),
            self.windower.chunk_size_ms()
        );

        let BatchOutput {
            vectors,
            tasks: windows,
            skipped,
            threads_used,
            ..
        } = processor.extract(&self.extractor, &tasks)?;

        if skipped > 0 {
            log::info!("Skipped {skipped} windows without downlink traffic");
        }

        let matrix = FeatureMatrix::from_vectors(vectors);

        Ok(Extraction {
            matrix,
            flows: flows.len(),
            packets,
            dropped_input_rows,
            windows,
            skipped,
            threads: threads_used,
        })
    }
}
