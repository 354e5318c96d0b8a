//! Worker pool for window-level fan-out/fan-in.
//!
//! Every window is an independent, read-only unit of work. The processor
//! owns a local Rayon pool, maps a task function over all tasks, blocks
//! until every task has finished and returns the collected results.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      BatchProcessor                        │
//! │  ┌──────────────────────────────────────────────────────┐  │
//! │  │                 Rayon Thread Pool                    │  │
//! │  │                                                      │  │
//! │  │  Thread 1        Thread 2        Thread N            │  │
//! │  │  Window a        Window b        Window c   ...      │  │
//! │  │     │               │               │                │  │
//! │  │     ▼               ▼               ▼                │  │
//! │  │  Option<Row>     Option<Row>     Option<Row>         │  │
//! │  └─────────────────────────┬────────────────────────────┘  │
//! │                            ▼                               │
//! │                       BatchOutput                          │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Failure model
//!
//! A task returning `Ok(None)` is a deliberate skip. A task returning `Err`
//! aborts the whole batch: the first error is returned and no partial
//! output is produced. There is no cancellation or timeout.
//!
//! # Example
//!
//! ```ignore
//! use stream_feature_extractor::batch::{BatchConfig, BatchProcessor};
//!
//! let processor = BatchProcessor::new(BatchConfig::new().with_threads(8))?;
//! let output = processor.extract(&extractor, &windows)?;
//! println!("{} rows, {} skipped", output.vectors.len(), output.skipped);
//! ```
//!
//! # Hardware Configuration
//!
//! | Hardware | Recommended Threads |
//! |----------|---------------------|
//! | 4-core laptop | 4 |
//! | 8-core desktop | 8 |
//! | 32-core server | 24-28 |
//!
//! By default the pool uses every available core.

use crate::error::{FeatureError, Result};
use crate::features::{FeatureExtractor, FeatureVector};
use crate::flow::{FlowSeries, FlowSource};
use crate::windowing::Window;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

// ============================================================================
// Configuration
// ============================================================================

/// Worker pool settings.
///
/// # Example
///
/// ```
/// use stream_feature_extractor::batch::BatchConfig;
///
/// let config = BatchConfig::new().with_threads(4);
/// assert_eq!(config.effective_threads(), 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of worker threads.
    ///
    /// - `None`: available hardware parallelism
    /// - `Some(n)`: exactly n threads
    pub num_threads: Option<usize>,

    /// Stack size per thread in bytes (advanced).
    pub stack_size: Option<usize>,
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of threads to use.
    ///
    /// # Panics
    ///
    /// Panics if threads is 0.
    pub fn with_threads(mut self, threads: usize) -> Self {
        assert!(threads > 0, "Thread count must be > 0");
        self.num_threads = Some(threads);
        self
    }

    /// Set custom stack size per thread (advanced).
    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Configured thread count, or the hardware parallelism.
    pub fn effective_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.num_threads == Some(0) {
            return Err("num_threads must be > 0".to_string());
        }
        if self.stack_size == Some(0) {
            return Err("stack_size must be > 0".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Results
// ============================================================================

/// Collected results of one extraction batch.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    /// Rows of every non-skipped window, in no particular order.
    pub vectors: Vec<FeatureVector>,

    /// Number of windows submitted.
    pub tasks: usize,

    /// Windows skipped for lack of downlink traffic.
    pub skipped: usize,

    /// Wall-clock time of the batch.
    pub elapsed: Duration,

    /// Number of worker threads.
    pub threads_used: usize,
}

impl BatchOutput {
    /// Windows that produced a row.
    pub fn extracted_count(&self) -> usize {
        self.vectors.len()
    }

    /// Windows per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.tasks as f64 / secs
        } else {
            0.0
        }
    }
}

// ============================================================================
// Batch Processor
// ============================================================================

/// Worker pool scoped to one pipeline run.
///
/// The pool is torn down when the processor is dropped.
pub struct BatchProcessor {
    config: BatchConfig,
    pool: rayon::ThreadPool,
}

impl BatchProcessor {
    /// Build the worker pool.
    pub fn new(config: BatchConfig) -> Result<Self> {
        config.validate()?;

        // Local pool: build_global() only works once per process
        let mut pool_builder =
            rayon::ThreadPoolBuilder::new().num_threads(config.effective_threads());
        if let Some(stack_size) = config.stack_size {
            pool_builder = pool_builder.stack_size(stack_size);
        }
        let pool = pool_builder
            .build()
            .map_err(|e| FeatureError::ThreadPool(e.to_string()))?;

        log::info!("Worker pool ready: {} threads", pool.current_num_threads());
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `task` over every item and wait for all of them.
    ///
    /// Results keep the order of `items`. The first error aborts the batch.
    pub fn map<T, R, F>(&self, items: &[T], task: F) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> Result<R> + Sync + Send,
    {
        self.pool
            .install(|| items.par_iter().map(|item| task(item)).collect())
    }

    /// Load flows in parallel.
    pub fn load_flows(&self, sources: &[FlowSource]) -> Result<Vec<FlowSeries>> {
        self.map(sources, FlowSeries::load)
    }

    /// Extract one row per window, dropping skipped windows.
    pub fn extract(
        &self,
        extractor: &FeatureExtractor,
        windows: &[Window<'_>],
    ) -> Result<BatchOutput> {
        let start = Instant::now();
        let results = self.map(windows, |window| extractor.extract(window))?;

        let tasks = results.len();
        let vectors: Vec<FeatureVector> = results.into_iter().flatten().collect();
        let skipped = tasks - vectors.len();

        log::debug!(
            "Extracted {} rows from {} windows ({} skipped)",
            vectors.len(),
            tasks,
            skipped
        );

        Ok(BatchOutput {
            vectors,
            tasks,
            skipped,
            elapsed: start.elapsed(),
            threads_used: self.threads(),
        })
    }
}

impl std::fmt::Debug for BatchProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchProcessor")
            .field("config", &self.config)
            .field("threads", &self.threads())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{Direction, PacketRecord, StreamingLabel};
    use crate::windowing::Windower;

    #[test]
    fn test_batch_config_default() {
        let config = BatchConfig::default();
        assert!(config.num_threads.is_none());
        assert!(config.effective_threads() >= 1);
    }

    #[test]
    #[should_panic(expected = "Thread count must be > 0")]
    fn test_zero_threads_panics() {
        BatchConfig::new().with_threads(0);
    }

    #[test]
    fn test_validate_rejects_zero_threads_from_file() {
        let config = BatchConfig {
            num_threads: Some(0),
            stack_size: None,
        };
        assert!(config.validate().is_err());
        assert!(BatchProcessor::new(config).is_err());
    }

    #[test]
    fn test_map_preserves_order() {
        let processor = BatchProcessor::new(BatchConfig::new().with_threads(3)).unwrap();
        let items: Vec<u32> = (0..100).collect();
        let doubled = processor.map(&items, |x| Ok(x * 2)).unwrap();
        assert_eq!(doubled, items.iter().map(|x| x * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_map_fails_on_any_error() {
        let processor = BatchProcessor::new(BatchConfig::new().with_threads(2)).unwrap();
        let items: Vec<u32> = (0..50).collect();
        let result = processor.map(&items, |&x| {
            if x == 37 {
                Err(FeatureError::Config("boom".to_string()))
            } else {
                Ok(x)
            }
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_extract_counts_skips() {
        // Second window holds only uplink packets
        let packets = vec![
            PacketRecord::new(0, 500, Direction::Sent),
            PacketRecord::new(10, 500, Direction::Received),
            PacketRecord::new(20, 500, Direction::Received),
            PacketRecord::new(1_500, 500, Direction::Sent),
        ];
        let flow = FlowSeries::new("f", StreamingLabel::Streaming, packets);
        let windows: Vec<_> = Windower::new(1_000).windows(&flow).collect();
        assert_eq!(windows.len(), 2);

        let processor = BatchProcessor::new(BatchConfig::new().with_threads(2)).unwrap();
        let output = processor.extract(&FeatureExtractor::new(), &windows).unwrap();
        assert_eq!(output.tasks, 2);
        assert_eq!(output.skipped, 1);
        assert_eq!(output.extracted_count(), 1);
        assert_eq!(output.threads_used, 2);
    }
}
