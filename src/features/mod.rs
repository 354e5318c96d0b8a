//! Per-window feature extraction.
//!
//! A window becomes one row of 13 features plus its label:
//!
//! - `traffic`: byte/packet counts, ratios, mean sizes, size classes
//! - `rolling`: time-based rolling mean of the inter-packet delay
//! - `spectral`: peak prominence of the resampled size spectrum
//! - `streak`: longest uplink/downlink runs
//!
//! Windows without downlink traffic yield no row.
//!
//! # Delay frame
//!
//! The inter-packet delay of a window's first packet is undefined. Rolling,
//! spectral and streak features are computed on the packets after the first
//! one, so that every observation they see has a defined delay.
//!
//! # Usage
//!
//! ```ignore
//! use stream_feature_extractor::features::{FeatureConfig, FeatureExtractor};
//!
//! let extractor = FeatureExtractor::with_config(FeatureConfig::default())?;
//! if let Some(row) = extractor.extract(&window)? {
//!     println!("{:?}", row.to_row());
//! }
//! ```

pub mod rolling;
pub mod spectral;
pub mod streak;
pub mod traffic;

pub use rolling::{RollingAggregator, RollingSeries, RollingStat};
pub use spectral::{PeakProminence, SpectralProminenceEstimator};
pub use streak::longest_streak;
pub use traffic::{DirectionStats, TrafficStats};

use crate::error::Result;
use crate::flow::{Direction, StreamingLabel};
use crate::schema::{COLUMN_COUNT, FEATURE_COUNT};
use crate::windowing::Window;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Extraction parameters.
///
/// # Example
///
/// ```
/// use stream_feature_extractor::features::FeatureConfig;
///
/// let config = FeatureConfig::default().with_rolling_windows(5_000, 30_000);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.rolling_window_1_secs(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Short rolling-delay horizon (ms)
    pub rolling_window_1_ms: u64,

    /// Long rolling-delay horizon (ms)
    pub rolling_window_2_ms: u64,

    /// Bucket width for spectral resampling (ms)
    pub resample_rate_ms: u64,

    /// Sampling frequency assumed by the spectral estimate (Hz)
    pub frequency: f64,

    /// Packets strictly above this size are "large" (bytes)
    pub large_packet_threshold: u64,

    /// Packets strictly below this size are "small" (bytes)
    pub small_packet_threshold: u64,
}

impl FeatureConfig {
    pub fn with_rolling_windows(mut self, first_ms: u64, second_ms: u64) -> Self {
        self.rolling_window_1_ms = first_ms;
        self.rolling_window_2_ms = second_ms;
        self
    }

    pub fn with_resample_rate(mut self, resample_rate_ms: u64) -> Self {
        self.resample_rate_ms = resample_rate_ms;
        self
    }

    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_size_thresholds(mut self, large: u64, small: u64) -> Self {
        self.large_packet_threshold = large;
        self.small_packet_threshold = small;
        self
    }

    /// Short horizon in whole seconds (truncated).
    #[inline]
    pub fn rolling_window_1_secs(&self) -> u64 {
        self.rolling_window_1_ms / 1000
    }

    /// Long horizon in whole seconds (truncated).
    #[inline]
    pub fn rolling_window_2_secs(&self) -> u64 {
        self.rolling_window_2_ms / 1000
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.rolling_window_1_ms < 1000 {
            return Err("rolling_window_1_ms must be >= 1000".to_string());
        }
        if self.rolling_window_2_ms < 1000 {
            return Err("rolling_window_2_ms must be >= 1000".to_string());
        }
        if self.resample_rate_ms == 0 {
            return Err("resample_rate_ms must be > 0".to_string());
        }
        if !(self.frequency.is_finite() && self.frequency > 0.0) {
            return Err(format!("frequency must be positive (got {})", self.frequency));
        }
        if self.small_packet_threshold > self.large_packet_threshold {
            return Err(format!(
                "small_packet_threshold ({}) must not exceed large_packet_threshold ({})",
                self.small_packet_threshold, self.large_packet_threshold
            ));
        }
        Ok(())
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            rolling_window_1_ms: 10_000,
            rolling_window_2_ms: 60_000,
            resample_rate_ms: 500,
            frequency: 2.0,
            large_packet_threshold: 1200,
            small_packet_threshold: 200,
        }
    }
}

/// One extracted row.
///
/// Field order matches [`crate::schema::FEATURE_COLUMNS`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub bytes_sr_ratio: f64,
    pub count_sr_ratio: f64,
    pub smoothed_mean_delay_10s: f64,
    pub smoothed_mean_delay_60s: f64,
    pub received_mean_size: f64,
    pub sent_mean_size: f64,
    pub sent_large_prop: f64,
    pub sent_small_prop: f64,
    pub received_large_prop: f64,
    pub received_small_prop: f64,
    pub sent_longest_streak: f64,
    pub received_longest_streak: f64,
    pub max_frequency_prominence: f64,
    pub streaming: StreamingLabel,
}

impl FeatureVector {
    /// The 13 feature values in column order.
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.bytes_sr_ratio,
            self.count_sr_ratio,
            self.smoothed_mean_delay_10s,
            self.smoothed_mean_delay_60s,
            self.received_mean_size,
            self.sent_mean_size,
            self.sent_large_prop,
            self.sent_small_prop,
            self.received_large_prop,
            self.received_small_prop,
            self.sent_longest_streak,
            self.received_longest_streak,
            self.max_frequency_prominence,
        ]
    }

    /// Features followed by the label, as written to the matrix.
    pub fn to_row(&self) -> [f64; COLUMN_COUNT] {
        let mut row = [0.0; COLUMN_COUNT];
        row[..FEATURE_COUNT].copy_from_slice(&self.features());
        row[FEATURE_COUNT] = self.streaming.as_f64();
        row
    }

    /// Whether every feature is a finite number.
    pub fn is_complete(&self) -> bool {
        self.features().iter().all(|v| v.is_finite())
    }
}

/// Turns windows into feature rows.
///
/// Holds no mutable state, so one extractor is shared by all worker threads.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    config: FeatureConfig,
    short_delay: RollingAggregator,
    long_delay: RollingAggregator,
    spectral: SpectralProminenceEstimator,
}

impl FeatureExtractor {
    /// Extractor with default parameters.
    pub fn new() -> Self {
        Self::build(FeatureConfig::default())
    }

    /// Extractor with custom parameters, validated first.
    pub fn with_config(config: FeatureConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: FeatureConfig) -> Self {
        let short_delay =
            RollingAggregator::mean(Duration::from_secs(config.rolling_window_1_secs()));
        let long_delay =
            RollingAggregator::mean(Duration::from_secs(config.rolling_window_2_secs()));
        let spectral = SpectralProminenceEstimator::new(config.resample_rate_ms, config.frequency);
        Self {
            config,
            short_delay,
            long_delay,
            spectral,
        }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Extract one row from `window`.
    ///
    /// Returns `Ok(None)` for windows without downlink traffic. Rows may still
    /// contain NaN (e.g. a direction without packets has no mean size); those
    /// are removed when the matrix is assembled.
    pub fn extract(&self, window: &Window<'_>) -> Result<Option<FeatureVector>> {
        let packets = window.packets();
        let stats = TrafficStats::collect(
            packets,
            self.config.large_packet_threshold,
            self.config.small_packet_threshold,
        );
        if stats.is_degenerate() {
            return Ok(None);
        }

        let delay_frame = packets.get(1..).unwrap_or_default();
        let times: Vec<i64> = delay_frame.iter().map(|p| p.time).collect();
        let delays: Vec<f64> = packets
            .windows(2)
            .map(|pair| (pair[1].time - pair[0].time) as f64)
            .collect();

        let smoothed_short = self
            .short_delay
            .aggregate(&times, &delays)?
            .column_mean(RollingStat::Mean);
        let smoothed_long = self
            .long_delay
            .aggregate(&times, &delays)?
            .column_mean(RollingStat::Mean);

        let prominence = self
            .spectral
            .estimate(delay_frame.iter().map(|p| (p.time, p.size as f64)));

        let dirs = || delay_frame.iter().map(|p| p.dir);
        let sent_streak = longest_streak(dirs(), Direction::Sent);
        let received_streak = longest_streak(dirs(), Direction::Received);

        Ok(Some(FeatureVector {
            bytes_sr_ratio: stats.bytes_ratio(),
            count_sr_ratio: stats.count_ratio(),
            smoothed_mean_delay_10s: smoothed_short,
            smoothed_mean_delay_60s: smoothed_long,
            received_mean_size: stats.received.mean_size(),
            sent_mean_size: stats.sent.mean_size(),
            sent_large_prop: stats.sent.large_prop(),
            sent_small_prop: stats.sent.small_prop(),
            received_large_prop: stats.received.large_prop(),
            received_small_prop: stats.received.small_prop(),
            sent_longest_streak: sent_streak as f64,
            received_longest_streak: received_streak as f64,
            max_frequency_prominence: prominence.value(),
            streaming: window.label(),
        }))
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}
