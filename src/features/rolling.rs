//! Time-based rolling aggregates.
//!
//! For every observation `i` the aggregate covers the trailing window
//! `(t_i - width, t_i]`, i.e. all earlier observations less than `width`
//! older than the current one plus the current one itself. The width is a
//! duration, not a packet count, so bursts and idle periods are weighted by
//! time.
//!
//! # Algorithm
//!
//! Two pointers sweep the time index once. Mean and variance are maintained
//! with Welford add/remove updates, min and max with monotonic deques, so the
//! whole series costs O(n) regardless of window width.
//!
//! ```text
//! add x:    n += 1; d = x - mean; mean += d / n; m2 += d * (x - mean)
//! remove x: n -= 1; d = x - mean; mean -= d / n; m2 -= d * (x - mean)
//! ```
//!
//! # Example
//!
//! ```
//! use stream_feature_extractor::features::rolling::{RollingAggregator, RollingStat};
//! use std::time::Duration;
//!
//! let times = [0, 1_000, 2_000, 3_000];
//! let values = [1.0, 2.0, 3.0, 4.0];
//!
//! let agg = RollingAggregator::new(Duration::from_secs(2), vec![RollingStat::Mean]);
//! let series = agg.aggregate(&times, &values).unwrap();
//! assert_eq!(series.column(RollingStat::Mean).unwrap(), &[1.0, 1.5, 2.5, 3.5]);
//! ```

use crate::error::{FeatureError, Result};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Aggregate computed over each rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RollingStat {
    Mean,
    Sum,
    Count,
    Min,
    Max,
    /// Sample standard deviation (ddof = 1), NaN for fewer than 2 values
    Std,
}

impl RollingStat {
    pub fn name(self) -> &'static str {
        match self {
            RollingStat::Mean => "mean",
            RollingStat::Sum => "sum",
            RollingStat::Count => "count",
            RollingStat::Min => "min",
            RollingStat::Max => "max",
            RollingStat::Std => "std",
        }
    }
}

impl fmt::Display for RollingStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RollingStat {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(RollingStat::Mean),
            "sum" => Ok(RollingStat::Sum),
            "count" => Ok(RollingStat::Count),
            "min" => Ok(RollingStat::Min),
            "max" => Ok(RollingStat::Max),
            "std" => Ok(RollingStat::Std),
            other => Err(FeatureError::UnknownAggregate(other.to_string())),
        }
    }
}

/// Time-indexed output of a rolling aggregation, one column per statistic.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingSeries {
    times: Vec<i64>,
    columns: Vec<(RollingStat, Vec<f64>)>,
}

impl RollingSeries {
    /// Observation timestamps (ms).
    pub fn times(&self) -> &[i64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Values of one statistic, if it was requested.
    pub fn column(&self, stat: RollingStat) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(s, _)| *s == stat)
            .map(|(_, values)| values.as_slice())
    }

    /// Mean of a column ignoring NaN entries.
    ///
    /// NaN when the column is missing, empty or entirely NaN.
    pub fn column_mean(&self, stat: RollingStat) -> f64 {
        let Some(values) = self.column(stat) else {
            return f64::NAN;
        };
        let (sum, n) = values
            .iter()
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
        if n == 0 {
            f64::NAN
        } else {
            sum / n as f64
        }
    }
}

/// Rolling aggregator over a trailing time window.
#[derive(Debug, Clone)]
pub struct RollingAggregator {
    width_ms: i64,
    stats: Vec<RollingStat>,
}

impl RollingAggregator {
    /// Create an aggregator.
    ///
    /// # Panics
    ///
    /// Panics if `width` is shorter than one millisecond or `stats` is empty.
    pub fn new(width: Duration, stats: Vec<RollingStat>) -> Self {
        let width_ms = width.as_millis().min(i64::MAX as u128) as i64;
        assert!(width_ms > 0, "rolling width must be at least 1ms");
        assert!(!stats.is_empty(), "at least one rolling statistic is required");
        Self { width_ms, stats }
    }

    /// Rolling mean with the given width.
    pub fn mean(width: Duration) -> Self {
        Self::new(width, vec![RollingStat::Mean])
    }

    /// Parse statistic names such as `["mean", "max"]`.
    pub fn from_names<S: AsRef<str>>(width: Duration, names: &[S]) -> Result<Self> {
        let stats = names
            .iter()
            .map(|n| n.as_ref().parse())
            .collect::<Result<Vec<RollingStat>>>()?;
        if stats.is_empty() {
            return Err(FeatureError::Config(
                "at least one rolling statistic is required".to_string(),
            ));
        }
        Ok(Self::new(width, stats))
    }

    pub fn width(&self) -> Duration {
        Duration::from_millis(self.width_ms as u64)
    }

    pub fn stats(&self) -> &[RollingStat] {
        &self.stats
    }

    /// Aggregate `values` indexed by `times` (ms, non-decreasing).
    ///
    /// NaN values are skipped; a window holding no valid value yields NaN.
    ///
    /// # Panics
    ///
    /// Panics if `times` and `values` differ in length.
    pub fn aggregate(&self, times: &[i64], values: &[f64]) -> Result<RollingSeries> {
        assert_eq!(
            times.len(),
            values.len(),
            "time index and values must have equal length"
        );

        for i in 1..times.len() {
            if times[i] < times[i - 1] {
                return Err(FeatureError::NonMonotonicIndex {
                    index: i,
                    previous: times[i - 1],
                    current: times[i],
                });
            }
        }

        let n = times.len();
        let mut columns: Vec<(RollingStat, Vec<f64>)> = self
            .stats
            .iter()
            .map(|&s| (s, Vec::with_capacity(n)))
            .collect();

        let mut state = WindowState::default();
        let mut min_deque: VecDeque<usize> = VecDeque::new();
        let mut max_deque: VecDeque<usize> = VecDeque::new();
        let mut lo = 0usize;

        for hi in 0..n {
            let x = values[hi];
            if !x.is_nan() {
                state.add(x);
                while min_deque.back().is_some_and(|&j| values[j] >= x) {
                    min_deque.pop_back();
                }
                min_deque.push_back(hi);
                while max_deque.back().is_some_and(|&j| values[j] <= x) {
                    max_deque.pop_back();
                }
                max_deque.push_back(hi);
            }

            let cutoff = times[hi].saturating_sub(self.width_ms);
            while times[lo] <= cutoff {
                let old = values[lo];
                if !old.is_nan() {
                    state.remove(old);
                }
                if min_deque.front() == Some(&lo) {
                    min_deque.pop_front();
                }
                if max_deque.front() == Some(&lo) {
                    max_deque.pop_front();
                }
                lo += 1;
            }

            for (stat, column) in columns.iter_mut() {
                let value = match stat {
                    RollingStat::Count => state.n as f64,
                    _ if state.n == 0 => f64::NAN,
                    RollingStat::Mean => state.mean,
                    RollingStat::Sum => state.sum,
                    RollingStat::Min => min_deque.front().map_or(f64::NAN, |&j| values[j]),
                    RollingStat::Max => max_deque.front().map_or(f64::NAN, |&j| values[j]),
                    RollingStat::Std => state.std(),
                };
                column.push(value);
            }
        }

        Ok(RollingSeries {
            times: times.to_vec(),
            columns,
        })
    }
}

/// Running moments of the values currently inside the window.
#[derive(Debug, Default)]
struct WindowState {
    n: usize,
    mean: f64,
    m2: f64,
    sum: f64,
}

impl WindowState {
    fn add(&mut self, x: f64) {
        self.n += 1;
        self.sum += x;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
    }

    fn remove(&mut self, x: f64) {
        if self.n <= 1 {
            *self = WindowState::default();
            return;
        }
        self.n -= 1;
        self.sum -= x;
        let delta = x - self.mean;
        self.mean -= delta / self.n as f64;
        self.m2 -= delta * (x - self.mean);
    }

    fn std(&self) -> f64 {
        if self.n < 2 {
            f64::NAN
        } else {
            (self.m2.max(0.0) / (self.n - 1) as f64).sqrt()
        }
    }
}
