//! Output column schema.
//!
//! The feature matrix has a fixed layout: 13 features followed by the
//! `streaming` label.
//!
//! | Index | Column | Category |
//! |-------|--------|----------|
//! | 0-1 | `bytes_sr_ratio`, `count_sr_ratio` | Ratio |
//! | 2-3 | `smoothed_mean_delay_10s`, `smoothed_mean_delay_60s` | Timing |
//! | 4-9 | mean sizes, large/small proportions | Size |
//! | 10-11 | `sent_longest_streak`, `received_longest_streak` | Streak |
//! | 12 | `max_frequency_prominence` | Spectral |
//! | 13 | `streaming` | Label |
//!
//! # Example
//!
//! ```
//! use stream_feature_extractor::schema::{FeatureCategory, FeatureSchema};
//!
//! let schema = FeatureSchema::standard();
//! assert_eq!(schema.total_count(), 14);
//! assert_eq!(schema.get_feature("streaming").unwrap().category, FeatureCategory::Label);
//! ```

mod feature_def;

pub use feature_def::{FeatureCategory, FeatureDef, FeatureSchema};

/// Current schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Number of feature columns (label excluded)
pub const FEATURE_COUNT: usize = 13;

/// Number of columns including the label
pub const COLUMN_COUNT: usize = FEATURE_COUNT + 1;

/// Header of the output matrix, in row order.
pub const FEATURE_COLUMNS: [&str; COLUMN_COUNT] = [
    "bytes_sr_ratio",
    "count_sr_ratio",
    "smoothed_mean_delay_10s",
    "smoothed_mean_delay_60s",
    "received_mean_size",
    "sent_mean_size",
    "sent_large_prop",
    "sent_small_prop",
    "received_large_prop",
    "received_small_prop",
    "sent_longest_streak",
    "received_longest_streak",
    "max_frequency_prominence",
    "streaming",
];

/// Name of the label column.
pub const LABEL_COLUMN: &str = FEATURE_COLUMNS[FEATURE_COUNT];
