//! Flow and feature validation.
//!
//! Checks that run before data enters the matrix:
//!
//! 1. **Timestamp ordering**: flow times must be non-decreasing after sorting,
//!    long capture gaps are reported
//! 2. **Feature ranges**: NaN/Inf detection on extracted rows
//!
//! # Usage
//!
//! ```ignore
//! use stream_feature_extractor::validation::validate_flow_times;
//!
//! let result = validate_flow_times(&times);
//! for warning in result.warnings() {
//!     log::warn!("{warning}");
//! }
//! ```

use std::fmt;

/// Gap between consecutive packets above which a warning is raised (ms).
pub const MAX_EXPECTED_GAP_MS: i64 = 60_000;

/// Validation result for a single check.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    /// Data is valid
    Valid,
    /// Data has minor issues (warnings)
    Warning(String),
    /// Data has serious issues (errors)
    Error(String),
}

impl ValidationLevel {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationLevel::Valid)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, ValidationLevel::Warning(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ValidationLevel::Error(_))
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationLevel::Valid => write!(f, "Valid"),
            ValidationLevel::Warning(msg) => write!(f, "Warning: {msg}"),
            ValidationLevel::Error(msg) => write!(f, "Error: {msg}"),
        }
    }
}

/// Aggregated validation result.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    results: Vec<(String, ValidationLevel)>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation result.
    pub fn add(&mut self, check_name: &str, level: ValidationLevel) {
        self.results.push((check_name.to_string(), level));
    }

    /// Check if all validations passed (no errors or warnings).
    pub fn is_valid(&self) -> bool {
        self.results.iter().all(|(_, level)| level.is_valid())
    }

    pub fn has_errors(&self) -> bool {
        self.results.iter().any(|(_, level)| level.is_error())
    }

    pub fn has_warnings(&self) -> bool {
        self.results.iter().any(|(_, level)| level.is_warning())
    }

    /// All warnings, formatted as `check: message`.
    pub fn warnings(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|(name, level)| match level {
                ValidationLevel::Warning(msg) => Some(format!("{name}: {msg}")),
                _ => None,
            })
            .collect()
    }

    /// All errors, formatted as `check: message`.
    pub fn errors(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|(name, level)| match level {
                ValidationLevel::Error(msg) => Some(format!("{name}: {msg}")),
                _ => None,
            })
            .collect()
    }

    /// Raw `(check, level)` entries in insertion order.
    pub fn entries(&self) -> &[(String, ValidationLevel)] {
        &self.results
    }
}

/// Validate packet timestamps (milliseconds) of one flow.
pub fn validate_flow_times(times: &[i64]) -> ValidationResult {
    let mut result = ValidationResult::new();

    if times.is_empty() {
        result.add(
            "timestamps",
            ValidationLevel::Warning("No packets in flow".to_string()),
        );
        return result;
    }

    let mut monotonic = true;
    let mut max_gap_ms = 0i64;

    for i in 1..times.len() {
        if times[i] < times[i - 1] {
            monotonic = false;
            result.add(
                "timestamp_ordering",
                ValidationLevel::Error(format!(
                    "Non-monotonic timestamp at index {}: {} < {}",
                    i,
                    times[i],
                    times[i - 1]
                )),
            );
            break;
        }
        max_gap_ms = max_gap_ms.max(times[i] - times[i - 1]);
    }

    if monotonic {
        result.add("timestamp_ordering", ValidationLevel::Valid);
    }

    if max_gap_ms > MAX_EXPECTED_GAP_MS {
        result.add(
            "timestamp_gaps",
            ValidationLevel::Warning(format!(
                "Max gap between packets: {:.2} seconds",
                max_gap_ms as f64 / 1000.0
            )),
        );
    } else {
        result.add("timestamp_gaps", ValidationLevel::Valid);
    }

    result
}

/// Check that every value of a feature row is finite.
///
/// Returns the index of the first NaN/Inf value, if any.
pub fn first_non_finite(row: &[f64]) -> Option<usize> {
    row.iter().position(|v| !v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_flow_times_valid() {
        let result = validate_flow_times(&[0, 10, 20, 20, 35]);
        assert!(result.is_valid());
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_validate_flow_times_non_monotonic() {
        let result = validate_flow_times(&[0, 10, 5]);
        assert!(result.has_errors());
        assert!(result.errors()[0].contains("index 2"));
    }

    #[test]
    fn test_validate_flow_times_large_gap() {
        let result = validate_flow_times(&[0, 120_000]);
        assert!(!result.has_errors());
        assert!(result.has_warnings());
        assert!(result.warnings()[0].starts_with("timestamp_gaps"));
    }

    #[test]
    fn test_validate_flow_times_empty() {
        let result = validate_flow_times(&[]);
        assert!(result.has_warnings());
    }

    #[test]
    fn test_first_non_finite() {
        assert_eq!(first_non_finite(&[1.0, 2.0, 3.0]), None);
        assert_eq!(first_non_finite(&[1.0, f64::NAN, 3.0]), Some(1));
        assert_eq!(first_non_finite(&[f64::INFINITY]), Some(0));
    }
}
