//! Feature definitions and schema types.
//!
//! - `FeatureCategory`: what a column measures
//! - `FeatureDef`: metadata for a single column
//! - `FeatureSchema`: ordered collection of column definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureCategory {
    /// Uplink/downlink volume ratios
    Ratio,

    /// Inter-packet delay statistics
    Timing,

    /// Packet size statistics and size-class proportions
    Size,

    /// Longest directional runs
    Streak,

    /// Periodicity derived from the power spectrum
    Spectral,

    /// Target column
    Label,
}

impl FeatureCategory {
    /// All categories in column order.
    pub fn all() -> &'static [FeatureCategory] {
        &[
            FeatureCategory::Ratio,
            FeatureCategory::Timing,
            FeatureCategory::Size,
            FeatureCategory::Streak,
            FeatureCategory::Spectral,
            FeatureCategory::Label,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            FeatureCategory::Ratio => "Ratio",
            FeatureCategory::Timing => "Timing",
            FeatureCategory::Size => "Size",
            FeatureCategory::Streak => "Streak",
            FeatureCategory::Spectral => "Spectral",
            FeatureCategory::Label => "Label",
        }
    }
}

/// Definition of a single column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureDef {
    /// Column name as written to the header
    pub name: String,

    /// Position in the row
    pub index: usize,

    pub category: FeatureCategory,

    /// Human-readable description
    pub description: String,

    /// Unit of the value (optional)
    pub unit: Option<String>,
}

impl FeatureDef {
    pub fn new(
        name: impl Into<String>,
        index: usize,
        category: FeatureCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            index,
            category,
            description: description.into(),
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// Versioned, ordered column schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: String,

    features: Vec<FeatureDef>,

    /// Name-to-index lookup
    #[serde(skip)]
    name_index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Create an empty schema.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            features: Vec::new(),
            name_index: HashMap::new(),
        }
    }

    /// The fixed schema of the output matrix.
    pub fn standard() -> Self {
        let columns: [(&str, FeatureCategory, &str, Option<&str>); super::COLUMN_COUNT] = [
            ("bytes_sr_ratio", FeatureCategory::Ratio, "Sent bytes / received bytes", None),
            ("count_sr_ratio", FeatureCategory::Ratio, "Sent packets / received packets", None),
            (
                "smoothed_mean_delay_10s",
                FeatureCategory::Timing,
                "Average of the short-horizon rolling mean inter-packet delay",
                Some("ms"),
            ),
            (
                "smoothed_mean_delay_60s",
                FeatureCategory::Timing,
                "Average of the long-horizon rolling mean inter-packet delay",
                Some("ms"),
            ),
            ("received_mean_size", FeatureCategory::Size, "Mean downlink packet size", Some("bytes")),
            ("sent_mean_size", FeatureCategory::Size, "Mean uplink packet size", Some("bytes")),
            ("sent_large_prop", FeatureCategory::Size, "Share of large uplink packets", None),
            ("sent_small_prop", FeatureCategory::Size, "Share of small uplink packets", None),
            ("received_large_prop", FeatureCategory::Size, "Share of large downlink packets", None),
            ("received_small_prop", FeatureCategory::Size, "Share of small downlink packets", None),
            ("sent_longest_streak", FeatureCategory::Streak, "Longest run of uplink packets", Some("packets")),
            (
                "received_longest_streak",
                FeatureCategory::Streak,
                "Longest run of downlink packets",
                Some("packets"),
            ),
            (
                "max_frequency_prominence",
                FeatureCategory::Spectral,
                "Largest peak prominence of the amplitude spectrum",
                None,
            ),
            ("streaming", FeatureCategory::Label, "1 if the flow carries video, else 0", None),
        ];

        let mut schema = Self::new(super::SCHEMA_VERSION);
        for (index, (name, category, description, unit)) in columns.into_iter().enumerate() {
            let mut feat = FeatureDef::new(name, index, category, description);
            if let Some(unit) = unit {
                feat = feat.with_unit(unit);
            }
            schema.add_feature(feat);
        }
        schema
    }

    pub fn add_feature(&mut self, feature: FeatureDef) {
        self.name_index.insert(feature.name.clone(), feature.index);
        self.features.push(feature);
    }

    pub fn total_count(&self) -> usize {
        self.features.len()
    }

    pub fn get_feature(&self, name: &str) -> Option<&FeatureDef> {
        self.name_index
            .get(name)
            .and_then(|&idx| self.get_feature_by_index(idx))
    }

    pub fn get_feature_by_index(&self, index: usize) -> Option<&FeatureDef> {
        self.features.iter().find(|f| f.index == index)
    }

    pub fn features_by_category(&self, category: FeatureCategory) -> Vec<&FeatureDef> {
        self.features
            .iter()
            .filter(|f| f.category == category)
            .collect()
    }

    pub fn all_features(&self) -> &[FeatureDef] {
        &self.features
    }

    pub fn contains(&self, name: &str) -> bool {
        self.name_index.contains_key(name)
    }

    /// Column names in row order.
    pub fn feature_names(&self) -> Vec<&str> {
        let mut features: Vec<&FeatureDef> = self.features.iter().collect();
        features.sort_by_key(|f| f.index);
        features.into_iter().map(|f| f.name.as_str()).collect()
    }

    /// Rebuild the lookup table (call after deserialization).
    pub fn rebuild_indices(&mut self) {
        self.name_index = self
            .features
            .iter()
            .map(|f| (f.name.clone(), f.index))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_def_builder() {
        let feat = FeatureDef::new("test", 0, FeatureCategory::Timing, "Test feature").with_unit("ms");
        assert_eq!(feat.name, "test");
        assert_eq!(feat.unit, Some("ms".to_string()));
    }

    #[test]
    fn test_standard_lookup() {
        let schema = FeatureSchema::standard();
        let feat = schema.get_feature("max_frequency_prominence").unwrap();
        assert_eq!(feat.index, 12);
        assert_eq!(feat.category, FeatureCategory::Spectral);
        assert!(schema.get_feature("ask_price_1").is_none());
    }

    #[test]
    fn test_category_counts() {
        let schema = FeatureSchema::standard();
        assert_eq!(schema.features_by_category(FeatureCategory::Ratio).len(), 2);
        assert_eq!(schema.features_by_category(FeatureCategory::Timing).len(), 2);
        assert_eq!(schema.features_by_category(FeatureCategory::Size).len(), 6);
        assert_eq!(schema.features_by_category(FeatureCategory::Streak).len(), 2);
        assert_eq!(schema.features_by_category(FeatureCategory::Label).len(), 1);
    }

    #[test]
    fn test_rebuild_after_deserialize() {
        let schema = FeatureSchema::standard();
        let json = serde_json::to_string(&schema).unwrap();
        let mut restored: FeatureSchema = serde_json::from_str(&json).unwrap();
        assert!(!restored.contains("streaming"));
        restored.rebuild_indices();
        assert!(restored.contains("streaming"));
        assert_eq!(restored.feature_names(), schema.feature_names());
    }
}
