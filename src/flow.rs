//! Packet records and per-flow series.
//!
//! A flow is the tunnel-isolated packet trace of one capture, written by the
//! upstream preprocessing step as a CSV file with `time`, `size` and `dir`
//! columns (the elapsed-time index column it also carries is ignored).
//!
//! # Labelling
//!
//! Every flow carries an explicit [`StreamingLabel`]. Labels are attached to
//! paths through [`FlowSource`]; the file-name convention used by the capture
//! campaign (a `novideo` marker) is only one way to build those sources, see
//! [`LabelRule`].
//!
//! # Example
//!
//! ```ignore
//! use stream_feature_extractor::flow::{FlowSeries, FlowSource, StreamingLabel};
//!
//! let source = FlowSource::new("data/preprocessed-youtube-1.csv", StreamingLabel::Streaming);
//! let flow = FlowSeries::load(&source)?;
//! println!("{} packets", flow.len());
//! ```

use crate::error::{FeatureError, Result};
use crate::validation::{validate_flow_times, ValidationLevel, ValidationResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Packet direction relative to the monitored client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Uplink (code 1)
    Sent,
    /// Downlink (code 2)
    Received,
}

impl Direction {
    /// Numeric direction code used in flow files.
    #[inline]
    pub fn code(self) -> u8 {
        match self {
            Direction::Sent => 1,
            Direction::Received => 2,
        }
    }

    /// Parse a direction code. Anything other than 1 or 2 is rejected.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Direction::Sent),
            2 => Some(Direction::Received),
            _ => None,
        }
    }
}

/// One observed packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketRecord {
    /// Timestamp in milliseconds
    pub time: i64,
    /// Packet size in bytes
    pub size: u64,
    /// Packet direction
    pub dir: Direction,
}

impl PacketRecord {
    pub fn new(time: i64, size: u64, dir: Direction) -> Self {
        Self { time, size, dir }
    }
}

/// Binary class of a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamingLabel {
    /// Flow contains video streaming
    Streaming,
    /// Flow contains no video
    NotStreaming,
}

impl StreamingLabel {
    /// Numeric value written to the `streaming` column.
    #[inline]
    pub fn as_f64(self) -> f64 {
        match self {
            StreamingLabel::Streaming => 1.0,
            StreamingLabel::NotStreaming => 0.0,
        }
    }

    #[inline]
    pub fn is_streaming(self) -> bool {
        self == StreamingLabel::Streaming
    }
}

impl From<bool> for StreamingLabel {
    fn from(streaming: bool) -> Self {
        if streaming {
            StreamingLabel::Streaming
        } else {
            StreamingLabel::NotStreaming
        }
    }
}

/// Rule deriving a label from a flow's file name.
///
/// A file whose name contains `no_video_marker` is labelled
/// [`StreamingLabel::NotStreaming`]; every other file is streaming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRule {
    /// Substring marking a capture without video
    pub no_video_marker: String,
}

impl Default for LabelRule {
    fn default() -> Self {
        Self {
            no_video_marker: "novideo".to_string(),
        }
    }
}

impl LabelRule {
    pub fn new(no_video_marker: impl Into<String>) -> Self {
        Self {
            no_video_marker: no_video_marker.into(),
        }
    }

    /// Label for the file at `path` (matched against the file name only).
    pub fn label_for(&self, path: &Path) -> StreamingLabel {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        StreamingLabel::from(!name.contains(&self.no_video_marker))
    }
}

/// A flow file together with its label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSource {
    pub path: PathBuf,
    pub label: StreamingLabel,
}

impl FlowSource {
    pub fn new<P: AsRef<Path>>(path: P, label: StreamingLabel) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            label,
        }
    }

    /// Build a source whose label comes from `rule`.
    pub fn with_rule<P: AsRef<Path>>(path: P, rule: &LabelRule) -> Self {
        let label = rule.label_for(path.as_ref());
        Self::new(path, label)
    }
}

/// Find flow files in `dir` whose name starts with `prefix`.
///
/// Sources are sorted by path so runs over the same directory see the same
/// task order.
pub fn discover_sources<P: AsRef<Path>>(
    dir: P,
    prefix: &str,
    rule: &LabelRule,
) -> Result<Vec<FlowSource>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(FeatureError::SourceDirMissing(dir.to_path_buf()));
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .map(|n| n.to_string_lossy().starts_with(prefix))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    Ok(paths
        .into_iter()
        .map(|path| FlowSource::with_rule(path, rule))
        .collect())
}

/// Raw CSV row. Fields that are empty or unparseable become `None` and the
/// row is dropped.
#[derive(Debug, Deserialize)]
struct RawPacketRow {
    #[serde(default, deserialize_with = "csv::invalid_option")]
    time: Option<i64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    size: Option<i64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    dir: Option<i64>,
}

const REQUIRED_COLUMNS: [&str; 3] = ["time", "size", "dir"];

/// Time-ordered packets of one flow. Immutable once built.
#[derive(Debug, Clone)]
pub struct FlowSeries {
    id: String,
    label: StreamingLabel,
    packets: Vec<PacketRecord>,
    dropped_rows: usize,
}

impl FlowSeries {
    /// Build a flow from packets in any order. Packets are stably sorted by time.
    pub fn new(id: impl Into<String>, label: StreamingLabel, mut packets: Vec<PacketRecord>) -> Self {
        packets.sort_by_key(|p| p.time);
        Self {
            id: id.into(),
            label,
            packets,
            dropped_rows: 0,
        }
    }

    /// Load a flow file.
    ///
    /// Rows with a missing or unparseable field are dropped and counted. A
    /// direction code other than 1/2 or a negative size is malformed input
    /// and fails the load.
    pub fn load(source: &FlowSource) -> Result<Self> {
        let path = &source.path;
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| FeatureError::csv(path, e))?;

        let headers = reader
            .headers()
            .map_err(|e| FeatureError::csv(path, e))?
            .clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(FeatureError::InvalidFlow {
                    flow: path.display().to_string(),
                    reason: format!("missing column '{column}'"),
                });
            }
        }

        let mut packets = Vec::new();
        let mut dropped_rows = 0usize;

        for (row_idx, row) in reader.deserialize::<RawPacketRow>().enumerate() {
            let row = row.map_err(|e| FeatureError::csv(path, e))?;
            let (time, size, dir) = match (row.time, row.size, row.dir) {
                (Some(t), Some(s), Some(d)) => (t, s, d),
                _ => {
                    dropped_rows += 1;
                    continue;
                }
            };

            let dir = Direction::from_code(dir).ok_or_else(|| FeatureError::MalformedRecord {
                path: path.clone(),
                row: row_idx + 1,
                reason: format!("direction code {dir} is not 1 (sent) or 2 (received)"),
            })?;
            if size < 0 {
                return Err(FeatureError::MalformedRecord {
                    path: path.clone(),
                    row: row_idx + 1,
                    reason: format!("negative packet size {size}"),
                });
            }

            packets.push(PacketRecord::new(time, size as u64, dir));
        }

        if dropped_rows > 0 {
            log::warn!(
                "{}: dropped {} rows with missing fields",
                path.display(),
                dropped_rows
            );
        }

        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let raw_times: Vec<i64> = packets.iter().map(|p| p.time).collect();
        let mut flow = Self::new(id, source.label, packets);
        flow.dropped_rows = dropped_rows;

        let sorted_times: Vec<i64> = flow.packets.iter().map(|p| p.time).collect();
        check_times(&flow.id, &raw_times, &sorted_times);

        log::debug!(
            "Loaded flow {} ({} packets, label {:?})",
            flow.id,
            flow.len(),
            flow.label
        );
        Ok(flow)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> StreamingLabel {
        self.label
    }

    pub fn packets(&self) -> &[PacketRecord] {
        &self.packets
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Rows dropped at load time because a field was missing.
    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    /// First and last packet time, if any.
    pub fn time_span(&self) -> Option<(i64, i64)> {
        match (self.packets.first(), self.packets.last()) {
            (Some(first), Some(last)) => Some((first.time, last.time)),
            _ => None,
        }
    }
}

/// Validate packet times in file order, then log what was found.
///
/// Out-of-order rows are reported but not fatal: the flow is sorted on
/// load. Gap checks always run on the sorted times.
fn check_times(flow_id: &str, raw_times: &[i64], sorted_times: &[i64]) -> ValidationResult {
    let mut result = validate_flow_times(raw_times);
    if result.has_errors() {
        for (check, level) in validate_flow_times(sorted_times).entries() {
            if level.is_warning() {
                result.add(check, level.clone());
            }
        }
    }

    for (check, level) in result.entries() {
        match level {
            ValidationLevel::Valid => {}
            ValidationLevel::Warning(msg) => log::warn!("{flow_id}: {check}: {msg}"),
            ValidationLevel::Error(msg) => {
                log::warn!("{flow_id}: {check}: {msg} (rows sorted by time)")
            }
        }
    }
    result
}
