//! FlashArray REST response bodies.

use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AlertResponse {
    pub actual: String,
    pub category: String,
    pub code: u16,
    pub component_name: String,
    pub component_type: String,
    pub current_severity: String,
    pub details: String,
    pub event: String,
    pub expected: String,
    pub id: u64,
    /// `%Y-%m-%dT%H:%M:%SZ`
    pub opened: String,
    /// Empty while the alert is still open
    pub closed: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArrayCapacityMetricsResponse {
    pub capacity: u64,
    pub data_reduction: f64,
    pub shared_space: u64,
    pub snapshots: u64,
    pub system: u64,
    pub total_reduction: f64,
    pub total: u64,
    pub volumes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArrayInfoResponse {
    pub array_name: String,
    pub id: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArrayPerformanceMetricsResponse {
    pub bytes_per_read: u64,
    pub bytes_per_write: u64,
    pub bytes_per_op: u64,
    pub input_per_sec: u64,
    pub output_per_sec: u64,
    pub queue_depth: u16,
    pub usec_per_read_op: u64,
    pub reads_per_sec: u64,
    pub usec_per_write_op: u64,
    pub writes_per_sec: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControllerResponse {
    pub mode: String,
    pub model: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VolumeCapacityMetricsResponse {
    pub data_reduction: f64,
    pub name: String,
    pub size: u64,
    pub total_reduction: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VolumePerformanceMetricsResponse {
    pub input_per_sec: u64,
    pub output_per_sec: u64,
    pub name: String,
    pub usec_per_read_op: u64,
    pub reads_per_sec: u64,
    pub usec_per_write_op: u64,
    pub writes_per_sec: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VolumeSnapshotResponse {
    pub source: String,
}
