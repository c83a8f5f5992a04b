//! FlashBlade REST response bodies. List endpoints wrap their items
//! together with pagination info.

use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PaginationInfo {
    pub total_item_count: u32,
    pub continuation_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ItemsResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub pagination_info: PaginationInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AlertResponse {
    pub action: String,
    pub code: u16,
    pub component: String,
    /// Milliseconds since the epoch
    pub created: i64,
    pub description: String,
    pub flagged: bool,
    pub index: u64,
    pub name: String,
    pub notified: i64,
    pub severity: String,
    pub state: String,
    pub subject: String,
    pub updated: i64,
    pub variables: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArrayInfoResponse {
    pub id: String,
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpaceResponse {
    pub data_reduction: f64,
    pub snapshots: u64,
    pub total_physical: u64,
    pub unique: u64,
    #[serde(rename = "virtual")]
    pub virtual_space: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArrayCapacityMetricsResponse {
    pub capacity: u64,
    pub name: String,
    pub space: SpaceResponse,
    pub time: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArrayPerformanceMetricsResponse {
    pub bytes_per_op: f64,
    pub bytes_per_read: f64,
    pub bytes_per_write: f64,
    pub input_per_sec: f64,
    pub name: String,
    pub others_per_sec: f64,
    pub output_per_sec: f64,
    pub reads_per_sec: f64,
    pub time: i64,
    pub usec_per_other_op: f64,
    pub usec_per_read_op: f64,
    pub usec_per_write_op: f64,
    pub writes_per_sec: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileSystemCapacityResponse {
    pub name: String,
    pub provisioned: u64,
    pub space: SpaceResponse,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileSystemPerformanceResponse {
    pub bytes_per_op: f64,
    pub bytes_per_read: f64,
    pub bytes_per_write: f64,
    pub name: String,
    pub others_per_sec: f64,
    pub read_bytes_per_sec: f64,
    pub reads_per_sec: f64,
    /// Milliseconds since the epoch
    pub time: i64,
    pub usec_per_other_op: f64,
    pub usec_per_read_op: f64,
    pub usec_per_write_op: f64,
    pub write_bytes_per_sec: f64,
    pub writes_per_sec: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileSystemSnapshotResponse {
    pub source: String,
}
