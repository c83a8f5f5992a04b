//! Unified metric and alert records shared by both device families.
//!
//! Field names serialize in PascalCase, which is the document shape the
//! store indexes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Map an alert severity onto its sortable index
/// (info=1, warning=2, critical=3, anything else 0).
pub fn severity_index(severity: &str) -> u8 {
    match severity.to_lowercase().as_str() {
        "info" => 1,
        "warning" => 2,
        "critical" => 3,
        _ => 0,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Alert {
    #[serde(rename = "AlertID")]
    pub alert_id: u64,
    pub array_display_name: String,
    pub array_hostname: String,
    #[serde(rename = "ArrayID")]
    pub array_id: String,
    pub array_name: String,
    pub code: u16,
    /// Unix seconds
    pub created: i64,
    pub severity: String,
    pub severity_index: u8,
    pub state: String,
    pub summary: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub flagged: bool,
    #[serde(default)]
    pub notified: i64,
    #[serde(default)]
    pub updated: i64,
    #[serde(default)]
    pub variables: HashMap<String, serde_json::Value>,
}

impl Alert {
    pub fn populate_severity_index(&mut self) {
        self.severity_index = severity_index(&self.severity);
    }

    /// Natural key used for upserts
    pub fn store_key(&self) -> String {
        format!("{}-alert-{}", self.array_id, self.alert_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ArrayCapacityMetric {
    pub data_reduction: f64,
    pub percent_full: f64,
    pub shared_space: u64,
    pub snapshot_space: u64,
    pub system_space: u64,
    pub total_reduction: f64,
    pub total_space: u64,
    pub used_space: u64,
    pub volume_space: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ArrayPerformanceMetric {
    pub bytes_per_op: u64,
    pub bytes_per_read: u64,
    pub bytes_per_write: u64,
    #[serde(rename = "OtherIOPS")]
    pub other_iops: u64,
    pub other_latency: u64,
    pub queue_depth: u16,
    pub read_bandwidth: u64,
    #[serde(rename = "ReadIOPS")]
    pub read_iops: u64,
    pub read_latency: u64,
    pub write_bandwidth: u64,
    #[serde(rename = "WriteIOPS")]
    pub write_iops: u64,
    pub write_latency: u64,
}

/// Object counts. `alert_message_count` only counts open or flagged alerts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ArrayObjectsMetric {
    pub alert_message_count: u32,
    pub file_system_count: u32,
    pub host_count: u32,
    pub snapshot_count: u32,
    pub volume_count: u32,
    pub volume_pending_eradication_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ArrayMetric {
    #[serde(flatten)]
    pub capacity: ArrayCapacityMetric,
    #[serde(flatten)]
    pub objects: ArrayObjectsMetric,
    #[serde(flatten)]
    pub performance: ArrayPerformanceMetric,
    #[serde(rename = "ArrayID")]
    pub array_id: String,
    pub array_name: String,
    pub array_type: String,
    /// Unix seconds
    pub created_at: i64,
    pub display_name: String,
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeCapacityMetric {
    pub data_reduction: f64,
    pub provisioned_space: u64,
    pub snapshot_count: u32,
    pub total_reduction: f64,
    pub used_space: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumePerformanceMetric {
    pub read_bandwidth: u64,
    #[serde(rename = "ReadIOPS")]
    pub read_iops: u64,
    pub read_latency: u64,
    #[serde(rename = "OtherIOPS")]
    pub other_iops: u64,
    pub other_latency: u64,
    pub write_bandwidth: u64,
    #[serde(rename = "WriteIOPS")]
    pub write_iops: u64,
    pub write_latency: u64,
}

/// Volume or file-system type tag
pub const VOLUME_TYPE_VOLUME: &str = "Volume";
pub const VOLUME_TYPE_FILE_SYSTEM: &str = "FileSystem";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeMetric {
    #[serde(flatten)]
    pub capacity: Option<VolumeCapacityMetric>,
    #[serde(flatten)]
    pub performance: VolumePerformanceMetric,
    #[serde(rename = "ArrayID")]
    pub array_id: String,
    pub array_name: String,
    pub array_display_name: String,
    pub array_tags: HashMap<String, String>,
    /// Unix seconds
    pub created_at: i64,
    #[serde(rename = "Type")]
    pub volume_type: String,
    pub volume_name: String,
}

/// Everything one array collection produces
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllArrayData {
    pub alerts: Vec<Alert>,
    pub array_metric: ArrayMetric,
}

/// Volume metrics, possibly several points in time per volume
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllVolumeData {
    pub volume_metrics: Vec<VolumeMetric>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_index_is_case_insensitive() {
        assert_eq!(severity_index("info"), 1);
        assert_eq!(severity_index("Warning"), 2);
        assert_eq!(severity_index("CRITICAL"), 3);
        assert_eq!(severity_index("hidden"), 0);
    }

    #[test]
    fn test_array_metric_serializes_flat_pascal_case() {
        let metric = ArrayMetric {
            capacity: ArrayCapacityMetric {
                percent_full: 0.5,
                ..Default::default()
            },
            performance: ArrayPerformanceMetric {
                read_iops: 7,
                ..Default::default()
            },
            array_id: "a1".to_string(),
            created_at: 1_700_000_000,
            ..Default::default()
        };

        let value = serde_json::to_value(&metric).unwrap();
        assert_eq!(value["PercentFull"], 0.5);
        assert_eq!(value["ReadIOPS"], 7);
        assert_eq!(value["ArrayID"], "a1");
        assert_eq!(value["CreatedAt"], 1_700_000_000i64);
        assert!(value.get("capacity").is_none());
    }

    #[test]
    fn test_volume_metric_without_capacity_omits_capacity_fields() {
        let metric = VolumeMetric {
            volume_type: VOLUME_TYPE_FILE_SYSTEM.to_string(),
            volume_name: "fs1".to_string(),
            ..Default::default()
        };

        let value = serde_json::to_value(&metric).unwrap();
        assert_eq!(value["Type"], "FileSystem");
        assert!(value.get("ProvisionedSpace").is_none());
        assert_eq!(value["WriteIOPS"], 0);
    }

    #[test]
    fn test_alert_store_key() {
        let mut alert = Alert {
            alert_id: 42,
            array_id: "array-7".to_string(),
            severity: "warning".to_string(),
            ..Default::default()
        };
        alert.populate_severity_index();

        assert_eq!(alert.store_key(), "array-7-alert-42");
        assert_eq!(alert.severity_index, 2);
    }
}
