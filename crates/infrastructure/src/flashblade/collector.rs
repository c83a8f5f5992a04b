use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use telemetry_core::{StageTimer, TelemetryResult};
use telemetry_domain::{
    Alert, AllArrayData, AllVolumeData, ArrayCapacityMetric, ArrayCollector, ArrayMetadata,
    ArrayMetric, ArrayObjectsMetric, ArrayPerformanceMetric, DeviceType, VolumeCapacityMetric,
    VolumeMetric, VolumePerformanceMetric, VOLUME_TYPE_FILE_SYSTEM,
};

use super::client::FlashBladeApi;
use super::types::*;
use crate::join::{best_effort, join_all_best_effort, log_incomplete_data};

const FLASH_BLADE_MODEL: &str = "FlashBlade";

pub struct FlashBladeCollector {
    array_id: String,
    display_name: String,
    mgmt_endpoint: String,
    client: Arc<dyn FlashBladeApi>,
    metadata: Arc<dyn ArrayMetadata>,
}

impl FlashBladeCollector {
    pub fn new(
        array_id: &str,
        display_name: &str,
        mgmt_endpoint: &str,
        client: Arc<dyn FlashBladeApi>,
        metadata: Arc<dyn ArrayMetadata>,
    ) -> Self {
        info!(display_name, "Successfully created FlashBlade Collector");
        Self {
            array_id: array_id.to_string(),
            display_name: display_name.to_string(),
            mgmt_endpoint: mgmt_endpoint.to_string(),
            client,
            metadata,
        }
    }

    fn timer(&self, process_name: &str) -> StageTimer {
        StageTimer::new(
            process_name,
            vec![("display_name", self.display_name.clone())],
        )
    }

    async fn tags_or_empty(&self) -> HashMap<String, String> {
        best_effort(
            &self.display_name,
            "GetArrayTags",
            self.metadata.get_tags(&self.array_id),
        )
        .await
    }

    async fn fetch_metrics(
        &self,
    ) -> (
        ArrayCapacityMetricsResponse,
        ArrayPerformanceMetricsResponse,
    ) {
        futures::join!(
            best_effort(
                &self.display_name,
                "GetArrayCapacityMetrics",
                self.client.get_array_capacity_metrics()
            ),
            best_effort(
                &self.display_name,
                "GetArrayPerformanceMetrics",
                self.client.get_array_performance_metrics()
            ),
        )
    }

    /// File-system count, then snapshot count
    async fn fetch_counts(&self) -> (u32, u32) {
        let mut counts = join_all_best_effort(
            &self.display_name,
            vec![
                ("GetFileSystemCount", self.client.get_file_system_count()),
                (
                    "GetFileSystemSnapshotCount",
                    self.client.get_file_system_snapshot_count(),
                ),
            ],
        )
        .await
        .into_iter();

        (
            counts.next().unwrap_or_default(),
            counts.next().unwrap_or_default(),
        )
    }
}

#[async_trait]
impl ArrayCollector for FlashBladeCollector {
    async fn get_all_array_data(&self) -> TelemetryResult<AllArrayData> {
        let mut timer = self.timer("flashblade.Collector.GetAllArrayData");

        let info = self.client.get_array_info().await?;
        timer.stage("get_array_info");

        let (alert_responses, (capacity, performance), (file_system_count, snapshot_count), tags) =
            futures::join!(
                best_effort(&self.display_name, "GetAlerts", self.client.get_alerts()),
                self.fetch_metrics(),
                self.fetch_counts(),
                self.tags_or_empty(),
            );
        timer.stage("parse_responses");

        let alert_message_count = alert_responses
            .iter()
            .filter(|a| a.flagged || a.state == "open")
            .count() as u32;
        let alerts = alert_responses
            .iter()
            .map(|a| convert_alert(a, &self.array_id, &self.display_name, &self.mgmt_endpoint, &info))
            .collect();

        let array_metric = ArrayMetric {
            capacity: convert_capacity(&capacity),
            objects: ArrayObjectsMetric {
                alert_message_count,
                file_system_count,
                host_count: 0,
                snapshot_count,
                volume_count: 0,
                volume_pending_eradication_count: 0,
            },
            performance: convert_performance(&performance),
            array_id: self.array_id.clone(),
            array_name: info.name.clone(),
            array_type: DeviceType::FlashBlade.to_string(),
            created_at: Utc::now().timestamp(),
            display_name: self.display_name.clone(),
            tags,
        };

        timer.finish();
        Ok(AllArrayData {
            alerts,
            array_metric,
        })
    }

    async fn get_all_volume_data(&self, time_window: i64) -> TelemetryResult<AllVolumeData> {
        let mut timer = self.timer("flashblade.Collector.GetAllVolumeData");

        let info = self.client.get_array_info().await?;
        timer.stage("get_array_info");

        let (capacities, performances, snapshots, tags) = futures::join!(
            best_effort(
                &self.display_name,
                "GetFileSystemCapacityMetrics",
                self.client.get_file_system_capacity_metrics()
            ),
            self.client.get_file_system_performance_metrics(time_window),
            best_effort(
                &self.display_name,
                "GetFileSystemSnapshots",
                self.client.get_file_system_snapshots()
            ),
            self.tags_or_empty(),
        );
        let performances = performances.inspect_err(|e| {
            log_incomplete_data(&self.display_name, "GetFileSystemPerformanceMetrics", e)
        })?;
        timer.stage("parse_responses");

        let mut snapshot_counts: HashMap<&str, u32> = HashMap::new();
        for snapshot in &snapshots {
            *snapshot_counts.entry(snapshot.source.as_str()).or_default() += 1;
        }

        let capacity_by_name: HashMap<&str, VolumeCapacityMetric> = capacities
            .iter()
            .map(|c| {
                let capacity = VolumeCapacityMetric {
                    data_reduction: c.space.data_reduction,
                    provisioned_space: c.provisioned,
                    snapshot_count: snapshot_counts.get(c.name.as_str()).copied().unwrap_or(0),
                    total_reduction: 0.0,
                    used_space: c.space.total_physical,
                };
                (c.name.as_str(), capacity)
            })
            .collect();

        let volume_metrics = performances
            .iter()
            .map(|p| VolumeMetric {
                capacity: capacity_by_name.get(p.name.as_str()).cloned(),
                performance: VolumePerformanceMetric {
                    read_bandwidth: p.read_bytes_per_sec as u64,
                    read_iops: p.reads_per_sec as u64,
                    read_latency: p.usec_per_read_op as u64,
                    other_iops: p.others_per_sec as u64,
                    other_latency: p.usec_per_other_op as u64,
                    write_bandwidth: p.write_bytes_per_sec as u64,
                    write_iops: p.writes_per_sec as u64,
                    write_latency: p.usec_per_write_op as u64,
                },
                array_id: self.array_id.clone(),
                array_name: info.name.clone(),
                array_display_name: self.display_name.clone(),
                array_tags: tags.clone(),
                created_at: p.time / 1000,
                volume_type: VOLUME_TYPE_FILE_SYSTEM.to_string(),
                volume_name: p.name.clone(),
            })
            .collect();

        timer.finish();
        Ok(AllVolumeData { volume_metrics })
    }

    fn array_id(&self) -> &str {
        &self.array_id
    }

    async fn get_array_model(&self) -> TelemetryResult<String> {
        Ok(FLASH_BLADE_MODEL.to_string())
    }

    async fn get_array_name(&self) -> TelemetryResult<String> {
        let _timer = self.timer("flashblade.Collector.GetArrayName");
        Ok(self.client.get_array_info().await?.name)
    }

    async fn get_array_tags(&self) -> TelemetryResult<HashMap<String, String>> {
        let _timer = self.timer("flashblade.Collector.GetArrayTags");
        self.metadata
            .get_tags(&self.array_id)
            .await
            .inspect_err(|e| log_incomplete_data(&self.display_name, "GetArrayTags", e))
    }

    fn array_type(&self) -> DeviceType {
        DeviceType::FlashBlade
    }

    async fn get_array_version(&self) -> TelemetryResult<String> {
        let _timer = self.timer("flashblade.Collector.GetArrayVersion");
        Ok(self.client.get_array_info().await?.version)
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}

fn convert_alert(
    response: &AlertResponse,
    array_id: &str,
    display_name: &str,
    mgmt_endpoint: &str,
    info: &ArrayInfoResponse,
) -> Alert {
    let mut alert = Alert {
        alert_id: response.index,
        array_display_name: display_name.to_string(),
        array_hostname: mgmt_endpoint.to_string(),
        array_id: array_id.to_string(),
        array_name: info.name.clone(),
        code: response.code,
        created: response.created / 1000,
        severity: response.severity.clone(),
        severity_index: 0,
        state: response.state.clone(),
        summary: response.subject.clone(),
        action: response.action.clone(),
        component: response.component.clone(),
        description: response.description.clone(),
        flagged: response.flagged,
        notified: response.notified / 1000,
        updated: response.updated / 1000,
        variables: response.variables.clone(),
    };
    alert.populate_severity_index();
    alert
}

fn convert_capacity(response: &ArrayCapacityMetricsResponse) -> ArrayCapacityMetric {
    let percent_full = if response.capacity == 0 {
        0.0
    } else {
        response.space.total_physical as f64 / response.capacity as f64
    };

    ArrayCapacityMetric {
        data_reduction: response.space.data_reduction,
        percent_full,
        shared_space: 0,
        snapshot_space: response.space.snapshots,
        system_space: 0,
        total_reduction: 0.0,
        total_space: response.capacity,
        used_space: response.space.total_physical,
        volume_space: response.space.unique,
    }
}

fn convert_performance(response: &ArrayPerformanceMetricsResponse) -> ArrayPerformanceMetric {
    ArrayPerformanceMetric {
        bytes_per_op: response.bytes_per_op as u64,
        bytes_per_read: response.bytes_per_read as u64,
        bytes_per_write: response.bytes_per_write as u64,
        other_iops: response.others_per_sec as u64,
        other_latency: response.usec_per_other_op as u64,
        queue_depth: 0,
        read_bandwidth: response.output_per_sec as u64,
        read_iops: response.reads_per_sec as u64,
        read_latency: response.usec_per_read_op as u64,
        write_bandwidth: response.input_per_sec as u64,
        write_iops: response.writes_per_sec as u64,
        write_latency: response.usec_per_write_op as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_times_become_seconds() {
        let response = AlertResponse {
            index: 77,
            created: 1_700_000_000_123,
            notified: 1_700_000_100_000,
            updated: 1_700_000_200_999,
            subject: "space low".to_string(),
            severity: "warning".to_string(),
            state: "open".to_string(),
            action: "free space".to_string(),
            flagged: true,
            ..Default::default()
        };
        let info = ArrayInfoResponse {
            name: "fb-lab".to_string(),
            ..Default::default()
        };

        let alert = convert_alert(&response, "b1", "Lab", "10.0.0.9", &info);
        assert_eq!(alert.alert_id, 77);
        assert_eq!(alert.created, 1_700_000_000);
        assert_eq!(alert.notified, 1_700_000_100);
        assert_eq!(alert.updated, 1_700_000_200);
        assert_eq!(alert.summary, "space low");
        assert_eq!(alert.severity_index, 2);
        assert_eq!(alert.array_name, "fb-lab");
        assert!(alert.flagged);
    }

    #[test]
    fn test_capacity_uses_physical_space() {
        let capacity = convert_capacity(&ArrayCapacityMetricsResponse {
            capacity: 1000,
            space: SpaceResponse {
                data_reduction: 2.5,
                snapshots: 20,
                total_physical: 400,
                unique: 300,
                virtual_space: 900,
            },
            ..Default::default()
        });

        assert_eq!(capacity.percent_full, 0.4);
        assert_eq!(capacity.used_space, 400);
        assert_eq!(capacity.volume_space, 300);
        assert_eq!(capacity.snapshot_space, 20);
        assert_eq!(capacity.data_reduction, 2.5);
        assert_eq!(capacity.shared_space, 0);
    }

    #[test]
    fn test_performance_truncates_floats() {
        let performance = convert_performance(&ArrayPerformanceMetricsResponse {
            others_per_sec: 12.9,
            usec_per_other_op: 3.2,
            output_per_sec: 1024.7,
            input_per_sec: 2048.1,
            ..Default::default()
        });
        assert_eq!(performance.other_iops, 12);
        assert_eq!(performance.other_latency, 3);
        assert_eq!(performance.read_bandwidth, 1024);
        assert_eq!(performance.write_bandwidth, 2048);
        assert_eq!(performance.queue_depth, 0);
    }
}
