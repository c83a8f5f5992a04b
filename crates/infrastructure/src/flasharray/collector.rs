use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use tracing::info;

use telemetry_core::{StageTimer, TelemetryResult};
use telemetry_domain::{
    Alert, AllArrayData, AllVolumeData, ArrayCapacityMetric, ArrayCollector, ArrayMetadata,
    ArrayMetric, ArrayObjectsMetric, ArrayPerformanceMetric, DeviceType, VolumeCapacityMetric,
    VolumeMetric, VolumePerformanceMetric, VOLUME_TYPE_VOLUME,
};

use super::client::FlashArrayApi;
use super::types::*;
use crate::join::{best_effort, join_all_best_effort, log_incomplete_data};

const OPENED_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub struct FlashArrayCollector {
    array_id: String,
    display_name: String,
    mgmt_endpoint: String,
    client: Arc<dyn FlashArrayApi>,
    metadata: Arc<dyn ArrayMetadata>,
}

impl FlashArrayCollector {
    pub fn new(
        array_id: &str,
        display_name: &str,
        mgmt_endpoint: &str,
        client: Arc<dyn FlashArrayApi>,
        metadata: Arc<dyn ArrayMetadata>,
    ) -> Self {
        info!(display_name, "Successfully created FlashArray Collector");
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

    async fn fetch_alerts(&self) -> (Vec<AlertResponse>, Vec<AlertResponse>) {
        futures::join!(
            best_effort(
                &self.display_name,
                "GetAlertsFlagged",
                self.client.get_alerts_flagged()
            ),
            best_effort(
                &self.display_name,
                "GetAlertsTimeline",
                self.client.get_alerts_timeline()
            ),
        )
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

    async fn fetch_counts(&self) -> ObjectCounts {
        let mut counts = join_all_best_effort(
            &self.display_name,
            vec![
                ("GetHostCount", self.client.get_host_count()),
                ("GetVolumeSnapshotCount", self.client.get_volume_snapshot_count()),
                ("GetVolumeCount", self.client.get_volume_count()),
                (
                    "GetVolumePendingEradicationCount",
                    self.client.get_volume_pending_eradication_count(),
                ),
            ],
        )
        .await
        .into_iter();

        ObjectCounts {
            host: counts.next().unwrap_or_default(),
            snapshot: counts.next().unwrap_or_default(),
            volume: counts.next().unwrap_or_default(),
            pending_eradication: counts.next().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default)]
struct ObjectCounts {
    host: u32,
    snapshot: u32,
    volume: u32,
    pending_eradication: u32,
}

#[async_trait]
impl ArrayCollector for FlashArrayCollector {
    async fn get_all_array_data(&self) -> TelemetryResult<AllArrayData> {
        let mut timer = self.timer("flasharray.Collector.GetAllArrayData");

        let info = self.client.get_array_info().await?;
        timer.stage("get_array_info");

        let ((flagged, timeline), (capacity, performance), counts, tags) = futures::join!(
            self.fetch_alerts(),
            self.fetch_metrics(),
            self.fetch_counts(),
            self.tags_or_empty(),
        );
        timer.stage("parse_responses");

        let now = Utc::now().timestamp();
        let alerts = merge_alerts(&flagged, &timeline, |response| {
            convert_alert(response, &self.array_id, &self.display_name, &self.mgmt_endpoint, &info)
        });

        let array_metric = ArrayMetric {
            capacity: convert_capacity(&capacity),
            objects: ArrayObjectsMetric {
                alert_message_count: timeline.len() as u32,
                file_system_count: 0,
                host_count: counts.host,
                snapshot_count: counts.snapshot,
                volume_count: counts.volume,
                volume_pending_eradication_count: counts.pending_eradication,
            },
            performance: convert_performance(&performance),
            array_id: self.array_id.clone(),
            array_name: self.display_name.clone(),
            array_type: DeviceType::FlashArray.to_string(),
            created_at: now,
            display_name: self.display_name.clone(),
            tags,
        };

        timer.finish();
        Ok(AllArrayData {
            alerts,
            array_metric,
        })
    }

    async fn get_all_volume_data(&self, _time_window: i64) -> TelemetryResult<AllVolumeData> {
        let mut timer = self.timer("flasharray.Collector.GetAllVolumeData");

        let info = self.client.get_array_info().await?;
        timer.stage("get_array_info");

        let (capacities, performances, snapshots, tags) = futures::join!(
            best_effort(
                &self.display_name,
                "GetVolumeCapacityMetrics",
                self.client.get_volume_capacity_metrics()
            ),
            best_effort(
                &self.display_name,
                "GetVolumePerformanceMetrics",
                self.client.get_volume_performance_metrics()
            ),
            best_effort(
                &self.display_name,
                "GetVolumeSnapshots",
                self.client.get_volume_snapshots()
            ),
            self.tags_or_empty(),
        );
        timer.stage("parse_responses");

        let mut snapshot_counts: HashMap<&str, u32> = HashMap::new();
        for snapshot in &snapshots {
            *snapshot_counts.entry(snapshot.source.as_str()).or_default() += 1;
        }

        let capacity_by_name: HashMap<&str, VolumeCapacityMetric> = capacities
            .iter()
            .map(|c| {
                let capacity = VolumeCapacityMetric {
                    data_reduction: c.data_reduction,
                    provisioned_space: 0,
                    snapshot_count: snapshot_counts.get(c.name.as_str()).copied().unwrap_or(0),
                    total_reduction: c.total_reduction,
                    used_space: c.size,
                };
                (c.name.as_str(), capacity)
            })
            .collect();

        let now = Utc::now().timestamp();
        let volume_metrics = performances
            .iter()
            .map(|p| VolumeMetric {
                capacity: capacity_by_name.get(p.name.as_str()).cloned(),
                performance: VolumePerformanceMetric {
                    read_bandwidth: p.output_per_sec,
                    read_iops: p.reads_per_sec,
                    read_latency: p.usec_per_read_op,
                    other_iops: 0,
                    other_latency: 0,
                    write_bandwidth: p.input_per_sec,
                    write_iops: p.writes_per_sec,
                    write_latency: p.usec_per_write_op,
                },
                array_id: self.array_id.clone(),
                array_name: info.array_name.clone(),
                array_display_name: self.display_name.clone(),
                array_tags: tags.clone(),
                created_at: now,
                volume_type: VOLUME_TYPE_VOLUME.to_string(),
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
        let _timer = self.timer("flasharray.Collector.GetArrayModel");
        self.client.get_model().await
    }

    async fn get_array_name(&self) -> TelemetryResult<String> {
        let _timer = self.timer("flasharray.Collector.GetArrayName");
        Ok(self.client.get_array_info().await?.array_name)
    }

    async fn get_array_tags(&self) -> TelemetryResult<HashMap<String, String>> {
        let _timer = self.timer("flasharray.Collector.GetArrayTags");
        self.metadata
            .get_tags(&self.array_id)
            .await
            .inspect_err(|e| log_incomplete_data(&self.display_name, "GetArrayTags", e))
    }

    fn array_type(&self) -> DeviceType {
        DeviceType::FlashArray
    }

    async fn get_array_version(&self) -> TelemetryResult<String> {
        let _timer = self.timer("flasharray.Collector.GetArrayVersion");
        Ok(self.client.get_array_info().await?.version)
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// Timeline alerts keyed by id, flagged where the flagged list has the id.
/// Output is ordered by alert id.
fn merge_alerts(
    flagged: &[AlertResponse],
    timeline: &[AlertResponse],
    convert: impl Fn(&AlertResponse) -> Alert,
) -> Vec<Alert> {
    let mut by_id: HashMap<u64, Alert> = timeline.iter().map(|a| (a.id, convert(a))).collect();
    for response in flagged {
        if let Some(alert) = by_id.get_mut(&response.id) {
            alert.flagged = true;
        }
    }

    let mut alerts: Vec<Alert> = by_id.into_values().collect();
    alerts.sort_by_key(|a| a.alert_id);
    alerts
}

fn convert_alert(
    response: &AlertResponse,
    array_id: &str,
    display_name: &str,
    mgmt_endpoint: &str,
    info: &ArrayInfoResponse,
) -> Alert {
    let created = NaiveDateTime::parse_from_str(&response.opened, OPENED_FORMAT)
        .map(|opened| opened.and_utc().timestamp())
        .unwrap_or_else(|_| Utc::now().timestamp());
    let state = if response.closed.is_empty() {
        "open"
    } else {
        "closed"
    };

    let mut alert = Alert {
        alert_id: response.id,
        array_display_name: display_name.to_string(),
        array_hostname: mgmt_endpoint.to_string(),
        array_id: array_id.to_string(),
        array_name: info.array_name.clone(),
        code: response.code,
        created,
        severity: response.current_severity.clone(),
        state: state.to_string(),
        summary: response.event.clone(),
        component: response.component_name.clone(),
        description: response.details.clone(),
        ..Default::default()
    };
    alert.populate_severity_index();
    alert
}

fn convert_capacity(response: &ArrayCapacityMetricsResponse) -> ArrayCapacityMetric {
    let percent_full = if response.capacity == 0 {
        0.0
    } else {
        response.total as f64 / response.capacity as f64
    };

    ArrayCapacityMetric {
        data_reduction: response.data_reduction,
        percent_full,
        shared_space: response.shared_space,
        snapshot_space: response.snapshots,
        system_space: response.system,
        total_reduction: response.total_reduction,
        total_space: response.capacity,
        used_space: response.total,
        volume_space: response.volumes,
    }
}

fn convert_performance(response: &ArrayPerformanceMetricsResponse) -> ArrayPerformanceMetric {
    ArrayPerformanceMetric {
        bytes_per_op: response.bytes_per_op,
        bytes_per_read: response.bytes_per_read,
        bytes_per_write: response.bytes_per_write,
        other_iops: 0,
        other_latency: 0,
        queue_depth: response.queue_depth,
        read_bandwidth: response.output_per_sec,
        read_iops: response.reads_per_sec,
        read_latency: response.usec_per_read_op,
        write_bandwidth: response.input_per_sec,
        write_iops: response.writes_per_sec,
        write_latency: response.usec_per_write_op,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> ArrayInfoResponse {
        ArrayInfoResponse {
            array_name: "fa-prod".to_string(),
            id: "dev-id".to_string(),
            version: "5.3.0".to_string(),
        }
    }

    #[test]
    fn test_alert_conversion() {
        let response = AlertResponse {
            id: 12,
            code: 31,
            current_severity: "critical".to_string(),
            event: "failure".to_string(),
            details: "controller down".to_string(),
            component_name: "ct0".to_string(),
            opened: "2024-03-01T10:00:00Z".to_string(),
            ..Default::default()
        };

        let alert = convert_alert(&response, "a1", "Prod", "10.0.0.5", &info());
        assert_eq!(alert.created, 1_709_287_200);
        assert_eq!(alert.state, "open");
        assert_eq!(alert.severity_index, 3);
        assert_eq!(alert.summary, "failure");
        assert_eq!(alert.description, "controller down");
        assert_eq!(alert.component, "ct0");
        assert_eq!(alert.array_hostname, "10.0.0.5");
        assert_eq!(alert.array_name, "fa-prod");
    }

    #[test]
    fn test_closed_alert_and_unparsable_opened() {
        let response = AlertResponse {
            id: 1,
            opened: "yesterday".to_string(),
            closed: "2024-03-01T11:00:00Z".to_string(),
            ..Default::default()
        };

        let before = Utc::now().timestamp();
        let alert = convert_alert(&response, "a1", "Prod", "10.0.0.5", &info());
        assert_eq!(alert.state, "closed");
        assert!(alert.created >= before);
    }

    #[test]
    fn test_flagged_ids_mark_timeline_alerts() {
        let alert = |id| AlertResponse {
            id,
            ..Default::default()
        };
        let timeline = vec![alert(3), alert(1), alert(2)];
        let flagged = vec![alert(2), alert(99)];

        let merged = merge_alerts(&flagged, &timeline, |r| Alert {
            alert_id: r.id,
            ..Default::default()
        });

        let ids: Vec<u64> = merged.iter().map(|a| a.alert_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(merged[1].flagged);
        assert!(!merged[0].flagged && !merged[2].flagged);
    }

    #[test]
    fn test_capacity_with_zero_capacity() {
        let capacity = convert_capacity(&ArrayCapacityMetricsResponse {
            total: 10,
            ..Default::default()
        });
        assert_eq!(capacity.percent_full, 0.0);

        let capacity = convert_capacity(&ArrayCapacityMetricsResponse {
            capacity: 200,
            total: 50,
            snapshots: 5,
            volumes: 40,
            ..Default::default()
        });
        assert_eq!(capacity.percent_full, 0.25);
        assert_eq!(capacity.used_space, 50);
        assert_eq!(capacity.total_space, 200);
        assert_eq!(capacity.snapshot_space, 5);
        assert_eq!(capacity.volume_space, 40);
    }

    #[test]
    fn test_performance_maps_bandwidth_directions() {
        let performance = convert_performance(&ArrayPerformanceMetricsResponse {
            input_per_sec: 100,
            output_per_sec: 300,
            usec_per_read_op: 250,
            usec_per_write_op: 400,
            queue_depth: 4,
            ..Default::default()
        });
        assert_eq!(performance.read_bandwidth, 300);
        assert_eq!(performance.write_bandwidth, 100);
        assert_eq!(performance.read_latency, 250);
        assert_eq!(performance.write_latency, 400);
        assert_eq!(performance.queue_depth, 4);
    }
}
