use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use telemetry_core::{TelemetryError, TelemetryResult};
use telemetry_domain::{Alert, ArrayMetric, MetricsStore, VolumeMetric};

use super::retention::{
    alert_cutoff, plan_retention, today_index, ALERTS_COLLECTION, ARRAY_METRICS_PREFIX,
    ERROR_LOG_PREFIX, TIMER_LOG_PREFIX, VOLUME_METRICS_PREFIX,
};
use super::{storable_alerts, system_clock, Clock};

const DOCUMENTS_FILE: &str = "documents.jsonl";
const ALERTS_FILE: &str = "alerts.json";

/// Index-per-day store on the local filesystem.
///
/// Each index is a directory holding one JSON-lines file. A read-only
/// index has a read-only documents file.
pub struct FileMetricsStore {
    root: PathBuf,
    clock: Clock,
    write_lock: Mutex<()>,
}

impl FileMetricsStore {
    pub async fn open(root: impl Into<PathBuf>) -> TelemetryResult<Self> {
        Self::open_with_clock(root, system_clock()).await
    }

    pub async fn open_with_clock(root: impl Into<PathBuf>, clock: Clock) -> TelemetryResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        info!(root = %root.display(), "Opened file metrics store");
        Ok(Self {
            root,
            clock,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn documents_path(&self, index: &str) -> PathBuf {
        self.root.join(index).join(DOCUMENTS_FILE)
    }

    /// Create an empty index if it does not exist yet
    pub async fn create_index(&self, name: &str) -> TelemetryResult<()> {
        fs::create_dir_all(self.root.join(name)).await?;
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.documents_path(name))
            .await?;
        Ok(())
    }

    pub async fn index_names(&self) -> TelemetryResult<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub async fn documents(&self, index: &str) -> TelemetryResult<Vec<serde_json::Value>> {
        let content = match fs::read_to_string(self.documents_path(index)).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(TelemetryError::from))
            .collect()
    }

    pub async fn is_read_only(&self, index: &str) -> TelemetryResult<bool> {
        match fs::metadata(self.documents_path(index)).await {
            Ok(metadata) => Ok(metadata.permissions().readonly()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Stored alerts keyed by natural key
    pub async fn alerts(&self) -> TelemetryResult<HashMap<String, Alert>> {
        let path = self.root.join(ALERTS_COLLECTION).join(ALERTS_FILE);
        match fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_alerts(&self, alerts: &HashMap<String, Alert>) -> TelemetryResult<()> {
        let dir = self.root.join(ALERTS_COLLECTION);
        fs::create_dir_all(&dir).await?;
        let staging = dir.join(format!("{ALERTS_FILE}.tmp"));
        fs::write(&staging, serde_json::to_vec(alerts)?).await?;
        fs::rename(&staging, dir.join(ALERTS_FILE)).await?;
        Ok(())
    }

    async fn write_documents<T: Serialize>(
        &self,
        prefix: &str,
        documents: &[T],
    ) -> TelemetryResult<()> {
        if documents.is_empty() {
            return Ok(());
        }
        let index = today_index(prefix, (self.clock)());

        let mut buffer = Vec::new();
        for document in documents {
            serde_json::to_writer(&mut buffer, document)?;
            buffer.push(b'\n');
        }

        let _guard = self.write_lock.lock().await;
        if self.is_read_only(&index).await? {
            return Err(TelemetryError::ReadOnlyIndex(index));
        }
        fs::create_dir_all(self.root.join(&index)).await?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.documents_path(&index))
            .await?;
        file.write_all(&buffer).await?;
        file.flush().await?;

        debug!(index = %index, count = documents.len(), "Stored documents");
        Ok(())
    }

    async fn apply_retention(&self, prefix: &str, max_age_days: u32) -> TelemetryResult<()> {
        let _guard = self.write_lock.lock().await;
        let names = self.index_names().await?;
        let plan = plan_retention(
            names.iter().map(String::as_str),
            prefix,
            (self.clock)(),
            max_age_days,
        );

        for index in plan.delete {
            info!(index = %index, "Deleting index past retention");
            fs::remove_dir_all(self.root.join(&index))
                .await
                .map_err(|e| TelemetryError::Store(format!("could not delete {index}: {e}")))?;
        }

        for index in plan.read_only {
            if self.is_read_only(&index).await? {
                continue;
            }
            let path = self.documents_path(&index);
            fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await?;
            let mut permissions = fs::metadata(&path).await?.permissions();
            permissions.set_readonly(true);
            fs::set_permissions(&path, permissions).await?;
            info!(index = %index, "Marked index read-only");
        }
        Ok(())
    }
}

#[async_trait]
impl MetricsStore for FileMetricsStore {
    async fn add_array_metrics(&self, metrics: &[ArrayMetric]) -> TelemetryResult<()> {
        self.write_documents(ARRAY_METRICS_PREFIX, metrics).await
    }

    async fn add_volume_metrics(&self, metrics: &[VolumeMetric]) -> TelemetryResult<()> {
        self.write_documents(VOLUME_METRICS_PREFIX, metrics).await
    }

    async fn update_alerts(&self, alerts: &[Alert]) -> TelemetryResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut stored = self.alerts().await?;
        for alert in storable_alerts(alerts) {
            stored.insert(alert.store_key(), alert.clone());
        }
        self.save_alerts(&stored).await
    }

    async fn clean_array_metrics(&self, max_age_days: u32) -> TelemetryResult<()> {
        self.apply_retention(ARRAY_METRICS_PREFIX, max_age_days)
            .await
    }

    async fn clean_volume_metrics(&self, max_age_days: u32) -> TelemetryResult<()> {
        self.apply_retention(VOLUME_METRICS_PREFIX, max_age_days)
            .await
    }

    async fn clean_alerts(&self, max_age_days: u32) -> TelemetryResult<()> {
        let cutoff = alert_cutoff((self.clock)(), max_age_days);
        let _guard = self.write_lock.lock().await;
        let mut stored = self.alerts().await?;
        let before = stored.len();
        stored.retain(|_, alert| alert.created >= cutoff);
        if stored.len() != before {
            self.save_alerts(&stored).await?;
        }
        info!(
            removed = before - stored.len(),
            "Deleted alerts past retention"
        );
        Ok(())
    }

    async fn clean_error_logs(&self, max_age_days: u32) -> TelemetryResult<()> {
        self.apply_retention(ERROR_LOG_PREFIX, max_age_days).await
    }

    async fn clean_timer_logs(&self, max_age_days: u32) -> TelemetryResult<()> {
        self.apply_retention(TIMER_LOG_PREFIX, max_age_days).await
    }
}
