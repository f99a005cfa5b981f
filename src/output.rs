//! Output sinks that receive finalized session records
//!
//! The pipeline core never writes anything itself; once a run is finalized
//! the service hands the [`SessionRecord`] to whichever sink is configured.

use crate::error::{AugmentError, ErrorCode, Result};
use crate::session::{SessionId, SessionRecord};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

#[async_trait]
pub trait OutputSink: Send + Sync {
    fn name(&self) -> &str;

    /// Persist one finalized record (with its artifacts)
    async fn store(&self, record: &SessionRecord) -> Result<()>;
}

/// Keeps records in memory, for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<RwLock<Vec<SessionRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<SessionRecord> {
        self.records.read().await.clone()
    }

    pub async fn get(&self, session_id: &SessionId) -> Option<SessionRecord> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| &r.session_id == session_id)
            .cloned()
    }
}

#[async_trait]
impl OutputSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn store(&self, record: &SessionRecord) -> Result<()> {
        self.records.write().await.push(record.clone());
        Ok(())
    }
}

/// Writes each record to `<base_dir>/<session_id>.json`
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    base_dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn path_for(&self, session_id: &SessionId) -> PathBuf {
        self.base_dir.join(format!("{}.json", session_id))
    }

    /// Read back a stored record; `None` if the session was never stored
    pub async fn load(&self, session_id: &SessionId) -> Result<Option<SessionRecord>> {
        let path = self.path_for(session_id);
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}

#[async_trait]
impl OutputSink for JsonFileSink {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn store(&self, record: &SessionRecord) -> Result<()> {
        fs::create_dir_all(&self.base_dir).await.map_err(|e| {
            AugmentError::other_with_code(
                ErrorCode::OTHER_IO,
                format!(
                    "Failed to create output directory {}",
                    self.base_dir.display()
                ),
            )
            .with_source(e)
        })?;

        let path = self.path_for(&record.session_id);
        let content = serde_json::to_string_pretty(record)?;
        fs::write(&path, content).await?;
        tracing::debug!(session_id = %record.session_id, path = %path.display(), "Stored session record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_request, TestContext};
    use tempfile::TempDir;

    async fn finished_record() -> SessionRecord {
        TestContext::new()
            .orchestrator()
            .run(sample_request())
            .await
            .record
    }

    #[tokio::test]
    async fn test_memory_sink_keeps_records() {
        let sink = MemorySink::new();
        let record = finished_record().await;
        sink.store(&record).await.unwrap();

        assert_eq!(sink.records().await.len(), 1);
        assert_eq!(sink.get(&record.session_id).await, Some(record));
    }

    #[tokio::test]
    async fn test_json_sink_writes_and_loads() {
        let temp_dir = TempDir::new().unwrap();
        let sink = JsonFileSink::new(temp_dir.path().join("sessions"));
        let record = finished_record().await;

        sink.store(&record).await.unwrap();

        assert!(sink.path_for(&record.session_id).exists());
        let loaded = sink.load(&record.session_id).await.unwrap().unwrap();
        assert_eq!(loaded.session_id, record.session_id);
        assert_eq!(loaded.final_status, record.final_status);
        assert_eq!(loaded.stage_history.len(), 8);
    }

    #[tokio::test]
    async fn test_json_sink_missing_record() {
        let temp_dir = TempDir::new().unwrap();
        let sink = JsonFileSink::new(temp_dir.path());
        assert!(sink.load(&SessionId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_json_sink_load_before_any_store() {
        let temp_dir = TempDir::new().unwrap();
        let sink = JsonFileSink::new(temp_dir.path().join("never-created"));
        assert!(sink.load(&SessionId::new()).await.unwrap().is_none());
        assert!(!sink.base_dir().exists());
    }
}
