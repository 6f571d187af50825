//! Bundled in-memory metadata backend.
//!
//! Mutations are visible immediately; [`MetadataRepository::save`] is the
//! persistence flush and is a no-op here. Real deployments substitute their
//! own backend behind the same trait.

use super::{ArtifactRecord, MetadataRepository, MetadataSession};
use anyhow::Result;
use std::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
pub struct InMemoryMetadataRepository {
    records: Mutex<Vec<ArtifactRecord>>,
}

impl InMemoryMetadataRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one record, outside any session. Used when harvesting a tree
    /// and by tests.
    pub fn add_record(&self, record: ArtifactRecord) {
        self.records.lock().unwrap().push(record);
    }

    /// Every record currently held, in insertion order.
    pub fn all_records(&self) -> Vec<ArtifactRecord> {
        self.records.lock().unwrap().clone()
    }
}

fn same_version_slot(record: &ArtifactRecord, other: &ArtifactRecord) -> bool {
    record.repository_id == other.repository_id
        && record.namespace == other.namespace
        && record.project == other.project
        && record.project_version == other.project_version
}

#[async_trait::async_trait]
impl MetadataRepository for InMemoryMetadataRepository {
    async fn list_artifacts(
        &self,
        repository_id: &str,
        namespace: &str,
        project: &str,
        project_version: &str,
    ) -> Result<Vec<ArtifactRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r.repository_id == repository_id
                    && r.namespace == namespace
                    && r.project == project
                    && r.project_version == project_version
            })
            .cloned()
            .collect())
    }

    async fn project_versions(
        &self,
        repository_id: &str,
        namespace: &str,
        project: &str,
    ) -> Result<Vec<String>> {
        let mut versions: Vec<String> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r.repository_id == repository_id
                    && r.namespace == namespace
                    && r.project == project
            })
            .map(|r| r.project_version.clone())
            .collect();
        versions.sort();
        versions.dedup();
        Ok(versions)
    }

    async fn remove_timestamped_artifact(
        &self,
        session: &MetadataSession,
        record: &ArtifactRecord,
        project_version: &str,
    ) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| {
            !(same_version_slot(r, record)
                && r.project_version == project_version
                && r.version == record.version)
        });
        debug!(
            project = record.project,
            version = record.version,
            removed = before - records.len(),
            "removed timestamped artifact records"
        );
        session.mark_dirty();
        Ok(())
    }

    async fn remove_project_version(
        &self,
        session: &MetadataSession,
        repository_id: &str,
        namespace: &str,
        project: &str,
        project_version: &str,
    ) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        records.retain(|r| {
            !(r.repository_id == repository_id
                && r.namespace == namespace
                && r.project == project
                && r.project_version == project_version)
        });
        debug!(project, project_version, "removed project version records");
        session.mark_dirty();
        Ok(())
    }

    async fn save(&self, _session: &MetadataSession) -> Result<()> {
        // In-memory backend has nothing to flush.
        debug!("metadata session saved");
        Ok(())
    }
}
