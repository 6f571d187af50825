//! Metadata repository contract.
//!
//! The store backend is pluggable; the engine only needs the operations
//! below. All mutations go through an explicit [`MetadataSession`] confined
//! to the worker processing one repository, and the scan driver saves the
//! session once per scan.

pub mod memory;

pub use memory::InMemoryMetadataRepository;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// The metadata store's view of one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub repository_id: String,
    /// Dotted group id.
    pub namespace: String,
    pub project: String,
    /// Base version the record is filed under, e.g. `2.2-SNAPSHOT`.
    pub project_version: String,
    /// Concrete version, e.g. `2.2-20061118.060401-2`.
    pub version: String,
    /// Filename of the main artifact.
    pub id: String,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub when_gathered: DateTime<Utc>,
}

/// Session batching metadata mutations for one repository scan.
///
/// Passed as an explicit context value, never stored globally; it is not
/// safe to share across workers.
#[derive(Debug, Default)]
pub struct MetadataSession {
    dirty: AtomicBool,
}

impl MetadataSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Relaxed);
    }

    /// Whether any mutation happened since the session was created.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Relaxed)
    }
}

/// Store of artifact records per repository/namespace/project/version.
#[async_trait::async_trait]
pub trait MetadataRepository: Send + Sync {
    /// Records filed under one project version.
    async fn list_artifacts(
        &self,
        repository_id: &str,
        namespace: &str,
        project: &str,
        project_version: &str,
    ) -> Result<Vec<ArtifactRecord>>;

    /// All known project versions of one project.
    async fn project_versions(
        &self,
        repository_id: &str,
        namespace: &str,
        project: &str,
    ) -> Result<Vec<String>>;

    /// Remove the records of one timestamped build, leaving the project
    /// version in place.
    async fn remove_timestamped_artifact(
        &self,
        session: &MetadataSession,
        record: &ArtifactRecord,
        project_version: &str,
    ) -> Result<()>;

    /// Remove an entire project version and every record under it.
    async fn remove_project_version(
        &self,
        session: &MetadataSession,
        repository_id: &str,
        namespace: &str,
        project: &str,
        project_version: &str,
    ) -> Result<()>;

    /// Flush the session's mutations to persistent storage.
    async fn save(&self, session: &MetadataSession) -> Result<()>;
}
