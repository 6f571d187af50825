//! Scan driver: walks repository trees and feeds candidate paths to the
//! configured purge policies.
//!
//! One repository is always processed by one worker holding that
//! repository's exclusive lock; different repositories may be scanned
//! concurrently. The metadata session is saved once per scan.

use crate::index::{VersionIndexWriter, XmlVersionIndexWriter};
use crate::layout::{parse_artifact_path, strip_checksum_suffix, CHECKSUM_SUFFIXES};
use crate::listener::ListenerBus;
use crate::metadata::{ArtifactRecord, MetadataRepository, MetadataSession};
use crate::policies::{
    CleanupReleasedSnapshotsPolicy, DaysOldPolicy, PurgeContext, PurgeOutcome, PurgePolicy,
    RetentionCountPolicy,
};
use crate::repository::ManagedRepository;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};
use wildmatch::WildMatch;

/// Result of scanning one repository.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanStats {
    pub repository_id: String,
    pub candidates: usize,
    pub builds_removed: usize,
    pub files_removed: usize,
    pub failures: usize,
}

/// Walks managed repositories and runs their purge policies.
pub struct ScanDriver {
    metadata: Arc<dyn MetadataRepository>,
    listeners: ListenerBus,
    index_writer: Box<dyn VersionIndexWriter>,
    excluded: Vec<WildMatch>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    cancel: AtomicBool,
}

impl ScanDriver {
    pub fn new(
        metadata: Arc<dyn MetadataRepository>,
        listeners: ListenerBus,
        excluded_patterns: &[String],
    ) -> Self {
        Self {
            metadata,
            listeners,
            index_writer: Box::new(XmlVersionIndexWriter::new()),
            excluded: excluded_patterns.iter().map(|p| WildMatch::new(p)).collect(),
            locks: Mutex::new(HashMap::new()),
            cancel: AtomicBool::new(false),
        }
    }

    /// Ask the current and future runs to stop between builds.
    pub fn request_stop(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Scan every repository in turn. A failing repository is logged and
    /// does not affect the others.
    pub async fn scan_all(&self, repositories: &[ManagedRepository]) -> Vec<ScanStats> {
        let mut all_stats = Vec::with_capacity(repositories.len());
        for repository in repositories {
            match self.scan_repository(repository, repositories).await {
                Ok(stats) => all_stats.push(stats),
                Err(err) => {
                    error!(repository = repository.id, %err, "repository scan failed");
                    all_stats.push(ScanStats {
                        repository_id: repository.id.clone(),
                        failures: 1,
                        ..Default::default()
                    });
                }
            }
        }
        all_stats
    }

    /// Scan one repository under its exclusive lock.
    pub async fn scan_repository(
        &self,
        repository: &ManagedRepository,
        all_repositories: &[ManagedRepository],
    ) -> Result<ScanStats> {
        let lock = self.repository_lock(&repository.id);
        let _guard = lock.lock().await;

        let session = MetadataSession::new();
        let policies = policies_for(repository);
        let ctx = PurgeContext {
            repository,
            all_repositories,
            metadata: self.metadata.clone(),
            session: &session,
            listeners: &self.listeners,
            index_writer: self.index_writer.as_ref(),
            cancel: &self.cancel,
        };

        let mut stats = ScanStats {
            repository_id: repository.id.clone(),
            ..Default::default()
        };

        'walk: for entry in walk_files(&repository.root) {
            if self.cancel.load(Ordering::Relaxed) {
                info!(repository = repository.id, "scan stopped on request");
                break;
            }
            let Ok(relative) = entry.strip_prefix(&repository.root) else {
                continue;
            };
            let Some(relative_str) = relative.to_str() else {
                continue;
            };
            if self.excluded.iter().any(|m| m.matches(relative_str)) {
                debug!(path = relative_str, "excluded from scan");
                continue;
            }

            stats.candidates += 1;
            for policy in &policies {
                match policy.process(&ctx, relative).await {
                    Ok(PurgeOutcome {
                        builds_removed,
                        files_removed,
                    }) => {
                        stats.builds_removed += builds_removed;
                        stats.files_removed += files_removed;
                    }
                    Err(err) => {
                        // Metadata-store class of failure: abandon the
                        // rest of this repository's run. Filesystem
                        // deletions already performed stand.
                        error!(
                            repository = repository.id,
                            policy = policy.name(),
                            %err,
                            "policy failed, aborting repository run"
                        );
                        stats.failures += 1;
                        break 'walk;
                    }
                }
            }
        }

        if session.is_dirty() {
            self.metadata
                .save(&session)
                .await
                .context("Failed to save metadata session")?;
        }

        info!(
            repository = stats.repository_id,
            candidates = stats.candidates,
            builds_removed = stats.builds_removed,
            files_removed = stats.files_removed,
            failures = stats.failures,
            "repository scan finished"
        );
        Ok(stats)
    }

    fn repository_lock(&self, repository_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .unwrap()
            .entry(repository_id.to_string())
            .or_default()
            .clone()
    }
}

/// The policy set a repository's settings select: released-snapshot cleanup
/// when enabled, then days-old when a retention period is configured, else
/// retention-count.
fn policies_for(repository: &ManagedRepository) -> Vec<Box<dyn PurgePolicy>> {
    let mut policies: Vec<Box<dyn PurgePolicy>> = Vec::new();
    if repository.delete_released_snapshots {
        policies.push(Box::new(CleanupReleasedSnapshotsPolicy::new()));
    }
    if repository.retention_period_days > 0 {
        policies.push(Box::new(DaysOldPolicy::new(
            repository.retention_period_days,
            repository.retention_count,
        )));
    } else {
        policies.push(Box::new(RetentionCountPolicy::new(
            repository.retention_count,
        )));
    }
    policies
}

fn walk_files(root: &Path) -> Vec<std::path::PathBuf> {
    WalkBuilder::new(root)
        .standard_filters(false)
        .build()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .map(|e| e.into_path())
        .collect()
}

/// Build the metadata records for everything currently on disk, for
/// populating a fresh store before the first purge run.
pub fn harvest_records(repository: &ManagedRepository) -> Result<Vec<ArtifactRecord>> {
    let mut records = Vec::new();
    for path in walk_files(&repository.root) {
        let Ok(relative) = path.strip_prefix(&repository.root) else {
            continue;
        };
        let Some(relative_str) = relative.to_str() else {
            continue;
        };
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        // Checksums ride along with their subject.
        if strip_checksum_suffix(file_name) != file_name {
            continue;
        }
        let Ok(artifact) = parse_artifact_path(relative_str) else {
            continue;
        };

        let when_gathered = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        records.push(ArtifactRecord {
            repository_id: repository.id.clone(),
            namespace: artifact.namespace,
            project: artifact.project,
            project_version: artifact.base_version,
            version: artifact.version.raw,
            id: file_name.to_string(),
            md5: read_checksum(&path, CHECKSUM_SUFFIXES[0]),
            sha1: read_checksum(&path, CHECKSUM_SUFFIXES[1]),
            when_gathered,
        });
    }
    Ok(records)
}

fn read_checksum(path: &Path, suffix: &str) -> Option<String> {
    let mut sibling = path.as_os_str().to_owned();
    sibling.push(suffix);
    let content = std::fs::read_to_string(sibling).ok()?;
    content.split_whitespace().next().map(str::to_string)
}
