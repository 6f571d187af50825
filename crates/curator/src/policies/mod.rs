//! Purge policies: the retention/space-reclamation core.
//!
//! Three interchangeable strategies share one contract: given a triggering
//! path (relative to the repository root) they decide which builds are
//! superseded, delete their files, keep the metadata store in step and
//! trigger index regeneration. Policies are idempotent per directory, so a
//! scan feeding every file of a version directory through them is safe.

pub mod days_old;
pub mod released;
pub mod retention_count;

pub use days_old::DaysOldPolicy;
pub use released::CleanupReleasedSnapshotsPolicy;
pub use retention_count::RetentionCountPolicy;

use crate::build::Build;
use crate::index::VersionIndexWriter;
use crate::layout::{parse_artifact_path, strip_checksum_suffix, ArtifactRef, VersionToken};
use crate::listener::{DeletedArtifact, ListenerBus};
use crate::metadata::{ArtifactRecord, MetadataRepository, MetadataSession};
use crate::repository::ManagedRepository;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything a policy invocation needs, passed explicitly per call.
///
/// The session is confined to the one worker scanning this repository; no
/// policy holds state across calls.
pub struct PurgeContext<'a> {
    pub repository: &'a ManagedRepository,
    /// All managed repositories, for cross-repository release lookup.
    pub all_repositories: &'a [ManagedRepository],
    pub metadata: Arc<dyn MetadataRepository>,
    pub session: &'a MetadataSession,
    pub listeners: &'a ListenerBus,
    pub index_writer: &'a dyn VersionIndexWriter,
    /// Checked between builds; a build in flight always completes.
    pub cancel: &'a AtomicBool,
}

impl PurgeContext<'_> {
    pub fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// What one policy invocation removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeOutcome {
    pub builds_removed: usize,
    pub files_removed: usize,
}

/// Shared contract of the three strategies.
#[async_trait::async_trait]
pub trait PurgePolicy: Send + Sync {
    /// Human-readable policy name for logs and stats.
    fn name(&self) -> &'static str;

    /// Process one triggering path, relative to the repository root.
    ///
    /// Unrecognized paths are a silent no-op. An `Err` means the metadata
    /// store (or something equally fatal) failed and the remainder of this
    /// repository's run must be abandoned.
    async fn process(&self, ctx: &PurgeContext<'_>, path: &Path) -> Result<PurgeOutcome>;
}

/// Resolve a triggering path, or `None` for the silent no-op case.
pub(crate) fn resolve_candidate(path: &Path) -> Option<ArtifactRef> {
    let relative = path.to_str()?;
    match parse_artifact_path(relative) {
        Ok(artifact) => Some(artifact),
        Err(err) => {
            debug!(%err, "skipping non-artifact path");
            None
        }
    }
}

pub(crate) struct BuildRemoval {
    pub files_removed: usize,
    /// False when any member survived; the build's metadata record is then
    /// deliberately left in place so the divergence stays discoverable.
    pub complete: bool,
}

/// Delete one build: every member file, one listener call per removed file,
/// then one metadata removal per concrete version the members carried
/// (alias files ride along with their build and take the base-version
/// record with them) -- but only if all members went away.
pub(crate) async fn delete_build(
    ctx: &PurgeContext<'_>,
    artifact: &ArtifactRef,
    records: &[ArtifactRecord],
    build: &Build,
) -> Result<BuildRemoval> {
    let mut removal = BuildRemoval {
        files_removed: 0,
        complete: true,
    };

    for member in &build.members {
        match std::fs::remove_file(member) {
            Ok(()) => {
                removal.files_removed += 1;
                ctx.listeners.notify(&DeletedArtifact {
                    repository_id: ctx.repository.id.clone(),
                    namespace: artifact.namespace.clone(),
                    project: artifact.project.clone(),
                    project_version: artifact.base_version.clone(),
                    path: relative_to_root(ctx.repository, member),
                });
            }
            Err(err) => {
                warn!(
                    file = %member.display(),
                    %err,
                    "failed to delete build member, skipping file"
                );
                removal.complete = false;
            }
        }
    }

    if !removal.complete {
        warn!(
            version = build.concrete_version(),
            "build only partially deleted, keeping its metadata record"
        );
        return Ok(removal);
    }

    for version in member_versions(artifact, build) {
        match records.iter().find(|r| r.version == version) {
            Some(record) => {
                ctx.metadata
                    .remove_timestamped_artifact(ctx.session, record, &artifact.base_version)
                    .await?;
            }
            None => debug!(version, "no metadata record for deleted build"),
        }
    }

    Ok(removal)
}

/// The distinct concrete versions a build's member files carry: the build's
/// own version, plus the base-version alias when alias files were grouped
/// into it.
fn member_versions(artifact: &ArtifactRef, build: &Build) -> Vec<String> {
    let mut versions = vec![build.concrete_version().to_string()];
    for member in &build.members {
        let Some(name) = member.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(rest) = strip_checksum_suffix(name)
            .strip_prefix(artifact.project.as_str())
            .and_then(|r| r.strip_prefix('-'))
        else {
            continue;
        };
        if let Some((token, _)) = VersionToken::match_prefix(rest, &artifact.base_version) {
            if !versions.contains(&token.raw) {
                versions.push(token.raw);
            }
        }
    }
    versions
}

fn relative_to_root(repository: &ManagedRepository, path: &Path) -> PathBuf {
    path.strip_prefix(&repository.root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Records across every project version, for the project-level index.
pub(crate) async fn project_records(
    ctx: &PurgeContext<'_>,
    namespace: &str,
    project: &str,
) -> Result<Vec<ArtifactRecord>> {
    let mut records = Vec::new();
    let versions = ctx
        .metadata
        .project_versions(&ctx.repository.id, namespace, project)
        .await?;
    for version in versions {
        records.extend(
            ctx.metadata
                .list_artifacts(&ctx.repository.id, namespace, project, &version)
                .await?,
        );
    }
    Ok(records)
}

/// Regenerate the indexes touched by a count/days-old purge: the snapshot
/// block of the surviving base version plus the project document.
pub(crate) async fn regenerate_after_build_purge(
    ctx: &PurgeContext<'_>,
    artifact: &ArtifactRef,
) -> Result<()> {
    let surviving = ctx
        .metadata
        .list_artifacts(
            &ctx.repository.id,
            &artifact.namespace,
            &artifact.project,
            &artifact.base_version,
        )
        .await?;
    ctx.index_writer.write_version_index(
        &ctx.repository.root,
        &artifact.namespace,
        &artifact.project,
        &artifact.base_version,
        &surviving,
    )?;

    let all = project_records(ctx, &artifact.namespace, &artifact.project).await?;
    ctx.index_writer.write_project_index(
        &ctx.repository.root,
        &artifact.namespace,
        &artifact.project,
        &all,
    )?;
    Ok(())
}

/// Directories empty out as a consequence of file deletion, not as a
/// separate step; sweep one level when the purge finished a directory.
pub(crate) fn remove_dir_if_empty(dir: &Path) {
    match std::fs::read_dir(dir) {
        Ok(mut entries) => {
            if entries.next().is_none() {
                if let Err(err) = std::fs::remove_dir(dir) {
                    warn!(dir = %dir.display(), %err, "failed to remove empty directory");
                }
            }
        }
        Err(_) => {}
    }
}
