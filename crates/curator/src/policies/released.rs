//! Delete-snapshot-once-released policy.

use super::{
    project_records, remove_dir_if_empty, resolve_candidate, PurgeContext, PurgeOutcome,
    PurgePolicy,
};
use crate::build::group_builds;
use crate::layout::{is_snapshot, release_version, ArtifactRef};
use crate::listener::DeletedArtifact;
use crate::repository::{ManagedRepository, ReleaseScheme};
use anyhow::Result;
use std::path::Path;
use tracing::{debug, info, warn};

/// Removes an entire snapshot base version once a matching release exists.
///
/// The release is looked up in the same repository first; other managed
/// repositories are consulted only when `cross_repository_search` is set on
/// the triggering repository.
#[derive(Debug, Default)]
pub struct CleanupReleasedSnapshotsPolicy;

impl CleanupReleasedSnapshotsPolicy {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl PurgePolicy for CleanupReleasedSnapshotsPolicy {
    fn name(&self) -> &'static str {
        "cleanup-released-snapshots"
    }

    async fn process(&self, ctx: &PurgeContext<'_>, path: &Path) -> Result<PurgeOutcome> {
        let mut outcome = PurgeOutcome::default();

        if !ctx.repository.delete_released_snapshots {
            return Ok(outcome);
        }
        let Some(artifact) = resolve_candidate(path) else {
            return Ok(outcome);
        };
        if !is_snapshot(&artifact.base_version) {
            return Ok(outcome);
        }
        let Some(release) = release_version(&artifact.base_version) else {
            return Ok(outcome);
        };

        if !self.release_exists(ctx, &artifact, release) {
            debug!(
                project = artifact.project,
                base_version = artifact.base_version,
                "no matching release, snapshot survives"
            );
            return Ok(outcome);
        }

        let version_dir = ctx
            .repository
            .root
            .join(artifact.base_version_path());
        // An earlier trigger of this scan may already have removed the
        // directory.
        if !version_dir.is_dir() {
            return Ok(outcome);
        }
        let builds = group_builds(&version_dir, &artifact.project, &artifact.base_version)?;

        // The whole base-version directory goes, index and stray files
        // included; one listener call per physical file.
        let mut complete = true;
        for entry in std::fs::read_dir(&version_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let member = entry.path();
            match std::fs::remove_file(&member) {
                Ok(()) => {
                    outcome.files_removed += 1;
                    ctx.listeners.notify(&DeletedArtifact {
                        repository_id: ctx.repository.id.clone(),
                        namespace: artifact.namespace.clone(),
                        project: artifact.project.clone(),
                        project_version: artifact.base_version.clone(),
                        path: member
                            .strip_prefix(&ctx.repository.root)
                            .map(Path::to_path_buf)
                            .unwrap_or(member.clone()),
                    });
                }
                Err(err) => {
                    warn!(file = %member.display(), %err, "failed to delete snapshot file");
                    complete = false;
                }
            }
        }
        remove_dir_if_empty(&version_dir);

        if !complete {
            warn!(
                base_version = artifact.base_version,
                "snapshot directory only partially deleted, keeping its metadata"
            );
            return Ok(outcome);
        }
        outcome.builds_removed = builds.len();

        // One project-version removal for the whole directory, never
        // per-build.
        ctx.metadata
            .remove_project_version(
                ctx.session,
                &ctx.repository.id,
                &artifact.namespace,
                &artifact.project,
                &artifact.base_version,
            )
            .await?;

        let surviving = project_records(ctx, &artifact.namespace, &artifact.project).await?;
        ctx.index_writer.write_project_index(
            &ctx.repository.root,
            &artifact.namespace,
            &artifact.project,
            &surviving,
        )?;

        info!(
            project = artifact.project,
            base_version = artifact.base_version,
            release,
            files = outcome.files_removed,
            "released snapshot cleaned up"
        );
        Ok(outcome)
    }
}

impl CleanupReleasedSnapshotsPolicy {
    fn release_exists(&self, ctx: &PurgeContext<'_>, artifact: &ArtifactRef, release: &str) -> bool {
        if holds_release(ctx.repository, artifact, release) {
            return true;
        }
        if !ctx.repository.cross_repository_search {
            return false;
        }
        ctx.all_repositories
            .iter()
            .filter(|r| r.id != ctx.repository.id && r.accepts(ReleaseScheme::Release))
            .any(|r| holds_release(r, artifact, release))
    }
}

/// A release exists when its version directory holds at least one artifact
/// file for this exact version.
fn holds_release(repository: &ManagedRepository, artifact: &ArtifactRef, release: &str) -> bool {
    let mut dir = repository.root.clone();
    for segment in artifact.namespace.split('.') {
        dir.push(segment);
    }
    dir.push(&artifact.project);
    dir.push(release);

    let Ok(entries) = std::fs::read_dir(&dir) else {
        return false;
    };
    let prefix = format!("{}-{}", artifact.project, release);
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(tail) = name.strip_prefix(&prefix) {
            // exact version only: "2.0.3" must not match "2.0.30"
            if tail.starts_with('.') || tail.starts_with('-') {
                return true;
            }
        }
    }
    false
}
