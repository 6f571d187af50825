//! Keep-N-builds policy.

use super::{
    delete_build, regenerate_after_build_purge, remove_dir_if_empty, resolve_candidate,
    PurgeContext, PurgeOutcome, PurgePolicy,
};
use crate::build::group_builds;
use anyhow::Result;
use std::path::Path;
use tracing::{debug, info};

/// Keeps the `retention_count` most recent builds of a base version and
/// deletes the rest.
pub struct RetentionCountPolicy {
    retention_count: u32,
}

impl RetentionCountPolicy {
    pub fn new(retention_count: u32) -> Self {
        Self { retention_count }
    }
}

#[async_trait::async_trait]
impl PurgePolicy for RetentionCountPolicy {
    fn name(&self) -> &'static str {
        "retention-count"
    }

    async fn process(&self, ctx: &PurgeContext<'_>, path: &Path) -> Result<PurgeOutcome> {
        let mut outcome = PurgeOutcome::default();

        // A zero count would delete every build; treat it as an unset
        // configuration and retain everything.
        if self.retention_count == 0 {
            debug!("retention count is 0, retaining everything");
            return Ok(outcome);
        }

        let Some(artifact) = resolve_candidate(path) else {
            return Ok(outcome);
        };

        let version_dir = ctx
            .repository
            .root
            .join(artifact.base_version_path());
        // An earlier trigger of this scan may already have emptied the
        // directory out.
        if !version_dir.is_dir() {
            return Ok(outcome);
        }
        let builds = group_builds(&version_dir, &artifact.project, &artifact.base_version)?;
        let keep = self.retention_count as usize;
        if builds.len() <= keep {
            return Ok(outcome);
        }

        let records = ctx
            .metadata
            .list_artifacts(
                &ctx.repository.id,
                &artifact.namespace,
                &artifact.project,
                &artifact.base_version,
            )
            .await?;

        for build in &builds[keep..] {
            if ctx.cancelled() {
                debug!("purge cancelled between builds");
                break;
            }
            let removal = delete_build(ctx, &artifact, &records, build).await?;
            outcome.files_removed += removal.files_removed;
            if removal.complete {
                outcome.builds_removed += 1;
            }
        }

        if outcome.files_removed > 0 {
            regenerate_after_build_purge(ctx, &artifact).await?;
            remove_dir_if_empty(&version_dir);
            info!(
                project = artifact.project,
                base_version = artifact.base_version,
                builds = outcome.builds_removed,
                files = outcome.files_removed,
                "retention-count purge complete"
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::group_builds;
    use crate::metadata::MetadataRepository;
    use crate::testing::{record, FixtureRepository, PolicyHarness};
    use std::path::PathBuf;

    const NS: &str = "org.apache.maven";
    const PROJECT: &str = "maven-model";
    const BASE: &str = "2.2-SNAPSHOT";

    fn trigger_path() -> PathBuf {
        PathBuf::from(format!(
            "org/apache/maven/{PROJECT}/{BASE}/{PROJECT}-2.2-20061118.060401-2.jar"
        ))
    }

    fn seed(fixture: &FixtureRepository, harness: &PolicyHarness, concretes: &[&str]) {
        for concrete in concretes {
            fixture.add_build(NS, PROJECT, BASE, concrete, &[]);
            harness
                .store
                .add_record(record(&fixture.repository.id, NS, PROJECT, BASE, concrete));
        }
    }

    #[tokio::test]
    async fn keeps_the_n_most_recent_builds() {
        let fixture = FixtureRepository::new("internal");
        let harness = PolicyHarness::new();
        seed(
            &fixture,
            &harness,
            &[
                "2.2-20061115.121410-1",
                "2.2-20061118.060401-2",
                "2.2-20061120.154352-3",
                "2.2-20061122.080000-4",
            ],
        );

        let repos = std::slice::from_ref(&fixture.repository);
        let ctx = harness.context(&fixture.repository, repos);
        let outcome = RetentionCountPolicy::new(2)
            .process(&ctx, &trigger_path())
            .await
            .unwrap();

        assert_eq!(outcome.builds_removed, 2);
        let dir = fixture.version_dir(NS, PROJECT, BASE);
        let surviving = group_builds(&dir, PROJECT, BASE).unwrap();
        let versions: Vec<&str> = surviving.iter().map(|b| b.concrete_version()).collect();
        assert_eq!(
            versions,
            vec!["2.2-20061122.080000-4", "2.2-20061120.154352-3"]
        );
    }

    #[tokio::test]
    async fn no_deletion_when_count_covers_all_builds() {
        let fixture = FixtureRepository::new("internal");
        let harness = PolicyHarness::new();
        seed(
            &fixture,
            &harness,
            &["2.2-20061115.121410-1", "2.2-20061118.060401-2"],
        );

        let repos = std::slice::from_ref(&fixture.repository);
        let ctx = harness.context(&fixture.repository, repos);
        let outcome = RetentionCountPolicy::new(3)
            .process(&ctx, &trigger_path())
            .await
            .unwrap();

        assert_eq!(outcome, PurgeOutcome::default());
        assert_eq!(harness.listener.count(), 0);
    }

    #[tokio::test]
    async fn listener_fires_once_per_physical_file() {
        let fixture = FixtureRepository::new("internal");
        let harness = PolicyHarness::new();
        // Two builds of 4 files each (jar, md5, sha1, pom) plus one
        // classifier on the oldest.
        fixture.add_build(NS, PROJECT, BASE, "2.2-20061115.121410-1", &["sources"]);
        fixture.add_build(NS, PROJECT, BASE, "2.2-20061118.060401-2", &[]);
        fixture.add_build(NS, PROJECT, BASE, "2.2-20061120.154352-3", &[]);
        for concrete in [
            "2.2-20061115.121410-1",
            "2.2-20061118.060401-2",
            "2.2-20061120.154352-3",
        ] {
            harness
                .store
                .add_record(record(&fixture.repository.id, NS, PROJECT, BASE, concrete));
        }

        let repos = std::slice::from_ref(&fixture.repository);
        let ctx = harness.context(&fixture.repository, repos);
        let outcome = RetentionCountPolicy::new(2)
            .process(&ctx, &trigger_path())
            .await
            .unwrap();

        // oldest build: 4 base files + 1 classifier jar
        assert_eq!(outcome.files_removed, 5);
        assert_eq!(harness.listener.count(), 5);
        assert_eq!(outcome.builds_removed, 1);
    }

    #[tokio::test]
    async fn second_run_is_idempotent() {
        let fixture = FixtureRepository::new("internal");
        let harness = PolicyHarness::new();
        seed(
            &fixture,
            &harness,
            &[
                "2.2-20061115.121410-1",
                "2.2-20061118.060401-2",
                "2.2-20061120.154352-3",
            ],
        );

        let repos = std::slice::from_ref(&fixture.repository);
        let policy = RetentionCountPolicy::new(2);
        let ctx = harness.context(&fixture.repository, repos);
        policy.process(&ctx, &trigger_path()).await.unwrap();
        let first_count = harness.listener.count();

        let ctx = harness.context(&fixture.repository, repos);
        let second = policy.process(&ctx, &trigger_path()).await.unwrap();
        assert_eq!(second, PurgeOutcome::default());
        assert_eq!(harness.listener.count(), first_count);
    }

    #[tokio::test]
    async fn metadata_records_follow_the_files() {
        let fixture = FixtureRepository::new("internal");
        let harness = PolicyHarness::new();
        seed(
            &fixture,
            &harness,
            &[
                "2.2-20061115.121410-1",
                "2.2-20061118.060401-2",
                "2.2-20061120.154352-3",
            ],
        );

        let repos = std::slice::from_ref(&fixture.repository);
        let ctx = harness.context(&fixture.repository, repos);
        RetentionCountPolicy::new(1)
            .process(&ctx, &trigger_path())
            .await
            .unwrap();

        let left = harness
            .store
            .list_artifacts("internal", NS, PROJECT, BASE)
            .await
            .unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].version, "2.2-20061120.154352-3");
        assert!(harness.session.is_dirty());
    }

    #[tokio::test]
    async fn unrecognized_path_is_a_silent_noop() {
        let fixture = FixtureRepository::new("internal");
        let harness = PolicyHarness::new();

        let repos = std::slice::from_ref(&fixture.repository);
        let ctx = harness.context(&fixture.repository, repos);
        let outcome = RetentionCountPolicy::new(2)
            .process(&ctx, Path::new(".index/nexus-maven-repository-index.zip"))
            .await
            .unwrap();

        assert_eq!(outcome, PurgeOutcome::default());
        assert_eq!(harness.listener.count(), 0);
        assert!(!harness.session.is_dirty());
    }

    #[tokio::test]
    async fn zero_count_retains_everything() {
        let fixture = FixtureRepository::new("internal");
        let harness = PolicyHarness::new();
        seed(
            &fixture,
            &harness,
            &["2.2-20061115.121410-1", "2.2-20061118.060401-2"],
        );

        let repos = std::slice::from_ref(&fixture.repository);
        let ctx = harness.context(&fixture.repository, repos);
        let outcome = RetentionCountPolicy::new(0)
            .process(&ctx, &trigger_path())
            .await
            .unwrap();

        assert_eq!(outcome, PurgeOutcome::default());
        let dir = fixture.version_dir(NS, PROJECT, BASE);
        assert_eq!(group_builds(&dir, PROJECT, BASE).unwrap().len(), 2);
    }
}
