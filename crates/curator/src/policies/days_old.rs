//! Delete-older-than-N-days policy, with a keep-newest floor.

use super::{
    delete_build, regenerate_after_build_purge, remove_dir_if_empty, resolve_candidate,
    PurgeContext, PurgeOutcome, PurgePolicy,
};
use crate::build::group_builds;
use anyhow::Result;
use chrono::{Duration, Utc};
use std::path::Path;
use tracing::{debug, info};

/// Deletes builds whose effective age exceeds `retention_period_days`,
/// always keeping the newest `retention_count` builds regardless of age.
///
/// A build's effective timestamp is the one encoded in its concrete version
/// when present, else the file mtime (see [`crate::build::Build::effective_timestamp`]).
pub struct DaysOldPolicy {
    retention_period_days: u32,
    retention_count: u32,
}

impl DaysOldPolicy {
    pub fn new(retention_period_days: u32, retention_count: u32) -> Self {
        Self {
            retention_period_days,
            retention_count,
        }
    }
}

#[async_trait::async_trait]
impl PurgePolicy for DaysOldPolicy {
    fn name(&self) -> &'static str {
        "days-old"
    }

    async fn process(&self, ctx: &PurgeContext<'_>, path: &Path) -> Result<PurgeOutcome> {
        let mut outcome = PurgeOutcome::default();

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
        let floor = self.retention_count as usize;
        if builds.len() <= floor {
            return Ok(outcome);
        }

        let cutoff = Utc::now() - Duration::days(i64::from(self.retention_period_days));
        let records = ctx
            .metadata
            .list_artifacts(
                &ctx.repository.id,
                &artifact.namespace,
                &artifact.project,
                &artifact.base_version,
            )
            .await?;

        // Builds are ordered most recent first; everything past the floor
        // is a candidate, deleted only when actually old enough.
        for build in &builds[floor..] {
            if ctx.cancelled() {
                debug!("purge cancelled between builds");
                break;
            }
            let Some(effective) = build.effective_timestamp() else {
                debug!(
                    version = build.concrete_version(),
                    "no effective timestamp, keeping build"
                );
                continue;
            };
            if effective >= cutoff {
                continue;
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
                "days-old purge complete"
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
    use chrono::{DateTime, Utc};
    use std::path::PathBuf;

    const NS: &str = "org.apache.maven";
    const PROJECT: &str = "maven-model";
    const BASE: &str = "2.2-SNAPSHOT";

    fn stamp(days_ago: i64) -> String {
        let when = Utc::now() - Duration::days(days_ago);
        when.format("%Y%m%d.%H%M%S").to_string()
    }

    fn trigger_path(concrete: &str) -> PathBuf {
        PathBuf::from(format!(
            "org/apache/maven/{PROJECT}/{BASE}/{PROJECT}-{concrete}.jar"
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
    async fn deletes_only_aged_builds_past_the_floor() {
        let fixture = FixtureRepository::new("internal");
        let harness = PolicyHarness::new();
        let old_a = format!("2.2-{}-1", stamp(45));
        let old_b = format!("2.2-{}-2", stamp(40));
        let new_a = format!("2.2-{}-3", stamp(5));
        let new_b = format!("2.2-{}-4", stamp(1));
        seed(&fixture, &harness, &[&old_a, &old_b, &new_a, &new_b]);

        let repos = std::slice::from_ref(&fixture.repository);
        let ctx = harness.context(&fixture.repository, repos);
        let outcome = DaysOldPolicy::new(30, 2)
            .process(&ctx, &trigger_path(&new_b))
            .await
            .unwrap();

        assert_eq!(outcome.builds_removed, 2);
        let dir = fixture.version_dir(NS, PROJECT, BASE);
        let surviving = group_builds(&dir, PROJECT, BASE).unwrap();
        let versions: Vec<&str> = surviving.iter().map(|b| b.concrete_version()).collect();
        assert_eq!(versions, vec![new_b.as_str(), new_a.as_str()]);
    }

    #[tokio::test]
    async fn floor_protects_old_builds() {
        let fixture = FixtureRepository::new("internal");
        let harness = PolicyHarness::new();
        // Both builds are far older than the period, but the floor of 2
        // keeps them.
        let old_a = format!("2.2-{}-1", stamp(300));
        let old_b = format!("2.2-{}-2", stamp(200));
        seed(&fixture, &harness, &[&old_a, &old_b]);

        let repos = std::slice::from_ref(&fixture.repository);
        let ctx = harness.context(&fixture.repository, repos);
        let outcome = DaysOldPolicy::new(30, 2)
            .process(&ctx, &trigger_path(&old_b))
            .await
            .unwrap();

        assert_eq!(outcome, PurgeOutcome::default());
        assert_eq!(harness.listener.count(), 0);
    }

    #[tokio::test]
    async fn recent_builds_past_the_floor_survive() {
        let fixture = FixtureRepository::new("internal");
        let harness = PolicyHarness::new();
        let builds: Vec<String> = (0..4)
            .map(|i| format!("2.2-{}-{}", stamp(4 - i), i + 1))
            .collect();
        let refs: Vec<&str> = builds.iter().map(String::as_str).collect();
        seed(&fixture, &harness, &refs);

        let repos = std::slice::from_ref(&fixture.repository);
        let ctx = harness.context(&fixture.repository, repos);
        let outcome = DaysOldPolicy::new(30, 2)
            .process(&ctx, &trigger_path(&builds[3]))
            .await
            .unwrap();

        // All four are younger than 30 days; nothing to delete.
        assert_eq!(outcome, PurgeOutcome::default());
    }

    #[tokio::test]
    async fn encoded_timestamp_beats_recent_mtime() {
        let fixture = FixtureRepository::new("internal");
        let harness = PolicyHarness::new();
        let old = format!("2.2-{}-1", stamp(45));
        let new_a = format!("2.2-{}-2", stamp(2));
        let new_b = format!("2.2-{}-3", stamp(1));
        // The old build's files were just written, so their mtime is now;
        // the encoded stamp must still get it deleted.
        seed(&fixture, &harness, &[&old, &new_a, &new_b]);

        let repos = std::slice::from_ref(&fixture.repository);
        let ctx = harness.context(&fixture.repository, repos);
        let outcome = DaysOldPolicy::new(30, 2)
            .process(&ctx, &trigger_path(&new_b))
            .await
            .unwrap();

        assert_eq!(outcome.builds_removed, 1);
        let dir = fixture.version_dir(NS, PROJECT, BASE);
        let surviving = group_builds(&dir, PROJECT, BASE).unwrap();
        assert!(surviving.iter().all(|b| b.concrete_version() != old));
    }

    #[tokio::test]
    async fn old_mtime_with_recent_encoded_timestamp_is_kept() {
        let fixture = FixtureRepository::new("internal");
        let harness = PolicyHarness::new();
        let recent = format!("2.2-{}-1", stamp(2));
        let newer_a = format!("2.2-{}-2", stamp(1));
        let newer_b = format!("2.2-{}-3", stamp(0));
        let paths = fixture.add_build(NS, PROJECT, BASE, &recent, &[]);
        fixture.add_build(NS, PROJECT, BASE, &newer_a, &[]);
        fixture.add_build(NS, PROJECT, BASE, &newer_b, &[]);
        for p in &paths {
            FixtureRepository::set_mtime(p, Utc::now() - Duration::days(400));
        }

        let repos = std::slice::from_ref(&fixture.repository);
        let ctx = harness.context(&fixture.repository, repos);
        let outcome = DaysOldPolicy::new(30, 2)
            .process(&ctx, &trigger_path(&newer_b))
            .await
            .unwrap();

        assert_eq!(outcome, PurgeOutcome::default());
    }

    #[tokio::test]
    async fn mtime_is_the_fallback_for_non_timestamped_builds() {
        let fixture = FixtureRepository::new("internal");
        let harness = PolicyHarness::new();
        // A plain release directory has no encoded timestamp; age comes
        // from the file mtime.
        let paths = fixture.add_build(NS, PROJECT, "2.1", "2.1", &[]);
        for p in &paths {
            FixtureRepository::set_mtime(p, Utc::now() - Duration::days(400));
        }
        harness
            .store
            .add_record(record("internal", NS, PROJECT, "2.1", "2.1"));

        let repos = std::slice::from_ref(&fixture.repository);
        let ctx = harness.context(&fixture.repository, repos);
        let outcome = DaysOldPolicy::new(30, 0)
            .process(
                &ctx,
                &PathBuf::from(format!("org/apache/maven/{PROJECT}/2.1/{PROJECT}-2.1.jar")),
            )
            .await
            .unwrap();

        assert_eq!(outcome.builds_removed, 1);
        assert!(!fixture.version_dir(NS, PROJECT, "2.1").exists());
    }

    #[tokio::test]
    async fn alias_records_are_removed_with_their_build() {
        let fixture = FixtureRepository::new("internal");
        let harness = PolicyHarness::new();
        let old = format!("2.2-{}-1", stamp(45));
        fixture.add_build(NS, PROJECT, BASE, &old, &[]);
        // alias files group into the newest build and go down with it
        fixture.add_file(&format!(
            "org/apache/maven/{PROJECT}/{BASE}/{PROJECT}-{BASE}.jar"
        ));
        harness
            .store
            .add_record(record("internal", NS, PROJECT, BASE, &old));
        harness
            .store
            .add_record(record("internal", NS, PROJECT, BASE, BASE));

        let repos = std::slice::from_ref(&fixture.repository);
        let ctx = harness.context(&fixture.repository, repos);
        let outcome = DaysOldPolicy::new(30, 0)
            .process(&ctx, &trigger_path(&old))
            .await
            .unwrap();

        assert_eq!(outcome.builds_removed, 1);
        assert!(!fixture.version_dir(NS, PROJECT, BASE).exists());
        let left = harness
            .store
            .list_artifacts("internal", NS, PROJECT, BASE)
            .await
            .unwrap();
        assert!(left.is_empty(), "orphaned records: {left:?}");
    }

    #[tokio::test]
    async fn deletion_is_monotonic_in_age() {
        let fixture = FixtureRepository::new("internal");
        let harness = PolicyHarness::new();
        let oldest = format!("2.2-{}-1", stamp(90));
        let older = format!("2.2-{}-2", stamp(60));
        let newer = format!("2.2-{}-3", stamp(10));
        seed(&fixture, &harness, &[&oldest, &older, &newer]);

        let repos = std::slice::from_ref(&fixture.repository);
        let ctx = harness.context(&fixture.repository, repos);
        DaysOldPolicy::new(30, 1)
            .process(&ctx, &trigger_path(&newer))
            .await
            .unwrap();

        let dir = fixture.version_dir(NS, PROJECT, BASE);
        let surviving = group_builds(&dir, PROJECT, BASE).unwrap();
        let versions: Vec<&str> = surviving.iter().map(|b| b.concrete_version()).collect();
        // If the 60-day build went, the 90-day build must have gone too.
        assert_eq!(versions, vec![newer.as_str()]);
    }
}
