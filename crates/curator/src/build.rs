//! Grouping a base-version directory into orderable builds.
//!
//! A build is one logical artifact instance: the main file, its classifier
//! variants and every checksum sibling. It is the atomic unit of deletion.

use crate::layout::{strip_checksum_suffix, VersionToken};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One concrete version's files inside a base-version directory.
#[derive(Debug, Clone)]
pub struct Build {
    /// Parsed concrete version identifying this build.
    pub version: VersionToken,
    /// Every physical member file: main artifact, classifier variants and
    /// their checksum siblings. Deleted together or not at all.
    pub members: Vec<PathBuf>,
    /// Filesystem mtime of the first member, fallback for age decisions.
    pub file_modified: Option<DateTime<Utc>>,
}

impl Build {
    /// Concrete version string, e.g. `2.2-20061118.060401-2`.
    pub fn concrete_version(&self) -> &str {
        &self.version.raw
    }

    /// The timestamp age decisions are based on: the one encoded in the
    /// filename when present, else the filesystem mtime. Copy and deploy
    /// operations can reset mtimes but never rewrite the encoded stamp, so
    /// the encoded value is authoritative.
    pub fn effective_timestamp(&self) -> Option<DateTime<Utc>> {
        self.version.timestamp.or(self.file_modified)
    }
}

/// Partition the files of a base-version directory into builds, ordered most
/// recent first.
///
/// Files that do not carry a concrete version belonging to `base_version`
/// (index files, stray content) are left out entirely. Non-timestamped alias
/// files (`<project>-<base>-SNAPSHOT.*`, or every file of a plain release
/// directory) attach to the most recent build.
pub fn group_builds(dir: &Path, project: &str, base_version: &str) -> Result<Vec<Build>> {
    let mut grouped: BTreeMap<String, Build> = BTreeMap::new();
    let mut alias_members: Vec<PathBuf> = Vec::new();

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list version directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        let logical = strip_checksum_suffix(file_name);
        let Some(rest) = logical
            .strip_prefix(project)
            .and_then(|r| r.strip_prefix('-'))
        else {
            debug!(file = file_name, "not a build member, skipping");
            continue;
        };
        let Some((token, _)) = VersionToken::match_prefix(rest, base_version) else {
            debug!(file = file_name, "no concrete version match, skipping");
            continue;
        };

        if token.is_timestamped() {
            grouped
                .entry(token.raw.clone())
                .or_insert_with(|| Build {
                    version: token,
                    members: Vec::new(),
                    file_modified: None,
                })
                .members
                .push(path);
        } else {
            alias_members.push(path);
        }
    }

    let mut builds: Vec<Build> = grouped.into_values().collect();
    builds.sort_by(|a, b| {
        (b.version.timestamp, b.version.build_number)
            .cmp(&(a.version.timestamp, a.version.build_number))
    });

    if !alias_members.is_empty() {
        match builds.first_mut() {
            // alias files belong to the most recent timestamped build
            Some(most_recent) => most_recent.members.append(&mut alias_members),
            None => builds.push(Build {
                version: VersionToken::plain(base_version),
                members: alias_members,
                file_modified: None,
            }),
        }
    }

    for build in &mut builds {
        build.members.sort();
        build.file_modified = build.members.first().and_then(|p| file_mtime(p));
    }

    Ok(builds)
}

fn file_mtime(path: &Path) -> Option<DateTime<Utc>> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Utc>::from(modified))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    fn snapshot_dir(files: &[&str]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for f in files {
            touch(tmp.path(), f);
        }
        tmp
    }

    #[test]
    fn groups_checksums_and_classifiers_into_one_build() {
        let tmp = snapshot_dir(&[
            "maven-model-2.2-20061118.060401-2.jar",
            "maven-model-2.2-20061118.060401-2.jar.md5",
            "maven-model-2.2-20061118.060401-2.jar.sha1",
            "maven-model-2.2-20061118.060401-2-sources.jar",
            "maven-model-2.2-20061118.060401-2.pom",
        ]);

        let builds = group_builds(tmp.path(), "maven-model", "2.2-SNAPSHOT").unwrap();
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].members.len(), 5);
        assert_eq!(builds[0].concrete_version(), "2.2-20061118.060401-2");
    }

    #[test]
    fn orders_builds_most_recent_first() {
        let tmp = snapshot_dir(&[
            "maven-model-2.2-20061118.060401-2.jar",
            "maven-model-2.2-20061120.154352-4.jar",
            "maven-model-2.2-20061115.121410-1.jar",
        ]);

        let builds = group_builds(tmp.path(), "maven-model", "2.2-SNAPSHOT").unwrap();
        let versions: Vec<&str> = builds.iter().map(|b| b.concrete_version()).collect();
        assert_eq!(
            versions,
            vec![
                "2.2-20061120.154352-4",
                "2.2-20061118.060401-2",
                "2.2-20061115.121410-1"
            ]
        );
    }

    #[test]
    fn equal_timestamp_higher_build_number_is_more_recent() {
        let tmp = snapshot_dir(&[
            "maven-model-2.2-20061118.060401-2.jar",
            "maven-model-2.2-20061118.060401-10.jar",
        ]);

        let builds = group_builds(tmp.path(), "maven-model", "2.2-SNAPSHOT").unwrap();
        assert_eq!(builds[0].concrete_version(), "2.2-20061118.060401-10");
    }

    #[test]
    fn alias_files_attach_to_most_recent_build() {
        let tmp = snapshot_dir(&[
            "maven-model-2.2-20061115.121410-1.jar",
            "maven-model-2.2-20061118.060401-2.jar",
            "maven-model-2.2-SNAPSHOT.jar",
            "maven-model-2.2-SNAPSHOT.jar.md5",
        ]);

        let builds = group_builds(tmp.path(), "maven-model", "2.2-SNAPSHOT").unwrap();
        assert_eq!(builds.len(), 2);
        assert_eq!(builds[0].concrete_version(), "2.2-20061118.060401-2");
        assert_eq!(builds[0].members.len(), 3);
        assert_eq!(builds[1].members.len(), 1);
    }

    #[test]
    fn plain_release_directory_is_one_build() {
        let tmp = snapshot_dir(&[
            "maven-model-2.3.jar",
            "maven-model-2.3.jar.sha1",
            "maven-model-2.3.pom",
        ]);

        let builds = group_builds(tmp.path(), "maven-model", "2.3").unwrap();
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].concrete_version(), "2.3");
        assert!(!builds[0].version.is_timestamped());
    }

    #[test]
    fn stray_files_are_not_members() {
        let tmp = snapshot_dir(&[
            "maven-model-2.2-20061118.060401-2.jar",
            "maven-metadata.xml",
            "maven-metadata.xml.sha1",
            "README.txt",
        ]);

        let builds = group_builds(tmp.path(), "maven-model", "2.2-SNAPSHOT").unwrap();
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].members.len(), 1);
    }

    #[test]
    fn effective_timestamp_prefers_encoded_over_mtime() {
        let tmp = snapshot_dir(&["maven-model-2.2-20061118.060401-2.jar"]);
        let builds = group_builds(tmp.path(), "maven-model", "2.2-SNAPSHOT").unwrap();

        // The file was just written, but the encoded stamp must win.
        assert_eq!(
            builds[0].effective_timestamp(),
            Some(Utc.with_ymd_and_hms(2006, 11, 18, 6, 4, 1).unwrap())
        );
    }

    #[test]
    fn effective_timestamp_falls_back_to_mtime() {
        let tmp = snapshot_dir(&["maven-model-2.3.jar"]);
        let builds = group_builds(tmp.path(), "maven-model", "2.3").unwrap();
        let effective = builds[0].effective_timestamp().unwrap();
        assert!(Utc::now().signed_duration_since(effective).num_seconds() < 60);
    }
}
