//! Version index regeneration.
//!
//! The index is derived state: after a policy removed something, the
//! surviving [`ArtifactRecord`] set is the single source the documents are
//! rebuilt from. Whole-file replace, never edited in place.

use crate::layout::{compare_versions, is_snapshot, VersionToken};
use crate::metadata::ArtifactRecord;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

/// `lastUpdated` stamp format, UTC.
const LAST_UPDATED_FORMAT: &str = "%Y%m%d%H%M%S";

/// Regenerates the per-project and per-version index documents.
pub trait VersionIndexWriter: Send + Sync {
    /// Rewrite the project-level index (ordered version list, `release`,
    /// `latest`, `lastUpdated`) from the surviving records of the whole
    /// project. An empty record set removes the document instead.
    fn write_project_index(
        &self,
        repository_root: &Path,
        namespace: &str,
        project: &str,
        records: &[ArtifactRecord],
    ) -> Result<PathBuf>;

    /// Rewrite the version-level index (snapshot timestamp/buildNumber)
    /// from the surviving records of one base version.
    fn write_version_index(
        &self,
        repository_root: &Path,
        namespace: &str,
        project: &str,
        base_version: &str,
        records: &[ArtifactRecord],
    ) -> Result<PathBuf>;
}

/// Writes `maven-metadata.xml` documents.
#[derive(Debug, Default)]
pub struct XmlVersionIndexWriter;

impl XmlVersionIndexWriter {
    pub fn new() -> Self {
        Self
    }
}

fn project_dir(repository_root: &Path, namespace: &str, project: &str) -> PathBuf {
    let mut dir = repository_root.to_path_buf();
    for segment in namespace.split('.') {
        dir.push(segment);
    }
    dir.push(project);
    dir
}

fn last_updated(records: &[ArtifactRecord]) -> Option<DateTime<Utc>> {
    records.iter().map(|r| r.when_gathered).max()
}

impl VersionIndexWriter for XmlVersionIndexWriter {
    fn write_project_index(
        &self,
        repository_root: &Path,
        namespace: &str,
        project: &str,
        records: &[ArtifactRecord],
    ) -> Result<PathBuf> {
        let path = project_dir(repository_root, namespace, project).join("maven-metadata.xml");

        if records.is_empty() {
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove index {}", path.display()))?;
            }
            debug!(project, "no surviving records, project index removed");
            return Ok(path);
        }

        let mut versions: Vec<&str> = records.iter().map(|r| r.project_version.as_str()).collect();
        versions.sort_by(|a, b| compare_versions(a, b));
        versions.dedup();

        let latest = versions.last().copied().unwrap_or_default();
        let release = versions
            .iter()
            .rev()
            .find(|v| !is_snapshot(v))
            .copied();
        let stamp = last_updated(records).unwrap_or_else(Utc::now);

        let mut doc = String::new();
        doc.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        doc.push_str("<metadata>\n");
        let _ = writeln!(doc, "  <groupId>{}</groupId>", namespace);
        let _ = writeln!(doc, "  <artifactId>{}</artifactId>", project);
        doc.push_str("  <versioning>\n");
        let _ = writeln!(doc, "    <latest>{}</latest>", latest);
        if let Some(release) = release {
            let _ = writeln!(doc, "    <release>{}</release>", release);
        }
        doc.push_str("    <versions>\n");
        for version in &versions {
            let _ = writeln!(doc, "      <version>{}</version>", version);
        }
        doc.push_str("    </versions>\n");
        let _ = writeln!(
            doc,
            "    <lastUpdated>{}</lastUpdated>",
            stamp.format(LAST_UPDATED_FORMAT)
        );
        doc.push_str("  </versioning>\n");
        doc.push_str("</metadata>\n");

        std::fs::write(&path, doc)
            .with_context(|| format!("Failed to write index {}", path.display()))?;
        debug!(project, path = %path.display(), "project index regenerated");
        Ok(path)
    }

    fn write_version_index(
        &self,
        repository_root: &Path,
        namespace: &str,
        project: &str,
        base_version: &str,
        records: &[ArtifactRecord],
    ) -> Result<PathBuf> {
        let path = project_dir(repository_root, namespace, project)
            .join(base_version)
            .join("maven-metadata.xml");

        if records.is_empty() {
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove index {}", path.display()))?;
            }
            return Ok(path);
        }

        // Most recent surviving build decides the snapshot block.
        let newest = records
            .iter()
            .filter_map(|r| VersionToken::parse(&r.version, base_version))
            .max_by_key(|t| (t.timestamp, t.build_number));
        let stamp = last_updated(records).unwrap_or_else(Utc::now);

        let mut doc = String::new();
        doc.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        doc.push_str("<metadata>\n");
        let _ = writeln!(doc, "  <groupId>{}</groupId>", namespace);
        let _ = writeln!(doc, "  <artifactId>{}</artifactId>", project);
        let _ = writeln!(doc, "  <version>{}</version>", base_version);
        doc.push_str("  <versioning>\n");
        if let Some(newest) = newest {
            if let (Some(ts), Some(n)) = (newest.timestamp, newest.build_number) {
                doc.push_str("    <snapshot>\n");
                let _ = writeln!(
                    doc,
                    "      <timestamp>{}</timestamp>",
                    ts.format("%Y%m%d.%H%M%S")
                );
                let _ = writeln!(doc, "      <buildNumber>{}</buildNumber>", n);
                doc.push_str("    </snapshot>\n");
            }
        }
        let _ = writeln!(
            doc,
            "    <lastUpdated>{}</lastUpdated>",
            stamp.format(LAST_UPDATED_FORMAT)
        );
        doc.push_str("  </versioning>\n");
        doc.push_str("</metadata>\n");

        std::fs::write(&path, doc)
            .with_context(|| format!("Failed to write index {}", path.display()))?;
        debug!(project, base_version, "version index regenerated");
        Ok(path)
    }
}
