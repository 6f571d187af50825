//! Managed repository configuration model. Read-only to the purge engine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which artifact kinds a repository accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseScheme {
    Release,
    Snapshot,
}

/// One managed repository and its retention settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedRepository {
    pub id: String,
    /// Root location of the Maven-layout tree.
    pub root: PathBuf,
    #[serde(default = "default_layout")]
    pub layout: String,
    /// Age threshold in days beyond which a build becomes eligible for
    /// deletion. Zero selects the retention-count policy instead.
    #[serde(default = "default_retention_period_days")]
    pub retention_period_days: u32,
    /// Number of most-recent builds always kept.
    #[serde(default = "default_retention_count")]
    pub retention_count: u32,
    /// Purge an entire snapshot version once its release exists.
    #[serde(default)]
    pub delete_released_snapshots: bool,
    /// Let the released-snapshots policy look for the release in other
    /// managed repositories too.
    #[serde(default)]
    pub cross_repository_search: bool,
    #[serde(default = "default_release_schemes")]
    pub release_schemes: Vec<ReleaseScheme>,
}

fn default_layout() -> String {
    "maven2".to_string()
}

fn default_retention_period_days() -> u32 {
    100
}

fn default_retention_count() -> u32 {
    2
}

fn default_release_schemes() -> Vec<ReleaseScheme> {
    vec![ReleaseScheme::Release, ReleaseScheme::Snapshot]
}

impl ManagedRepository {
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            root: root.into(),
            layout: default_layout(),
            retention_period_days: default_retention_period_days(),
            retention_count: default_retention_count(),
            delete_released_snapshots: false,
            cross_repository_search: false,
            release_schemes: default_release_schemes(),
        }
    }

    pub fn accepts(&self, scheme: ReleaseScheme) -> bool {
        self.release_schemes.contains(&scheme)
    }

    /// Absolute path of a relative repository path.
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }
}

/// Top-level configuration: the repository set plus scan exclusions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuratorConfig {
    #[serde(default)]
    pub repositories: Vec<ManagedRepository>,
    /// Wildcard patterns never fed to the policies as candidates.
    #[serde(default = "default_excluded_patterns")]
    pub excluded_patterns: Vec<String>,
}

pub fn default_excluded_patterns() -> Vec<String> {
    vec![
        "*.md5".to_string(),
        "*.sha1".to_string(),
        "*maven-metadata.xml".to_string(),
        "*.lastUpdated".to_string(),
        "*.index/*".to_string(),
    ]
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            repositories: Vec::new(),
            excluded_patterns: default_excluded_patterns(),
        }
    }
}

impl CuratorConfig {
    pub fn repository(&self, id: &str) -> Option<&ManagedRepository> {
        self.repositories.iter().find(|r| r.id == id)
    }
}
