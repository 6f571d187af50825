//! Maven2 repository layout: relative path -> typed artifact reference.

pub mod version;

pub use version::{compare_versions, is_snapshot, release_version, VersionToken};

/// Checksum sibling suffixes recognized next to artifact files.
pub const CHECKSUM_SUFFIXES: &[&str] = &[".md5", ".sha1"];

/// Strip a known checksum suffix, yielding the logical artifact name.
pub fn strip_checksum_suffix(file_name: &str) -> &str {
    for suffix in CHECKSUM_SUFFIXES {
        if let Some(stripped) = file_name.strip_suffix(suffix) {
            return stripped;
        }
    }
    file_name
}

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// Not a fault: index files, stray directories and foreign naming all
    /// land here. Policies no-op on it without side effects.
    #[error("not an artifact path: {0}")]
    NotAnArtifact(String),
}

/// A structured reference to one artifact file, resolved from a relative
/// repository path. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    /// Dotted group id, e.g. `org.apache.maven`.
    pub namespace: String,
    /// Project (artifact) id.
    pub project: String,
    /// Base version of the owning directory, e.g. `2.2-SNAPSHOT`.
    pub base_version: String,
    /// Concrete version parsed from the filename.
    pub version: VersionToken,
    /// Classifier variant, e.g. `sources`.
    pub classifier: Option<String>,
    /// File extension, e.g. `jar`.
    pub extension: String,
}

impl ArtifactRef {
    /// Relative directory holding this artifact's base version.
    pub fn base_version_path(&self) -> String {
        format!(
            "{}/{}/{}",
            self.namespace.replace('.', "/"),
            self.project,
            self.base_version
        )
    }
}

/// Resolve a path relative to the repository root into an [`ArtifactRef`].
///
/// Expects the Maven2 convention `group/segments/project/version/filename`
/// where the filename is `<project>-<concrete-version>[-<classifier>].<ext>`,
/// optionally followed by a checksum suffix. Anything else is
/// [`LayoutError::NotAnArtifact`].
pub fn parse_artifact_path(relative: &str) -> Result<ArtifactRef, LayoutError> {
    let not_artifact = || LayoutError::NotAnArtifact(relative.to_string());

    let normalized = relative.trim_matches('/');
    let mut segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
    // group (>=1 segment) + project + version + filename
    if segments.len() < 4 {
        return Err(not_artifact());
    }

    let file_name = segments.pop().ok_or_else(not_artifact)?;
    let base_version = segments.pop().ok_or_else(not_artifact)?;
    let project = segments.pop().ok_or_else(not_artifact)?;
    let namespace = segments.join(".");

    // Checksums resolve like the file they accompany.
    let logical = strip_checksum_suffix(file_name);
    if logical == "maven-metadata.xml" {
        return Err(not_artifact());
    }

    let rest = logical
        .strip_prefix(project)
        .and_then(|r| r.strip_prefix('-'))
        .ok_or_else(not_artifact)?;

    let (version, consumed) =
        VersionToken::match_prefix(rest, base_version).ok_or_else(not_artifact)?;

    let tail = &rest[consumed..];
    let (classifier, extension) = if let Some(ext) = tail.strip_prefix('.') {
        (None, ext)
    } else if let Some(with_classifier) = tail.strip_prefix('-') {
        let dot = with_classifier.find('.').ok_or_else(not_artifact)?;
        let (classifier, ext) = with_classifier.split_at(dot);
        if classifier.is_empty() {
            return Err(not_artifact());
        }
        (Some(classifier.to_string()), &ext[1..])
    } else {
        return Err(not_artifact());
    };
    if extension.is_empty() {
        return Err(not_artifact());
    }

    Ok(ArtifactRef {
        namespace,
        project: project.to_string(),
        base_version: base_version.to_string(),
        version,
        classifier,
        extension: extension.to_string(),
    })
}
