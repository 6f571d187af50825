//! Deletion notifications for audit and search-index consumers.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// One physical file removed by a purge policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedArtifact {
    pub repository_id: String,
    pub namespace: String,
    pub project: String,
    pub project_version: String,
    /// Path of the removed file, relative to the repository root.
    pub path: PathBuf,
}

/// Receives exactly one call per physical file removed.
pub trait DeleteListener: Send + Sync {
    fn artifact_deleted(&self, deleted: &DeletedArtifact);
}

/// Fans deletion events out to every registered listener.
#[derive(Default)]
pub struct ListenerBus {
    listeners: Vec<Arc<dyn DeleteListener>>,
}

impl ListenerBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Arc<dyn DeleteListener>) {
        self.listeners.push(listener);
    }

    pub fn notify(&self, deleted: &DeletedArtifact) {
        debug!(path = %deleted.path.display(), "artifact deleted");
        for listener in &self.listeners {
            listener.artifact_deleted(deleted);
        }
    }
}
