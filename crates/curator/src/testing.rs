//! Test utilities for the curator crate.
//!
//! Reusable fixtures for unit and integration testing: a tempdir-backed
//! Maven-layout repository builder, a recording delete listener and a
//! harness bundling the collaborators a policy invocation needs.

use crate::index::XmlVersionIndexWriter;
use crate::listener::{DeleteListener, DeletedArtifact, ListenerBus};
use crate::metadata::{ArtifactRecord, InMemoryMetadataRepository, MetadataSession};
use crate::policies::PurgeContext;
use crate::repository::ManagedRepository;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// A Maven-layout repository tree on a tempdir.
pub struct FixtureRepository {
    _temp: TempDir,
    pub repository: ManagedRepository,
}

impl FixtureRepository {
    pub fn new(id: &str) -> Self {
        let temp = TempDir::new().expect("create fixture tempdir");
        let repository = ManagedRepository::new(id, temp.path());
        Self {
            _temp: temp,
            repository,
        }
    }

    pub fn root(&self) -> &Path {
        &self.repository.root
    }

    pub fn version_dir(&self, namespace: &str, project: &str, base_version: &str) -> PathBuf {
        let mut dir = self.repository.root.clone();
        for segment in namespace.split('.') {
            dir.push(segment);
        }
        dir.push(project);
        dir.push(base_version);
        dir
    }

    /// Write one build: main jar + pom, md5/sha1 siblings of the jar, and
    /// one extra jar per classifier. Returns every path created.
    pub fn add_build(
        &self,
        namespace: &str,
        project: &str,
        base_version: &str,
        concrete_version: &str,
        classifiers: &[&str],
    ) -> Vec<PathBuf> {
        let dir = self.version_dir(namespace, project, base_version);
        std::fs::create_dir_all(&dir).expect("create version dir");

        let mut names = vec![
            format!("{project}-{concrete_version}.jar"),
            format!("{project}-{concrete_version}.jar.md5"),
            format!("{project}-{concrete_version}.jar.sha1"),
            format!("{project}-{concrete_version}.pom"),
        ];
        for classifier in classifiers {
            names.push(format!("{project}-{concrete_version}-{classifier}.jar"));
        }

        names
            .into_iter()
            .map(|name| {
                let path = dir.join(name);
                std::fs::write(&path, b"fixture").expect("write fixture file");
                path
            })
            .collect()
    }

    pub fn add_file(&self, relative: &str) -> PathBuf {
        let path = self.repository.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, b"fixture").expect("write fixture file");
        path
    }

    /// Force a file's mtime, for exercising the mtime fallback.
    pub fn set_mtime(path: &Path, when: DateTime<Utc>) {
        let file = std::fs::File::options()
            .write(true)
            .open(path)
            .expect("open file for mtime update");
        file.set_modified(when.into()).expect("set mtime");
    }
}

/// Records every deletion event it receives.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<DeletedArtifact>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DeletedArtifact> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

impl DeleteListener for RecordingListener {
    fn artifact_deleted(&self, deleted: &DeletedArtifact) {
        self.events.lock().unwrap().push(deleted.clone());
    }
}

/// Build an [`ArtifactRecord`] the way the harvester would file it.
pub fn record(
    repository_id: &str,
    namespace: &str,
    project: &str,
    project_version: &str,
    version: &str,
) -> ArtifactRecord {
    ArtifactRecord {
        repository_id: repository_id.to_string(),
        namespace: namespace.to_string(),
        project: project.to_string(),
        project_version: project_version.to_string(),
        version: version.to_string(),
        id: format!("{project}-{version}.jar"),
        md5: None,
        sha1: None,
        when_gathered: Utc::now(),
    }
}

/// The collaborators one policy invocation borrows.
pub struct PolicyHarness {
    pub store: Arc<InMemoryMetadataRepository>,
    pub listener: Arc<RecordingListener>,
    pub bus: ListenerBus,
    pub writer: XmlVersionIndexWriter,
    pub session: MetadataSession,
    pub cancel: AtomicBool,
}

impl PolicyHarness {
    pub fn new() -> Self {
        let listener = Arc::new(RecordingListener::new());
        let mut bus = ListenerBus::new();
        bus.register(listener.clone());
        Self {
            store: Arc::new(InMemoryMetadataRepository::new()),
            listener,
            bus,
            writer: XmlVersionIndexWriter::new(),
            session: MetadataSession::new(),
            cancel: AtomicBool::new(false),
        }
    }

    pub fn context<'a>(
        &'a self,
        repository: &'a ManagedRepository,
        all_repositories: &'a [ManagedRepository],
    ) -> PurgeContext<'a> {
        PurgeContext {
            repository,
            all_repositories,
            metadata: self.store.clone(),
            session: &self.session,
            listeners: &self.bus,
            index_writer: &self.writer,
            cancel: &self.cancel,
        }
    }
}

impl Default for PolicyHarness {
    fn default() -> Self {
        Self::new()
    }
}
