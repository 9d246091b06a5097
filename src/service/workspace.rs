use ahash::AHashMap;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};

/// Source of document text for the request surface.
pub trait Workspace: Send + Sync {
    /// The text of `path`, or `None` when the workspace has no such document.
    fn read(&self, path: &Path) -> Option<String>;
}

/// Reads documents straight from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystemWorkspace;

impl Workspace for FileSystemWorkspace {
    fn read(&self, path: &Path) -> Option<String> {
        match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "Document not readable");
                None
            }
        }
    }
}

/// Documents held in memory, e.g. unsaved editor buffers.
#[derive(Debug, Default)]
pub struct InMemoryWorkspace {
    documents: RwLock<AHashMap<PathBuf, String>>,
}

impl InMemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    /// Adds or replaces a document.
    pub fn insert(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.documents.write().insert(path.into(), text.into());
    }

    pub fn remove(&self, path: &Path) -> Option<String> {
        self.documents.write().remove(path)
    }
}

impl Workspace for InMemoryWorkspace {
    fn read(&self, path: &Path) -> Option<String> {
        self.documents.read().get(path).cloned()
    }
}
