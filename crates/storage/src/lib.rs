use directories::ProjectDirs;
use doc_model::Annotation;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

const ANNOTATIONS_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unsupported annotation file version {0}")]
    UnsupportedVersion(u32),
    #[error("persistence backend error: {0}")]
    Backend(String),
}

/// Where annotations of one document are loaded from and saved to.
pub trait AnnotationPersistence {
    /// Previously saved annotations, or `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<Vec<Annotation>>, StorageError>;

    fn save(&self, annotations: &[Annotation]) -> Result<(), StorageError>;
}

/// Sidecar JSON file holding a versioned list of annotations
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
    document_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnnotationsEnvelope {
    version: u32,
    annotations: Vec<Annotation>,
}

impl JsonFileStore {
    pub fn from_default_project(document_key: impl Into<String>) -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "PdfViewer", "PdfViewer")
            .ok_or(StorageError::NoDataDirectory)?;

        Ok(Self::with_root(dirs.data_local_dir(), document_key))
    }

    pub fn with_root(root: impl Into<PathBuf>, document_key: impl Into<String>) -> Self {
        Self { root: root.into(), document_key: sanitize_key(&document_key.into()) }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(format!("{}.annotations.json", self.document_key))
    }
}

impl AnnotationPersistence for JsonFileStore {
    fn load(&self) -> Result<Option<Vec<Annotation>>, StorageError> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(path)?;
        let envelope: AnnotationsEnvelope = serde_json::from_slice(&bytes)?;
        if envelope.version > ANNOTATIONS_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedVersion(envelope.version));
        }

        Ok(Some(envelope.annotations))
    }

    fn save(&self, annotations: &[Annotation]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;

        let envelope = AnnotationsEnvelope {
            version: ANNOTATIONS_SCHEMA_VERSION,
            annotations: annotations.to_vec(),
        };

        let bytes = serde_json::to_vec_pretty(&envelope)?;
        fs::write(self.path(), bytes)?;
        log::debug!("saved {} annotations to {}", annotations.len(), self.path().display());
        Ok(())
    }
}

/// Keep document keys usable as file names.
fn sanitize_key(key: &str) -> String {
    let cleaned: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "document".to_owned()
    } else {
        cleaned
    }
}

/// In-memory persistence, shared between clones
///
/// Used by embedders without a filesystem and by tests that need to observe
/// or fail saves.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: Rc<RefCell<Option<Vec<Annotation>>>>,
    saves: Rc<Cell<usize>>,
    fail_saves: Rc<Cell<bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_annotations(annotations: Vec<Annotation>) -> Self {
        let store = Self::default();
        store.saved.replace(Some(annotations));
        store
    }

    pub fn saved(&self) -> Option<Vec<Annotation>> {
        self.saved.borrow().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.get()
    }

    /// Make every following save fail.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.set(fail);
    }
}

impl AnnotationPersistence for MemoryStore {
    fn load(&self) -> Result<Option<Vec<Annotation>>, StorageError> {
        Ok(self.saved.borrow().clone())
    }

    fn save(&self, annotations: &[Annotation]) -> Result<(), StorageError> {
        if self.fail_saves.get() {
            return Err(StorageError::Backend("save rejected".to_owned()));
        }
        self.saves.set(self.saves.get() + 1);
        self.saved.replace(Some(annotations.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::HighlightRect;

    fn sample() -> Annotation {
        Annotation::new(vec![HighlightRect::new(2, 10.0, 20.0, 30.0, 12.0)], Vec::new())
            .with_comment("check this")
    }

    #[test]
    fn annotations_round_trip() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = JsonFileStore::with_root(temp.path(), "paper");

        let annotations = vec![sample()];
        store.save(&annotations).expect("save should succeed");
        let loaded = store.load().expect("load should succeed");

        assert_eq!(loaded, Some(annotations));
    }

    #[test]
    fn load_none_when_file_absent() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = JsonFileStore::with_root(temp.path(), "paper");

        assert!(store.load().expect("load should succeed").is_none());
    }

    #[test]
    fn envelope_is_versioned_camel_case_json() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = JsonFileStore::with_root(temp.path(), "paper");
        store.save(&[sample()]).expect("save should succeed");

        let raw = fs::read_to_string(store.path()).expect("file should exist");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
        assert_eq!(value["version"], 1);
        assert_eq!(value["annotations"][0]["pageNumber"], 2);
        assert!(value["annotations"][0]["createdAt"].is_string());
    }

    #[test]
    fn newer_version_is_rejected() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = JsonFileStore::with_root(temp.path(), "paper");
        fs::write(store.path(), r#"{"version": 9, "annotations": []}"#).expect("write");

        assert!(matches!(store.load(), Err(StorageError::UnsupportedVersion(9))));
    }

    #[test]
    fn document_key_is_sanitized() {
        let store = JsonFileStore::with_root("/tmp", "../papers/a b.pdf");
        assert_eq!(store.path(), PathBuf::from("/tmp/___papers_a_b_pdf.annotations.json"));
    }

    #[test]
    fn memory_store_can_fail_saves() {
        let store = MemoryStore::new();
        let observer = store.clone();

        store.save(&[sample()]).expect("save should succeed");
        observer.set_fail_saves(true);
        assert!(store.save(&[]).is_err());

        assert_eq!(observer.save_count(), 1);
        assert_eq!(observer.saved().map(|saved| saved.len()), Some(1));
    }
}
