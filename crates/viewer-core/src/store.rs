//! In-memory annotation store with write-through persistence
//!
//! Every mutation is applied to the in-memory list first and then saved in
//! full through the persistence collaborator. A failed save is logged and
//! reported through the error callback; the in-memory state is kept.

use doc_model::{Annotation, AnnotationId, AnnotationPatch, HighlightRect};
use storage::{AnnotationPersistence, StorageError};

/// Invoked with every persistence failure
pub type ErrorCallback = Box<dyn FnMut(&StorageError)>;

#[derive(Default)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
    persistence: Option<Box<dyn AnnotationPersistence>>,
    on_error: Option<ErrorCallback>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_persistence(persistence: Box<dyn AnnotationPersistence>) -> Self {
        Self { persistence: Some(persistence), ..Self::default() }
    }

    pub fn set_persistence(&mut self, persistence: Box<dyn AnnotationPersistence>) {
        self.persistence = Some(persistence);
    }

    pub fn set_error_callback(&mut self, callback: impl FnMut(&StorageError) + 'static) {
        self.on_error = Some(Box::new(callback));
    }

    /// Replace the in-memory list with what the collaborator has saved.
    ///
    /// Returns the number of annotations loaded. Nothing saved yet leaves the
    /// store empty.
    pub fn load(&mut self) -> Result<usize, StorageError> {
        let Some(persistence) = &self.persistence else {
            return Ok(0);
        };

        let loaded = persistence.load()?.unwrap_or_default();
        self.annotations = with_highlights(loaded, "stored");
        Ok(self.annotations.len())
    }

    /// Like [`AnnotationStore::load`], but a failed load is logged and
    /// reported through the error callback instead of returned.
    ///
    /// The in-memory list is left untouched on failure.
    pub fn load_or_report(&mut self) -> usize {
        match self.load() {
            Ok(count) => count,
            Err(err) => {
                log::error!("failed to load annotations: {}", err);
                self.report(&err);
                self.annotations.len()
            }
        }
    }

    /// Add an annotation. Annotations without highlights are rejected.
    pub fn add_annotation(&mut self, annotation: Annotation) -> Option<AnnotationId> {
        if annotation.highlights.is_empty() {
            log::warn!("refusing to add annotation {} without highlights", annotation.id);
            return None;
        }

        let id = annotation.id.clone();
        self.annotations.push(annotation);
        self.persist();
        Some(id)
    }

    /// Apply `patch` to the annotation with `id`. Returns `false` if unknown.
    pub fn update_annotation(&mut self, id: &AnnotationId, patch: AnnotationPatch) -> bool {
        if patch.highlights.as_ref().is_some_and(Vec::is_empty) {
            log::warn!("ignoring update of {} that would remove every highlight", id);
            return false;
        }

        let Some(annotation) = self.annotations.iter_mut().find(|a| &a.id == id) else {
            return false;
        };

        annotation.apply(patch);
        self.persist();
        true
    }

    pub fn delete_annotation(&mut self, id: &AnnotationId) -> Option<Annotation> {
        let index = self.annotations.iter().position(|a| &a.id == id)?;
        let removed = self.annotations.remove(index);
        self.persist();
        Some(removed)
    }

    /// Replace every annotation. Records without highlights are dropped.
    pub fn set_annotations(&mut self, annotations: Vec<Annotation>) {
        self.annotations = with_highlights(annotations, "incoming");
        self.persist();
    }

    pub fn get_annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn get(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| &a.id == id)
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Store a highlight that is waiting for its comment.
    pub fn begin_comment(
        &mut self,
        highlights: Vec<HighlightRect>,
        underlines: Vec<HighlightRect>,
    ) -> Option<AnnotationId> {
        let mut annotation = Annotation::new(highlights, underlines);
        annotation.is_comment_pending = Some(true);
        self.add_annotation(annotation)
    }

    /// Abandon a pending comment.
    ///
    /// The annotation is deleted only if it is still pending and never got a
    /// comment. Returns `true` if it was deleted.
    pub fn cancel_comment(&mut self, id: &AnnotationId) -> bool {
        let abandoned = self
            .get(id)
            .is_some_and(|annotation| annotation.is_comment_pending() && !annotation.has_comment());

        abandoned && self.delete_annotation(id).is_some()
    }

    /// Annotations on `page_number`, in insertion order.
    pub fn page_annotations(&self, page_number: u32) -> Vec<&Annotation> {
        self.annotations.iter().filter(|a| a.page_number == page_number).collect()
    }

    /// Topmost annotation with a highlight under the page-local point.
    pub fn hit_test(&self, page_number: u32, x: f64, y: f64) -> Option<&Annotation> {
        self.annotations.iter().rev().find(|annotation| {
            annotation
                .highlights
                .iter()
                .any(|rect| rect.page_number == page_number && rect.contains_point(x, y))
        })
    }

    fn persist(&mut self) {
        let Some(persistence) = &self.persistence else {
            return;
        };

        if let Err(err) = persistence.save(&self.annotations) {
            log::error!("failed to save {} annotations: {}", self.annotations.len(), err);
            self.report(&err);
        }
    }

    fn report(&mut self, err: &StorageError) {
        if let Some(callback) = self.on_error.as_mut() {
            callback(err);
        }
    }
}

fn with_highlights(annotations: Vec<Annotation>, source: &str) -> Vec<Annotation> {
    let (valid, dropped): (Vec<_>, Vec<_>) =
        annotations.into_iter().partition(|annotation| !annotation.highlights.is_empty());
    if !dropped.is_empty() {
        log::warn!("dropping {} {} annotations without highlights", dropped.len(), source);
    }
    valid
}

impl std::fmt::Debug for AnnotationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationStore")
            .field("annotations", &self.annotations.len())
            .field("persistent", &self.persistence.is_some())
            .finish()
    }
}
