//! Viewer controller
//!
//! [`Viewer`] owns everything one document view needs: layout, mounted page
//! rasters, the selection synchronizer, the annotation store and tooltip
//! state. Hosts forward notifications to it and call [`Viewer::tick`] from
//! their frame or timer loop.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use doc_model::{Annotation, AnnotationId, AnnotationPatch, HighlightRect};
use pdf_viewer_geometry::Rect;
use pdf_viewer_render::{DocumentEngine, EngineError, PageRaster, RasterInputs, RenderError};
use pdf_viewer_scheduler::Debouncer;
use pdf_viewer_selection::{
    extract_selection, ContainerId, ExtractedSelection, MarkerId, PageBounds, SelectionEvent,
    SelectionHost, SelectionSnapshot, SelectionSync, SweepReport,
};
use storage::{AnnotationPersistence, StorageError};
use thiserror::Error;

use crate::config::{ConfigError, ViewerConfig};
use crate::jump::{jump_offset, JumpAlign, JumpUnit};
use crate::layout::{PageSize, ViewportState};
use crate::store::AnnotationStore;
use crate::tooltip::{reference_rect, Placement, PlacementConstraints, Positioner, Side, TooltipMachine};

/// Gap between a tooltip and its highlight, in client pixels
const TOOLTIP_OFFSET: f64 = 8.0;
const TOOLTIP_PADDING: f64 = 4.0;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("document engine error: {0}")]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("page {0} does not exist")]
    UnknownPage(u32),
}

/// What one [`Viewer::tick`] did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub zoom_applied: bool,
    pub scroll_applied: bool,
    pub frames_committed: usize,
    pub tooltips_closed: Vec<AnnotationId>,
}

struct MountedPage {
    container: ContainerId,
    raster: PageRaster,
}

pub struct Viewer {
    config: ViewerConfig,
    engine: Box<dyn DocumentEngine>,
    layout: ViewportState,
    pages: BTreeMap<u32, MountedPage>,
    selection: SelectionSync,
    store: AnnotationStore,
    tooltips: TooltipMachine,
    positioner: Option<Box<dyn Positioner>>,
    zoom_debounce: Debouncer,
    scroll_debounce: Debouncer,
}

impl Viewer {
    /// Create a viewer for `engine`'s document.
    ///
    /// Page sizes are read once up front to lay out the document.
    pub fn new(engine: Box<dyn DocumentEngine>, config: ViewerConfig) -> Result<Self, ViewerError> {
        config.validate()?;

        let mut page_sizes = Vec::with_capacity(engine.page_count() as usize);
        for page_number in 1..=engine.page_count() {
            let viewport = engine.page(page_number)?.viewport(1.0);
            page_sizes.push(PageSize::new(viewport.width, viewport.height));
        }

        let layout =
            ViewportState { page_sizes, page_gap: config.page_gap, ..ViewportState::default() };

        Ok(Self {
            tooltips: TooltipMachine::new(config.tooltip_close_delay()),
            zoom_debounce: Debouncer::trailing(config.zoom_debounce()),
            scroll_debounce: Debouncer::trailing(config.scroll_debounce()),
            config,
            engine,
            layout,
            pages: BTreeMap::new(),
            selection: SelectionSync::new(),
            store: AnnotationStore::new(),
            positioner: None,
        })
    }

    /// Attach persistence and load whatever it has saved.
    ///
    /// A failed load is logged and leaves the viewer without annotations.
    pub fn with_persistence(mut self, persistence: Box<dyn AnnotationPersistence>) -> Self {
        self.attach_persistence(persistence);
        self
    }

    /// Attach persistence and load from it.
    ///
    /// A load failure is logged and passed to the callback registered with
    /// [`Viewer::on_persistence_error`], if any. Returns the number of
    /// annotations held afterwards.
    pub fn attach_persistence(&mut self, persistence: Box<dyn AnnotationPersistence>) -> usize {
        self.store.set_persistence(persistence);
        self.load_annotations()
    }

    /// Reload annotations from the attached persistence.
    pub fn load_annotations(&mut self) -> usize {
        self.tooltips.close_all();
        let loaded = self.store.load_or_report();
        log::debug!("holding {} annotations after load", loaded);
        loaded
    }

    pub fn with_positioner(mut self, positioner: Box<dyn Positioner>) -> Self {
        self.positioner = Some(positioner);
        self
    }

    pub fn on_persistence_error(&mut self, callback: impl FnMut(&StorageError) + 'static) {
        self.store.set_error_callback(callback);
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn layout(&self) -> &ViewportState {
        &self.layout
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn tooltips(&self) -> &TooltipMachine {
        &self.tooltips
    }

    pub fn tooltips_mut(&mut self) -> &mut TooltipMachine {
        &mut self.tooltips
    }

    pub fn selection(&self) -> &SelectionSync {
        &self.selection
    }

    pub fn raster(&self, page_number: u32) -> Option<&PageRaster> {
        self.pages.get(&page_number).map(|page| &page.raster)
    }

    pub fn mounted_pages(&self) -> Vec<u32> {
        self.pages.keys().copied().collect()
    }

    /// Page number of each mounted text container.
    pub fn container_pages(&self) -> HashMap<ContainerId, u32> {
        self.pages.iter().map(|(&page_number, page)| (page.container, page_number)).collect()
    }

    /// Mount a page's text container and start rendering it.
    pub fn mount_page(
        &mut self,
        page_number: u32,
        container: ContainerId,
        end_marker: MarkerId,
    ) -> Result<(), ViewerError> {
        let page_bounds =
            self.layout.page_client_bounds(page_number).ok_or(ViewerError::UnknownPage(page_number))?;

        let handle = self.engine.page(page_number)?;
        let mut raster = PageRaster::new(handle, self.config.raster_limits())
            .with_detail_scale_factor(self.config.detail_scale_factor);
        raster.update(&self.raster_inputs(page_bounds))?;

        if let Some(previous) = self.pages.insert(page_number, MountedPage { container, raster }) {
            self.selection.unmount(previous.container);
        }
        self.selection.mount(container, end_marker);
        log::debug!("mounted page {}", page_number);
        Ok(())
    }

    /// Unmount a page, cancelling its in-flight renders.
    pub fn unmount_page(&mut self, page_number: u32) -> bool {
        let Some(mut page) = self.pages.remove(&page_number) else {
            return false;
        };
        page.raster.teardown();
        self.selection.unmount(page.container);
        true
    }

    pub fn set_zoom(&mut self, zoom: f64, now: Instant) {
        self.layout.set_zoom_anchored(zoom);
        self.zoom_debounce.trigger(now);
    }

    pub fn set_device_pixel_ratio(&mut self, device_pixel_ratio: f64, now: Instant) {
        self.layout.device_pixel_ratio = device_pixel_ratio;
        self.zoom_debounce.trigger(now);
    }

    pub fn scroll_to(&mut self, scroll_top: f64, now: Instant) {
        self.layout.scroll_top = self.layout.clamp_scroll_top(scroll_top);
        self.scroll_debounce.trigger(now);
    }

    pub fn resize(&mut self, width: f64, height: f64, now: Instant) {
        self.layout.viewport_width = width.max(0.0);
        self.layout.viewport_height = height.max(0.0);
        self.layout.scroll_top = self.layout.clamp_scroll_top(self.layout.scroll_top);
        self.scroll_debounce.trigger(now);
    }

    /// Client position of the scroll container.
    pub fn set_origin(&mut self, left: f64, top: f64) {
        self.layout.origin = (left, top);
    }

    /// Run debounced recomputation, poll renders and expire tooltips.
    ///
    /// Render failures are logged and the first one is returned after every
    /// page was processed. Pages that failed keep their previous frame.
    pub fn tick(&mut self, now: Instant) -> Result<TickReport, ViewerError> {
        let mut report = TickReport::default();
        let mut first_error: Option<RenderError> = None;

        let zoom_due = self.zoom_debounce.poll(now);
        let scroll_due = self.scroll_debounce.poll(now);

        if zoom_due || scroll_due {
            let page_numbers: Vec<u32> = self.pages.keys().copied().collect();
            for page_number in page_numbers {
                let Some(bounds) = self.layout.page_client_bounds(page_number) else {
                    continue;
                };
                let inputs = self.raster_inputs(bounds);
                let Some(page) = self.pages.get_mut(&page_number) else {
                    continue;
                };
                let result = if zoom_due {
                    page.raster.update(&inputs)
                } else {
                    page.raster.update_detail(&inputs)
                };
                if let Err(err) = result {
                    log::warn!("page {}: {}", page_number, err);
                    first_error.get_or_insert(err);
                }
            }
            report.zoom_applied = zoom_due;
            report.scroll_applied = scroll_due;
        }

        for page in self.pages.values_mut() {
            match page.raster.pump() {
                Ok(committed) => report.frames_committed += committed,
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }

        report.tooltips_closed = self.tooltips.tick(now);

        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(report),
        }
    }

    /// Earliest instant at which [`Viewer::tick`] has timed work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.zoom_debounce.deadline(), self.scroll_debounce.deadline(), self.tooltips.next_deadline()]
            .into_iter()
            .flatten()
            .min()
    }

    pub fn has_pending_renders(&self) -> bool {
        self.pages.values().any(|page| page.raster.has_pending())
    }

    pub fn handle_selection_event(
        &mut self,
        event: SelectionEvent,
        host: &mut dyn SelectionHost,
    ) -> SweepReport {
        self.selection.handle(event, host)
    }

    /// Consolidated geometry of the host's current selection.
    pub fn extract_selection(&self, snapshot: &SelectionSnapshot) -> Option<ExtractedSelection> {
        let pages: Vec<PageBounds> = self
            .pages
            .keys()
            .filter_map(|&page_number| {
                let bounds = self.layout.page_client_bounds(page_number)?;
                Some(PageBounds { page_number, bounds })
            })
            .collect();

        extract_selection(
            snapshot,
            &pages,
            self.layout.zoom,
            &self.config.consolidation(),
            &self.config.script_heuristic(),
        )
    }

    /// Turn the current selection into a highlight annotation.
    pub fn commit_highlight(&mut self, snapshot: &SelectionSnapshot) -> Option<AnnotationId> {
        let selection = self.extract_selection(snapshot)?;
        let annotation = Annotation::new(selection.highlights, selection.underlines);
        self.store.add_annotation(annotation)
    }

    /// Highlight the current selection and open its comment editor.
    pub fn begin_comment(&mut self, snapshot: &SelectionSnapshot) -> Option<AnnotationId> {
        let selection = self.extract_selection(snapshot)?;
        let id = self.store.begin_comment(selection.highlights, selection.underlines)?;
        self.tooltips.open_click(&id);
        Some(id)
    }

    /// Abandon a comment. Deletes the highlight if it never got a comment.
    pub fn cancel_comment(&mut self, id: &AnnotationId) -> bool {
        self.tooltips.close_click(id);
        let deleted = self.store.cancel_comment(id);
        if deleted {
            self.tooltips.remove(id);
        }
        deleted
    }

    pub fn add_annotation(&mut self, annotation: Annotation) -> Option<AnnotationId> {
        self.store.add_annotation(annotation)
    }

    pub fn update_annotation(&mut self, id: &AnnotationId, patch: AnnotationPatch) -> bool {
        self.store.update_annotation(id, patch)
    }

    pub fn delete_annotation(&mut self, id: &AnnotationId) -> Option<Annotation> {
        let removed = self.store.delete_annotation(id)?;
        self.tooltips.remove(id);
        Some(removed)
    }

    pub fn set_annotations(&mut self, annotations: Vec<Annotation>) {
        self.tooltips.close_all();
        self.store.set_annotations(annotations);
    }

    pub fn get_annotations(&self) -> &[Annotation] {
        self.store.get_annotations()
    }

    /// Scroll so the union of `rects` lands at `align`.
    ///
    /// Returns the new scroll offset, or `None` if no rect is on a page.
    pub fn jump_to(
        &mut self,
        rects: &[HighlightRect],
        unit: JumpUnit,
        align: JumpAlign,
        offset: f64,
        now: Instant,
    ) -> Option<f64> {
        let scroll_top = jump_offset(&self.layout, rects, unit, align, offset)?;
        self.scroll_to(scroll_top, now);
        Some(scroll_top)
    }

    /// Where the tooltip of `id` goes, given the current zoom and scroll.
    pub fn tooltip_placement(&self, id: &AnnotationId, preferred_side: Side) -> Option<Placement> {
        let positioner = self.positioner.as_ref()?;
        let annotation = self.store.get(id)?;
        let reference =
            reference_rect(annotation, self.layout.transform().effective_zoom(), |page_number| {
                let bounds = self.layout.page_client_bounds(page_number)?;
                Some((bounds.left, bounds.top))
            })?;

        let constraints = PlacementConstraints {
            boundary: self.layout.viewport_rect(),
            offset: TOOLTIP_OFFSET,
            padding: TOOLTIP_PADDING,
        };
        Some(positioner.compute_placement(&reference, preferred_side, &constraints))
    }

    /// Page text of a page, for hosts building their text layer.
    pub fn page_text(&self, page_number: u32) -> Result<String, ViewerError> {
        let content = match self.pages.get(&page_number) {
            Some(page) => page.raster.text_content()?,
            None => self.engine.page(page_number)?.text_content()?,
        };
        Ok(content.plain_text())
    }

    /// Cancel every in-flight render.
    pub fn teardown(&mut self) {
        self.zoom_debounce.cancel();
        self.scroll_debounce.cancel();
        for page in self.pages.values_mut() {
            page.raster.teardown();
        }
    }

    fn raster_inputs(&self, page_bounds: Rect) -> RasterInputs {
        RasterInputs {
            transform: self.layout.transform(),
            viewport: self.layout.viewport_rect(),
            page_bounds,
        }
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for Viewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewer")
            .field("layout", &self.layout)
            .field("mounted", &self.pages.keys().collect::<Vec<_>>())
            .field("store", &self.store)
            .finish()
    }
}
