use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use doc_model::{AnnotationPatch, HighlightRect};
use pdf_viewer_geometry::Rect;
use pdf_viewer_render::{
    DocumentEngine, EngineError, PageHandle, PageViewport, RenderPoll, RenderRequest, RenderTask,
    RenderedFrame, TextContent, TextItem,
};
use pdf_viewer_selection::{
    BoundaryPoint, ContainerId, ContainerState, MarkerId, MarkerSide, NodeId, RawFragment,
    SelectionEvent, SelectionHost, SelectionRange, SelectionSnapshot,
};
use storage::{JsonFileStore, MemoryStore};
use viewer_core::{
    JumpAlign, JumpUnit, Placement, PlacementConstraints, Positioner, Side, TooltipKind, Viewer,
    ViewerConfig, ViewerError,
};

const PAGE_WIDTH: f64 = 600.0;
const PAGE_HEIGHT: f64 = 800.0;

#[derive(Default)]
struct EngineLog {
    requests: Vec<RenderRequest>,
}

#[derive(Clone, Default)]
struct EngineControl {
    log: Rc<RefCell<EngineLog>>,
    pending_polls: Rc<Cell<u32>>,
    fail: Rc<Cell<bool>>,
}

impl EngineControl {
    fn requests(&self) -> Vec<RenderRequest> {
        self.log.borrow().requests.clone()
    }
}

struct FakeEngine {
    pages: u32,
    control: EngineControl,
}

struct FakePage {
    number: u32,
    control: EngineControl,
}

struct FakeTask {
    request: RenderRequest,
    remaining: u32,
    fail: bool,
}

impl DocumentEngine for FakeEngine {
    fn page_count(&self) -> u32 {
        self.pages
    }

    fn page(&self, page_number: u32) -> Result<Box<dyn PageHandle>, EngineError> {
        if page_number == 0 || page_number > self.pages {
            return Err(EngineError::PageOutOfRange(page_number));
        }
        Ok(Box::new(FakePage { number: page_number, control: self.control.clone() }))
    }
}

impl PageHandle for FakePage {
    fn page_number(&self) -> u32 {
        self.number
    }

    fn viewport(&self, scale: f64) -> PageViewport {
        PageViewport { width: PAGE_WIDTH * scale, height: PAGE_HEIGHT * scale, scale }
    }

    fn render(&self, request: RenderRequest) -> Box<dyn RenderTask> {
        self.control.log.borrow_mut().requests.push(request.clone());
        Box::new(FakeTask {
            request,
            remaining: self.control.pending_polls.get(),
            fail: self.control.fail.get(),
        })
    }

    fn text_content(&self) -> Result<TextContent, EngineError> {
        Ok(TextContent {
            items: vec![
                TextItem { text: format!("Page {}", self.number), rect: Rect::new(10.0, 10.0, 60.0, 12.0) },
                TextItem { text: "body".to_owned(), rect: Rect::new(10.0, 30.0, 40.0, 12.0) },
            ],
        })
    }
}

impl RenderTask for FakeTask {
    fn cancel(&mut self) {
        self.request.token.cancel();
    }

    fn poll(&mut self) -> RenderPoll {
        if self.request.token.is_cancelled() {
            return RenderPoll::Ready(Err(EngineError::Cancelled));
        }
        if self.remaining > 0 {
            self.remaining -= 1;
            return RenderPoll::Pending;
        }
        if self.fail {
            return RenderPoll::Ready(Err(EngineError::Failed("rasterizer crashed".to_owned())));
        }

        let (width, height) = (self.request.pixel_width, self.request.pixel_height);
        RenderPoll::Ready(Ok(RenderedFrame {
            surface: self.request.surface,
            pixels: vec![255; 4],
            width,
            height,
            scale: self.request.scale,
        }))
    }
}

fn viewer_with(pages: u32, control: &EngineControl) -> Viewer {
    let engine = FakeEngine { pages, control: control.clone() };
    Viewer::new(Box::new(engine), ViewerConfig::default()).expect("viewer should open")
}

fn mount(viewer: &mut Viewer, page: u32) {
    viewer
        .mount_page(page, ContainerId(page as u64), MarkerId(100 + page as u64))
        .expect("page should mount");
}

/// Nodes 1-9 live in container 1, 11-19 in container 2 and so on.
#[derive(Default)]
struct FakeHost {
    selecting: HashMap<ContainerId, bool>,
    markers: HashMap<MarkerId, (NodeId, MarkerSide)>,
}

impl SelectionHost for FakeHost {
    fn intersects(&self, range: &SelectionRange, container: ContainerId) -> bool {
        let first = range.start.node.0 / 10 + 1;
        let last = range.end.node.0 / 10 + 1;
        (first..=last).contains(&container.0)
    }

    fn set_selecting(&mut self, container: ContainerId, selecting: bool) {
        self.selecting.insert(container, selecting);
    }

    fn reset_marker(&mut self, _container: ContainerId, marker: MarkerId) {
        self.markers.remove(&marker);
    }

    fn place_marker(&mut self, marker: MarkerId, _container: ContainerId, anchor: NodeId, side: MarkerSide) {
        self.markers.insert(marker, (anchor, side));
    }

    fn container_of(&self, node: NodeId) -> Option<ContainerId> {
        Some(ContainerId(node.0 / 10 + 1))
    }

    fn previous_content_node(&self, node: NodeId) -> Option<NodeId> {
        (node.0 % 10 > 1).then(|| NodeId(node.0 - 1))
    }

    fn native_trailing_selection(&self) -> bool {
        false
    }
}

/// Places the tooltip below its reference rect.
struct BelowPositioner;

impl Positioner for BelowPositioner {
    fn compute_placement(
        &self,
        reference: &Rect,
        preferred_side: Side,
        constraints: &PlacementConstraints,
    ) -> Placement {
        Placement { x: reference.left, y: reference.bottom() + constraints.offset, side: preferred_side }
    }
}

fn two_page_selection() -> SelectionSnapshot {
    SelectionSnapshot {
        fragments: vec![
            RawFragment::new(Rect::new(50.0, 100.0, 100.0, 12.0), "end of page one"),
            RawFragment::new(Rect::new(50.0, 900.0, 80.0, 12.0), "start of two"),
        ],
        text: "end of page one start of two".to_owned(),
        is_collapsed: false,
    }
}

#[test]
fn mounted_page_renders_base_surface() {
    let control = EngineControl::default();
    let mut viewer = viewer_with(3, &control);
    mount(&mut viewer, 1);

    assert_eq!(viewer.layout().page_count(), 3);
    assert!(viewer.has_pending_renders());

    let report = viewer.tick(Instant::now()).expect("tick should succeed");
    assert_eq!(report.frames_committed, 1);
    assert!(!report.zoom_applied);

    let raster = viewer.raster(1).expect("page 1 is mounted");
    assert_eq!(raster.base_state().pixel_width, 600);
    assert_eq!(raster.base_state().pixel_height, 800);
    assert!(raster.base_frame().is_some());
    assert!(!raster.is_detail_visible());
}

#[test]
fn zoom_is_debounced_and_adds_detail_surface_past_raster_limit() {
    let control = EngineControl::default();
    let mut viewer = viewer_with(2, &control);
    mount(&mut viewer, 1);
    let t0 = Instant::now();
    viewer.tick(t0).expect("initial render");

    viewer.set_zoom(10.0, t0);
    assert_eq!(viewer.next_deadline(), Some(t0 + Duration::from_millis(150)));

    let early = viewer.tick(t0 + Duration::from_millis(10)).expect("tick should succeed");
    assert!(!early.zoom_applied);
    assert_eq!(control.requests().len(), 1);

    let report = viewer.tick(t0 + Duration::from_millis(150)).expect("tick should succeed");
    assert!(report.zoom_applied);
    assert_eq!(report.frames_committed, 2);

    let raster = viewer.raster(1).expect("page 1 is mounted");
    let base = raster.base_state();
    assert!(base.effective_scale < 10.0);
    assert!(base.pixel_count() <= viewer.config().max_canvas_pixels);

    assert!(raster.is_detail_visible());
    let detail = raster.detail_state();
    assert!((detail.effective_scale - 13.0).abs() < 1e-9);
    let region = detail.visible_region.expect("detail covers the visible region");
    assert!((region.width - 128.0).abs() < 1e-9);
    assert!((region.height - 80.0).abs() < 1e-9);

    let placement = raster.detail_placement().expect("detail is placed");
    assert!((placement.width - 1280.0).abs() < 1e-6);
    assert!((placement.height - 800.0).abs() < 1e-6);
}

#[test]
fn newer_render_supersedes_in_flight_one() {
    let control = EngineControl::default();
    control.pending_polls.set(1);
    let mut viewer = viewer_with(1, &control);
    mount(&mut viewer, 1);

    let t0 = Instant::now();
    viewer.set_zoom(2.0, t0);
    let first = viewer.tick(t0 + Duration::from_millis(150)).expect("tick should succeed");
    assert_eq!(first.frames_committed, 0);

    let requests = control.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].token.is_cancelled());
    assert!(!requests[1].token.is_cancelled());

    let second = viewer.tick(t0 + Duration::from_millis(160)).expect("tick should succeed");
    assert_eq!(second.frames_committed, 1);

    let raster = viewer.raster(1).expect("page 1 is mounted");
    assert_eq!(raster.base_state().effective_scale, 2.0);
    let stats = raster.stats();
    assert_eq!(stats.issued, 2);
    assert_eq!(stats.committed, 1);
    assert_eq!(stats.cancelled, 1);
}

#[test]
fn failed_render_keeps_previous_frame() {
    let control = EngineControl::default();
    let mut viewer = viewer_with(1, &control);
    mount(&mut viewer, 1);
    let t0 = Instant::now();
    viewer.tick(t0).expect("initial render");

    control.fail.set(true);
    viewer.set_zoom(2.0, t0);
    let err = viewer.tick(t0 + Duration::from_millis(150)).expect_err("render should fail");
    assert!(matches!(err, ViewerError::Render(_)));

    let raster = viewer.raster(1).expect("page 1 is mounted");
    assert_eq!(raster.base_state().effective_scale, 1.0);
    assert!(raster.base_frame().is_some());

    control.fail.set(false);
    viewer.set_zoom(2.0, t0 + Duration::from_millis(200));
    viewer.tick(t0 + Duration::from_millis(350)).expect("retry should succeed");
    assert_eq!(viewer.raster(1).expect("mounted").base_state().effective_scale, 2.0);
}

#[test]
fn unmount_cancels_in_flight_work() {
    let control = EngineControl::default();
    control.pending_polls.set(5);
    let mut viewer = viewer_with(2, &control);
    mount(&mut viewer, 2);
    assert!(viewer.selection().registry().contains(ContainerId(2)));

    assert!(viewer.unmount_page(2));
    assert!(!viewer.unmount_page(2));
    assert!(control.requests()[0].token.is_cancelled());
    assert!(!viewer.selection().registry().contains(ContainerId(2)));
    assert!(viewer.mounted_pages().is_empty());
}

#[test]
fn mounting_unknown_page_fails() {
    let control = EngineControl::default();
    let mut viewer = viewer_with(2, &control);

    let err = viewer
        .mount_page(9, ContainerId(9), MarkerId(9))
        .expect_err("page 9 does not exist");
    assert!(matches!(err, ViewerError::UnknownPage(9)));
}

#[test]
fn selection_sweep_spans_mounted_pages() {
    let control = EngineControl::default();
    let mut viewer = viewer_with(2, &control);
    mount(&mut viewer, 1);
    mount(&mut viewer, 2);
    let mut host = FakeHost::default();

    viewer.handle_selection_event(SelectionEvent::PointerDown, &mut host);
    let range = SelectionRange::new(BoundaryPoint::new(NodeId(2), 1), BoundaryPoint::new(NodeId(12), 3));
    let report = viewer.handle_selection_event(SelectionEvent::SelectionChanged(Some(range)), &mut host);

    let mut activated = report.activated.clone();
    activated.sort();
    assert_eq!(activated, vec![ContainerId(1), ContainerId(2)]);
    assert_eq!(viewer.selection().state(ContainerId(2)), Some(ContainerState::Selecting));
    assert_eq!(host.markers.get(&MarkerId(102)), Some(&(NodeId(12), MarkerSide::After)));

    let report = viewer.handle_selection_event(SelectionEvent::PointerUp, &mut host);
    assert_eq!(report.reset.len(), 2);
    assert_eq!(host.selecting.get(&ContainerId(1)), Some(&false));
    assert!(host.markers.is_empty());
}

#[test]
fn committed_highlight_keeps_pages_apart() {
    let control = EngineControl::default();
    let mut viewer = viewer_with(2, &control);
    mount(&mut viewer, 1);
    mount(&mut viewer, 2);

    let id = viewer.commit_highlight(&two_page_selection()).expect("selection is on mounted pages");
    let annotation = viewer.store().get(&id).expect("annotation was stored");

    assert_eq!(annotation.page_number, 1);
    assert_eq!(annotation.highlights.len(), 2);
    assert_eq!(annotation.highlights[0], HighlightRect::new(1, 50.0, 100.0, 100.0, 12.0));
    assert_eq!(annotation.highlights[1], HighlightRect::new(2, 50.0, 90.0, 80.0, 12.0));

    let collapsed = SelectionSnapshot { is_collapsed: true, ..two_page_selection() };
    assert_eq!(viewer.commit_highlight(&collapsed), None);
    assert_eq!(viewer.get_annotations().len(), 1);
}

#[test]
fn abandoned_comment_is_removed_but_commented_one_stays() {
    let control = EngineControl::default();
    let mut viewer = viewer_with(2, &control);
    mount(&mut viewer, 1);
    mount(&mut viewer, 2);

    let abandoned = viewer.begin_comment(&two_page_selection()).expect("comment started");
    assert_eq!(viewer.tooltips().visible(&abandoned), Some(TooltipKind::Click));
    assert!(viewer.cancel_comment(&abandoned));
    assert!(viewer.store().get(&abandoned).is_none());
    assert_eq!(viewer.tooltips().visible(&abandoned), None);

    let kept = viewer.begin_comment(&two_page_selection()).expect("comment started");
    assert!(viewer.update_annotation(&kept, AnnotationPatch::comment("Check this figure")));
    assert!(!viewer.cancel_comment(&kept));
    assert!(viewer.store().get(&kept).is_some());
    assert!(!viewer.tooltips().is_click_open(&kept));

    viewer.tooltips_mut().open_click(&kept);
    assert!(viewer.delete_annotation(&kept).is_some());
    assert!(viewer.tooltips().open_ids().is_empty());
}

#[test]
fn jump_to_scrolls_and_schedules_detail_update() {
    let control = EngineControl::default();
    let mut viewer = viewer_with(3, &control);
    mount(&mut viewer, 2);
    let t0 = Instant::now();

    let target = [HighlightRect::new(2, 10.0, 100.0, 50.0, 12.0)];
    let scroll = viewer.jump_to(&target, JumpUnit::Page, JumpAlign::Start, 0.0, t0);
    assert_eq!(scroll, Some(910.0));
    assert_eq!(viewer.layout().scroll_top, 910.0);

    let last_page = [HighlightRect::new(3, 10.0, 700.0, 50.0, 12.0)];
    let clamped = viewer.jump_to(&last_page, JumpUnit::Page, JumpAlign::Start, 0.0, t0);
    assert_eq!(clamped, Some(viewer.layout().max_scroll_top()));

    let report = viewer.tick(t0 + Duration::from_millis(20)).expect("tick should succeed");
    assert!(report.scroll_applied);
    assert!(!report.zoom_applied);

    let missing = [HighlightRect::new(7, 0.0, 0.0, 1.0, 1.0)];
    assert_eq!(viewer.jump_to(&missing, JumpUnit::Page, JumpAlign::Start, 0.0, t0), None);
}

#[test]
fn tooltip_is_placed_against_scrolled_highlight() {
    let control = EngineControl::default();
    let engine = FakeEngine { pages: 2, control: control.clone() };
    let mut viewer = Viewer::new(Box::new(engine), ViewerConfig::default())
        .expect("viewer should open")
        .with_positioner(Box::new(BelowPositioner));

    let annotation = doc_model::Annotation::new(vec![HighlightRect::new(2, 10.0, 20.0, 30.0, 10.0)], Vec::new());
    let id = viewer.add_annotation(annotation).expect("annotation added");

    let placement = viewer.tooltip_placement(&id, Side::Bottom).expect("annotation is laid out");
    assert_eq!(placement, Placement { x: 10.0, y: 848.0, side: Side::Bottom });

    viewer.scroll_to(100.0, Instant::now());
    let scrolled = viewer.tooltip_placement(&id, Side::Top).expect("annotation is laid out");
    assert_eq!(scrolled.y, 748.0);
    assert_eq!(scrolled.side, Side::Top);
}

#[test]
fn tooltip_spanning_pages_uses_each_page_origin() {
    let control = EngineControl::default();
    let engine = FakeEngine { pages: 2, control: control.clone() };
    let mut viewer = Viewer::new(Box::new(engine), ViewerConfig::default())
        .expect("viewer should open")
        .with_positioner(Box::new(BelowPositioner));

    let annotation = doc_model::Annotation::new(
        vec![
            HighlightRect::new(1, 50.0, 780.0, 100.0, 12.0),
            HighlightRect::new(2, 50.0, 10.0, 100.0, 12.0),
        ],
        Vec::new(),
    );
    let id = viewer.add_annotation(annotation).expect("annotation added");

    // Page 2 starts at 810; its highlight ends at 832 in client space.
    let placement = viewer.tooltip_placement(&id, Side::Bottom).expect("annotation is laid out");
    assert_eq!(placement, Placement { x: 50.0, y: 840.0, side: Side::Bottom });
}

#[test]
fn corrupt_annotations_file_leaves_viewer_usable() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let control = EngineControl::default();
    let store = JsonFileStore::with_root(temp.path(), "paper.pdf");
    std::fs::write(store.path(), "{ not json").expect("sidecar written");

    let mut viewer = viewer_with(1, &control).with_persistence(Box::new(store));
    assert!(viewer.get_annotations().is_empty());
    mount(&mut viewer, 1);
    let report = viewer.tick(Instant::now()).expect("tick should succeed");
    assert_eq!(report.frames_committed, 1);

    let failures = Rc::new(Cell::new(0));
    let sink = failures.clone();
    let mut reporting = viewer_with(1, &control);
    reporting.on_persistence_error(move |_| sink.set(sink.get() + 1));
    let loaded =
        reporting.attach_persistence(Box::new(JsonFileStore::with_root(temp.path(), "paper.pdf")));
    assert_eq!(loaded, 0);
    assert_eq!(failures.get(), 1);
}

#[test]
fn annotations_survive_reopening_with_json_store() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let control = EngineControl::default();

    {
        let store = JsonFileStore::with_root(temp.path(), "paper.pdf");
        let mut viewer = viewer_with(2, &control).with_persistence(Box::new(store));
        mount(&mut viewer, 1);
        mount(&mut viewer, 2);
        viewer.commit_highlight(&two_page_selection()).expect("highlight committed");
    }

    let store = JsonFileStore::with_root(temp.path(), "paper.pdf");
    let raw = std::fs::read(store.path()).expect("annotations file should exist");
    let json: serde_json::Value = serde_json::from_slice(&raw).expect("file is json");
    assert_eq!(json["version"], 1);

    let reopened = viewer_with(2, &control).with_persistence(Box::new(store));
    assert_eq!(reopened.get_annotations().len(), 1);
    assert_eq!(reopened.get_annotations()[0].highlights.len(), 2);
}

#[test]
fn persistence_errors_reach_callback() {
    let control = EngineControl::default();
    let backend = MemoryStore::new();
    backend.set_fail_saves(true);
    let failures = Rc::new(Cell::new(0));

    let mut viewer = viewer_with(1, &control).with_persistence(Box::new(backend.clone()));
    let sink = failures.clone();
    viewer.on_persistence_error(move |_| sink.set(sink.get() + 1));
    mount(&mut viewer, 1);

    let snapshot = SelectionSnapshot {
        fragments: vec![RawFragment::new(Rect::new(50.0, 100.0, 100.0, 12.0), "text")],
        text: "text".to_owned(),
        is_collapsed: false,
    };
    viewer.commit_highlight(&snapshot).expect("kept in memory");

    assert_eq!(failures.get(), 1);
    assert_eq!(viewer.get_annotations().len(), 1);
    assert_eq!(backend.saved(), None);
}

#[test]
fn page_text_joins_runs() {
    let control = EngineControl::default();
    let mut viewer = viewer_with(2, &control);
    mount(&mut viewer, 1);

    assert_eq!(viewer.page_text(1).expect("mounted page text"), "Page 1\nbody");
    assert_eq!(viewer.page_text(2).expect("unmounted page text"), "Page 2\nbody");
    assert!(matches!(viewer.page_text(5), Err(ViewerError::Engine(EngineError::PageOutOfRange(5)))));
}
