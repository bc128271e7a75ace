//! Per-page adaptive raster pipeline
//!
//! Each page keeps a base surface covering the whole page and, when the base
//! scale had to be clamped, a detail surface covering only the visible region
//! at elevated resolution. Renders are issued through [`OperationSlots`] so a
//! surface has at most one live operation, and polled with [`PageRaster::pump`].

use crate::engine::{PageHandle, RenderPoll, RenderRequest, RenderTask, SurfaceKind, TextContent};
use crate::error::{EngineError, RenderError, RenderResult};
use crate::limits::{ClampedScale, RasterLimits};
use crate::surface::{RasterTileState, RenderedFrame, TilePlacement};
use pdf_viewer_geometry::{Rect, ViewTransform};
use pdf_viewer_scheduler::{OperationId, OperationSlots};

/// Detail surface resolution relative to the requested base scale
pub const DETAIL_SCALE_FACTOR: f64 = 1.3;

/// Minimum scale deficit of the base surface before a detail surface is shown
const SCALE_EPSILON: f64 = 1e-3;

/// View parameters a page raster is computed from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterInputs {
    pub transform: ViewTransform,
    /// Scroll viewport in client coordinates
    pub viewport: Rect,
    /// Page container in client coordinates
    pub page_bounds: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetailPlan {
    pub state: RasterTileState,
    pub placement: TilePlacement,
    /// Translation applied by the engine, in raster pixels
    pub offset: (f64, f64),
}

/// Surfaces a page needs for the given inputs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterPlan {
    pub base: RasterTileState,
    pub base_clamp: ClampedScale,
    pub detail: Option<DetailPlan>,
}

/// Diagnostic counters of a page raster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub issued: u64,
    pub committed: u64,
    /// Operations cancelled or superseded before they could commit
    pub cancelled: u64,
    pub failed: u64,
}

struct InFlight {
    surface: SurfaceKind,
    id: OperationId,
    state: RasterTileState,
    placement: Option<TilePlacement>,
    task: Box<dyn RenderTask>,
    cancelled: bool,
}

#[derive(Debug, Default)]
struct Surface {
    /// Last issued state, committed or not
    target: Option<RasterTileState>,
    committed: RasterTileState,
    frame: Option<RenderedFrame>,
    placement: Option<TilePlacement>,
}

/// Raster state of one mounted page
pub struct PageRaster {
    page: Box<dyn PageHandle>,
    page_number: u32,
    limits: RasterLimits,
    detail_scale_factor: f64,
    slots: OperationSlots<SurfaceKind>,
    in_flight: Vec<InFlight>,
    base: Surface,
    detail: Surface,
    stats: RenderStats,
}

impl PageRaster {
    pub fn new(page: Box<dyn PageHandle>, limits: RasterLimits) -> Self {
        let page_number = page.page_number();
        Self {
            page,
            page_number,
            limits,
            detail_scale_factor: DETAIL_SCALE_FACTOR,
            slots: OperationSlots::new(),
            in_flight: Vec::new(),
            base: Surface::default(),
            detail: Surface::default(),
            stats: RenderStats::default(),
        }
    }

    pub fn with_detail_scale_factor(mut self, factor: f64) -> Self {
        if factor.is_finite() && factor > 0.0 {
            self.detail_scale_factor = factor;
        }
        self
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    /// Unscaled page size in page-local units.
    pub fn page_size(&self) -> (f64, f64) {
        let viewport = self.page.viewport(1.0);
        (viewport.width, viewport.height)
    }

    pub fn text_content(&self) -> Result<TextContent, EngineError> {
        self.page.text_content()
    }

    /// Compute the surfaces needed for `inputs` without issuing anything.
    pub fn plan(&self, inputs: &RasterInputs) -> RenderResult<RasterPlan> {
        let (width, height) = self.page_size();
        if !(width > 0.0 && height > 0.0) {
            return Err(RenderError::EmptyViewport(self.page_number));
        }

        let base_clamp = self.limits.clamp_scale(width, height, inputs.transform.raster_scale());
        let base = RasterTileState {
            pixel_width: base_clamp.pixel_width,
            pixel_height: base_clamp.pixel_height,
            effective_scale: base_clamp.scale,
            visible_region: None,
        };

        Ok(RasterPlan { base, base_clamp, detail: self.plan_detail(inputs, &base_clamp) })
    }

    fn plan_detail(&self, inputs: &RasterInputs, base: &ClampedScale) -> Option<DetailPlan> {
        if base.requested - base.scale <= SCALE_EPSILON {
            return None;
        }

        let zoom = inputs.transform.effective_zoom();
        let visible = inputs.viewport.intersection(&inputs.page_bounds)?;
        let region = Rect::new(
            (visible.left - inputs.page_bounds.left) / zoom,
            (visible.top - inputs.page_bounds.top) / zoom,
            visible.width / zoom,
            visible.height / zoom,
        );
        if region.area() <= 0.0 {
            return None;
        }

        let tile = self.limits.clamp_scale(
            region.width,
            region.height,
            base.requested * self.detail_scale_factor,
        );
        let state = RasterTileState {
            pixel_width: tile.pixel_width,
            pixel_height: tile.pixel_height,
            effective_scale: tile.scale,
            visible_region: Some(region),
        };
        if !state.is_visible() {
            return None;
        }

        Some(DetailPlan {
            state,
            placement: TilePlacement::from_region(&region, zoom),
            offset: (-region.left * tile.scale, -region.top * tile.scale),
        })
    }

    /// Re-plan both surfaces and issue renders for whatever changed.
    pub fn update(&mut self, inputs: &RasterInputs) -> RenderResult<()> {
        let plan = self.plan(inputs)?;
        self.apply_base(plan.base);
        self.apply_detail(plan.detail);
        Ok(())
    }

    /// Re-plan only the detail surface, e.g. after scrolling.
    pub fn update_detail(&mut self, inputs: &RasterInputs) -> RenderResult<()> {
        let plan = self.plan(inputs)?;
        self.apply_detail(plan.detail);
        Ok(())
    }

    fn apply_base(&mut self, state: RasterTileState) {
        if self.base.target == Some(state)
            && (self.base.frame.is_some() || self.slots.is_live(&SurfaceKind::Base))
        {
            return;
        }
        self.issue(SurfaceKind::Base, state, None, (0.0, 0.0));
    }

    fn apply_detail(&mut self, plan: Option<DetailPlan>) {
        let Some(plan) = plan else {
            self.hide_detail();
            return;
        };

        if self.detail.target == Some(plan.state)
            && (self.detail.frame.is_some() || self.slots.is_live(&SurfaceKind::Detail))
        {
            return;
        }
        self.issue(SurfaceKind::Detail, plan.state, Some(plan.placement), plan.offset);
    }

    fn hide_detail(&mut self) {
        if self.slots.cancel(&SurfaceKind::Detail) {
            log::debug!("page {}: detail surface no longer needed", self.page_number);
        }
        self.cancel_tasks(SurfaceKind::Detail);
        self.detail = Surface::default();
    }

    fn issue(
        &mut self,
        surface: SurfaceKind,
        state: RasterTileState,
        placement: Option<TilePlacement>,
        offset: (f64, f64),
    ) {
        let ticket = self.slots.issue(surface);
        self.cancel_tasks(surface);

        let request = RenderRequest {
            page_number: self.page_number,
            surface,
            pixel_width: state.pixel_width,
            pixel_height: state.pixel_height,
            scale: state.effective_scale,
            offset,
            token: ticket.token.clone(),
        };
        log::debug!(
            "page {}: rendering {} surface {}x{} at scale {:.3}",
            self.page_number,
            surface.as_str(),
            state.pixel_width,
            state.pixel_height,
            state.effective_scale
        );

        let task = self.page.render(request);
        self.in_flight.push(InFlight {
            surface,
            id: ticket.id,
            state,
            placement,
            task,
            cancelled: false,
        });
        self.surface_mut(surface).target = Some(state);
        self.stats.issued += 1;
    }

    fn cancel_tasks(&mut self, surface: SurfaceKind) {
        for flight in self.in_flight.iter_mut().filter(|f| f.surface == surface && !f.cancelled) {
            if !self.slots.is_current(&surface, flight.id) {
                flight.task.cancel();
                flight.cancelled = true;
            }
        }
    }

    /// Poll every in-flight operation once.
    ///
    /// Returns the number of frames committed. Cancelled and superseded
    /// operations are drained silently. The first non-cancellation failure is
    /// returned after all operations were polled; the failed surface keeps
    /// its previous frame.
    pub fn pump(&mut self) -> RenderResult<usize> {
        let mut committed = 0;
        let mut first_error = None;
        let mut pending = Vec::with_capacity(self.in_flight.len());

        for mut flight in std::mem::take(&mut self.in_flight) {
            match flight.task.poll() {
                RenderPoll::Pending => pending.push(flight),
                RenderPoll::Ready(Ok(frame)) => {
                    if self.slots.settle(&flight.surface, flight.id) {
                        let surface = self.surface_mut(flight.surface);
                        surface.committed = flight.state;
                        surface.placement = flight.placement;
                        surface.frame = Some(frame);
                        self.stats.committed += 1;
                        committed += 1;
                    } else {
                        self.stats.cancelled += 1;
                        log::debug!(
                            "page {}: discarding superseded {} frame",
                            self.page_number,
                            flight.surface.as_str()
                        );
                    }
                }
                RenderPoll::Ready(Err(err)) => {
                    let current = self.slots.settle(&flight.surface, flight.id);
                    if current {
                        self.surface_mut(flight.surface).target = None;
                    }

                    if err.is_cancelled() || !current {
                        self.stats.cancelled += 1;
                        log::debug!(
                            "page {}: {} render cancelled",
                            self.page_number,
                            flight.surface.as_str()
                        );
                        continue;
                    }

                    self.stats.failed += 1;
                    log::warn!(
                        "page {}: {} render failed: {}",
                        self.page_number,
                        flight.surface.as_str(),
                        err
                    );
                    first_error.get_or_insert(RenderError::Engine {
                        page: self.page_number,
                        surface: flight.surface.as_str(),
                        source: err,
                    });
                }
            }
        }

        self.in_flight = pending;
        match first_error {
            Some(err) => Err(err),
            None => Ok(committed),
        }
    }

    /// Cancel every in-flight operation of this page.
    pub fn teardown(&mut self) {
        self.slots.cancel_all();
        for mut flight in self.in_flight.drain(..) {
            flight.task.cancel();
            self.stats.cancelled += 1;
        }
        self.base.target = None;
        self.detail.target = None;
    }

    fn surface_mut(&mut self, surface: SurfaceKind) -> &mut Surface {
        match surface {
            SurfaceKind::Base => &mut self.base,
            SurfaceKind::Detail => &mut self.detail,
        }
    }

    pub fn base_state(&self) -> RasterTileState {
        self.base.committed
    }

    pub fn base_frame(&self) -> Option<&RenderedFrame> {
        self.base.frame.as_ref()
    }

    pub fn detail_state(&self) -> RasterTileState {
        self.detail.committed
    }

    pub fn detail_frame(&self) -> Option<&RenderedFrame> {
        self.detail.frame.as_ref()
    }

    pub fn detail_placement(&self) -> Option<TilePlacement> {
        self.detail.placement
    }

    pub fn is_detail_visible(&self) -> bool {
        self.detail.frame.is_some() && self.detail.committed.is_visible()
    }

    pub fn has_pending(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }
}

impl Drop for PageRaster {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for PageRaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRaster")
            .field("page_number", &self.page_number)
            .field("limits", &self.limits)
            .field("in_flight", &self.in_flight.len())
            .field("stats", &self.stats)
            .finish()
    }
}
