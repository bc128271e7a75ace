//! Annotation tooltip state
//!
//! Each annotation has a click tooltip (sticky, toggled by clicking the
//! highlight) and a hover tooltip (shown while the pointer is over the
//! highlight or the tooltip itself). Hover closing is delayed so the pointer
//! can travel from the highlight into the tooltip.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use doc_model::{Annotation, AnnotationId};
use pdf_viewer_geometry::{bounding_box, page_to_client, Rect};

/// Default delay before a hover tooltip closes
pub const HOVER_CLOSE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

/// Where a tooltip is drawn, in client coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub side: Side,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementConstraints {
    /// Area the tooltip must stay inside
    pub boundary: Rect,
    /// Distance between reference and tooltip
    pub offset: f64,
    /// Minimum distance to the boundary edges
    pub padding: f64,
}

/// Floating placement capability supplied by the host
pub trait Positioner {
    fn compute_placement(
        &self,
        reference: &Rect,
        preferred_side: Side,
        constraints: &PlacementConstraints,
    ) -> Placement;
}

/// Client-space reference rect of an annotation's tooltip.
///
/// Each highlight is scaled by `zoom` and offset by the client origin of its
/// own page container, as reported by `page_origin`; the result is the union.
/// Highlights on pages without an origin are skipped.
pub fn reference_rect(
    annotation: &Annotation,
    zoom: f64,
    page_origin: impl Fn(u32) -> Option<(f64, f64)>,
) -> Option<Rect> {
    let client_rects: Vec<Rect> = annotation
        .highlights
        .iter()
        .filter_map(|rect| Some(page_to_client(rect, page_origin(rect.page_number)?, zoom)))
        .collect();
    bounding_box(&client_rects)
}

/// Which tooltip of an annotation is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TooltipKind {
    Click,
    Hover,
}

#[derive(Debug, Clone, Copy, Default)]
struct TooltipState {
    click_open: bool,
    hover_open: bool,
    hover_close_at: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct TooltipMachine {
    states: HashMap<AnnotationId, TooltipState>,
    click_focus: Option<AnnotationId>,
    hover_focus: Option<AnnotationId>,
    close_delay: Duration,
}

impl Default for TooltipMachine {
    fn default() -> Self {
        Self::new(HOVER_CLOSE_DELAY)
    }
}

impl TooltipMachine {
    pub fn new(close_delay: Duration) -> Self {
        Self { states: HashMap::new(), click_focus: None, hover_focus: None, close_delay }
    }

    /// Externally focus an annotation's click tooltip.
    ///
    /// While set, only this annotation may open a click tooltip, and it is
    /// opened immediately.
    pub fn set_click_focus(&mut self, id: Option<AnnotationId>) {
        if let Some(focused) = &id {
            for (key, state) in self.states.iter_mut() {
                state.click_open = key == focused;
            }
            self.states.entry(focused.clone()).or_default().click_open = true;
        }
        self.click_focus = id;
    }

    /// Externally focus an annotation's hover tooltip.
    pub fn set_hover_focus(&mut self, id: Option<AnnotationId>) {
        if let Some(focused) = &id {
            for (key, state) in self.states.iter_mut() {
                state.hover_open = key == focused;
                state.hover_close_at = None;
            }
            self.states.entry(focused.clone()).or_default().hover_open = true;
        }
        self.hover_focus = id;
    }

    fn may_click_open(&self, id: &AnnotationId) -> bool {
        self.click_focus.as_ref().map_or(true, |focused| focused == id)
    }

    fn may_hover_open(&self, id: &AnnotationId) -> bool {
        self.hover_focus.as_ref().map_or(true, |focused| focused == id)
    }

    /// Toggle the click tooltip. Opening one closes every other click tooltip.
    ///
    /// Returns whether it is open afterwards.
    pub fn click(&mut self, id: &AnnotationId) -> bool {
        let open = self.is_click_open(id);
        if open {
            self.close_click(id);
            return false;
        }
        self.open_click(id)
    }

    /// Open the click tooltip of `id`, closing the others.
    pub fn open_click(&mut self, id: &AnnotationId) -> bool {
        if !self.may_click_open(id) {
            return false;
        }

        for (key, state) in self.states.iter_mut() {
            if key != id {
                state.click_open = false;
            }
        }
        let state = self.states.entry(id.clone()).or_default();
        state.click_open = true;
        state.hover_open = false;
        state.hover_close_at = None;
        true
    }

    pub fn close_click(&mut self, id: &AnnotationId) {
        if let Some(state) = self.states.get_mut(id) {
            state.click_open = false;
        }
    }

    pub fn pointer_enter_highlight(&mut self, id: &AnnotationId) {
        if !self.may_hover_open(id) {
            return;
        }
        let state = self.states.entry(id.clone()).or_default();
        state.hover_open = true;
        state.hover_close_at = None;
    }

    pub fn pointer_leave_highlight(&mut self, id: &AnnotationId, now: Instant) {
        self.schedule_close(id, now);
    }

    /// The pointer reached the tooltip; keep it open.
    pub fn pointer_enter_tooltip(&mut self, id: &AnnotationId) {
        if let Some(state) = self.states.get_mut(id) {
            state.hover_close_at = None;
        }
    }

    pub fn pointer_leave_tooltip(&mut self, id: &AnnotationId, now: Instant) {
        self.schedule_close(id, now);
    }

    fn schedule_close(&mut self, id: &AnnotationId, now: Instant) {
        if self.hover_focus.as_ref() == Some(id) {
            return;
        }
        if let Some(state) = self.states.get_mut(id) {
            if state.hover_open {
                state.hover_close_at = Some(now + self.close_delay);
            }
        }
    }

    /// Close hover tooltips whose delay elapsed. Returns the closed ids.
    pub fn tick(&mut self, now: Instant) -> Vec<AnnotationId> {
        let mut closed = Vec::new();
        for (id, state) in self.states.iter_mut() {
            if state.hover_close_at.is_some_and(|deadline| now >= deadline) {
                state.hover_open = false;
                state.hover_close_at = None;
                closed.push(id.clone());
            }
        }
        closed.sort();
        closed
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.states.values().filter_map(|state| state.hover_close_at).min()
    }

    /// Forget an annotation, e.g. after it was deleted.
    pub fn remove(&mut self, id: &AnnotationId) {
        self.states.remove(id);
        if self.click_focus.as_ref() == Some(id) {
            self.click_focus = None;
        }
        if self.hover_focus.as_ref() == Some(id) {
            self.hover_focus = None;
        }
    }

    pub fn close_all(&mut self) {
        self.states.clear();
    }

    pub fn is_click_open(&self, id: &AnnotationId) -> bool {
        self.states.get(id).is_some_and(|state| state.click_open)
    }

    /// Hover content never shows while the click tooltip is open.
    pub fn is_hover_visible(&self, id: &AnnotationId) -> bool {
        self.states.get(id).is_some_and(|state| state.hover_open && !state.click_open)
    }

    pub fn visible(&self, id: &AnnotationId) -> Option<TooltipKind> {
        if self.is_click_open(id) {
            Some(TooltipKind::Click)
        } else if self.is_hover_visible(id) {
            Some(TooltipKind::Hover)
        } else {
            None
        }
    }

    /// Annotations with any tooltip showing, sorted by id.
    pub fn open_ids(&self) -> Vec<AnnotationId> {
        let mut ids: Vec<_> = self
            .states
            .iter()
            .filter(|(_, state)| state.click_open || state.hover_open)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}
