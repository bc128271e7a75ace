//! Continuous vertical page layout
//!
//! Pages are stacked top to bottom with a fixed gap. Page sizes are kept in
//! unscaled page units; every client-space value is derived from them with
//! the current zoom.

use std::ops::RangeInclusive;

use pdf_viewer_geometry::{Rect, ViewTransform};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewportState {
    pub zoom: f64,
    pub device_pixel_ratio: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Client position of the scroll container's top-left corner
    pub origin: (f64, f64),
    pub scroll_top: f64,
    pub scroll_left: f64,
    pub page_sizes: Vec<PageSize>,
    pub page_gap: f64,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            device_pixel_ratio: 1.0,
            viewport_width: 1280.0,
            viewport_height: 800.0,
            origin: (0.0, 0.0),
            scroll_top: 0.0,
            scroll_left: 0.0,
            page_sizes: Vec::new(),
            page_gap: 10.0,
        }
    }
}

impl ViewportState {
    pub fn transform(&self) -> ViewTransform {
        ViewTransform::new(self.zoom, self.device_pixel_ratio)
    }

    fn zoom(&self) -> f64 {
        self.transform().effective_zoom()
    }

    pub fn page_count(&self) -> u32 {
        self.page_sizes.len() as u32
    }

    /// Scroll container bounds in client coordinates.
    pub fn viewport_rect(&self) -> Rect {
        Rect::new(self.origin.0, self.origin.1, self.viewport_width, self.viewport_height)
    }

    /// Offset of the top of `page_number` (1-based) within the scrolled content.
    pub fn page_top(&self, page_number: u32) -> Option<f64> {
        let index = page_index(page_number, self.page_sizes.len())?;
        let zoom = self.zoom();
        Some(
            self.page_sizes[..index]
                .iter()
                .map(|size| size.height * zoom + self.page_gap)
                .sum(),
        )
    }

    /// Client bounds of the container of `page_number`.
    pub fn page_client_bounds(&self, page_number: u32) -> Option<Rect> {
        let top = self.page_top(page_number)?;
        let size = self.page_sizes[page_number as usize - 1];
        let zoom = self.zoom();
        Some(Rect::new(
            self.origin.0 - self.scroll_left,
            self.origin.1 + top - self.scroll_top,
            size.width * zoom,
            size.height * zoom,
        ))
    }

    pub fn content_height(&self) -> f64 {
        let zoom = self.zoom();
        let pages: f64 = self.page_sizes.iter().map(|size| size.height * zoom).sum();
        let gaps = self.page_gap * self.page_sizes.len().saturating_sub(1) as f64;
        pages + gaps
    }

    pub fn max_scroll_top(&self) -> f64 {
        (self.content_height() - self.viewport_height).max(0.0)
    }

    pub fn clamp_scroll_top(&self, scroll_top: f64) -> f64 {
        if !scroll_top.is_finite() {
            return 0.0;
        }
        scroll_top.clamp(0.0, self.max_scroll_top())
    }

    /// Change zoom while keeping the content under the viewport top in place.
    pub fn set_zoom_anchored(&mut self, zoom: f64) {
        let old = self.zoom();
        self.zoom = zoom;
        let new = self.zoom();
        self.scroll_top = self.clamp_scroll_top(self.scroll_top * new / old);
        self.scroll_left = (self.scroll_left * new / old).max(0.0);
    }
}

fn page_index(page_number: u32, page_count: usize) -> Option<usize> {
    let index = (page_number as usize).checked_sub(1)?;
    (index < page_count).then_some(index)
}

/// Pages (1-based) intersecting the viewport.
pub fn visible_pages(state: &ViewportState) -> RangeInclusive<u32> {
    if state.page_sizes.is_empty() {
        return 1..=0;
    }

    let start = page_at_offset(state.scroll_top.max(0.0), state);
    let end = page_at_offset((state.scroll_top + state.viewport_height).max(0.0), state);

    start..=end
}

/// Page (1-based) under the vertical center of the viewport.
pub fn current_page(state: &ViewportState) -> u32 {
    if state.page_sizes.is_empty() {
        return 0;
    }

    let center_offset = (state.scroll_top + state.viewport_height / 2.0).max(0.0);
    page_at_offset(center_offset, state)
}

fn page_at_offset(offset: f64, state: &ViewportState) -> u32 {
    let zoom = state.transform().effective_zoom();
    let mut cursor = 0.0;

    for (index, size) in state.page_sizes.iter().enumerate() {
        let page_end = cursor + size.height * zoom;
        if offset <= page_end {
            return index as u32 + 1;
        }

        cursor = page_end + state.page_gap;
    }

    state.page_sizes.len() as u32
}
