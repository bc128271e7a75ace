//! Conversions between page-local and client coordinates
//!
//! Page-local ("PDF") units are unscaled. Client units are CSS-style pixels
//! of the hosting surface, i.e. page units multiplied by the zoom factor.
//! Raster pixels additionally multiply by the device pixel ratio.

use crate::rect::{bounding_box, Rect};
use doc_model::HighlightRect;

/// Zoom and device pixel ratio of the current view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub zoom: f64,
    pub device_pixel_ratio: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self { zoom: 1.0, device_pixel_ratio: 1.0 }
    }
}

impl ViewTransform {
    pub fn new(zoom: f64, device_pixel_ratio: f64) -> Self {
        Self { zoom, device_pixel_ratio }
    }

    /// Zoom factor, with invalid values treated as 1.
    pub fn effective_zoom(&self) -> f64 {
        sanitize_factor(self.zoom)
    }

    /// Raster pixels per page unit.
    pub fn raster_scale(&self) -> f64 {
        sanitize_factor(self.zoom) * sanitize_factor(self.device_pixel_ratio)
    }
}

/// Map a client-space rect into the page whose container occupies
/// `page_bounds` on screen.
pub fn client_to_page(
    client: &Rect,
    page_bounds: &Rect,
    zoom: f64,
    page_number: u32,
) -> HighlightRect {
    let zoom = sanitize_factor(zoom);
    HighlightRect::new(
        page_number,
        (client.left - page_bounds.left) / zoom,
        (client.top - page_bounds.top) / zoom,
        client.width / zoom,
        client.height / zoom,
    )
}

/// Map a stored page-local rect back into client space.
///
/// `page_origin` is the top-left corner of the page container in client
/// coordinates.
pub fn page_to_client(rect: &HighlightRect, page_origin: (f64, f64), zoom: f64) -> Rect {
    let zoom = sanitize_factor(zoom);
    Rect::new(
        page_origin.0 + rect.left * zoom,
        page_origin.1 + rect.top * zoom,
        rect.width * zoom,
        rect.height * zoom,
    )
}

/// Union of highlight rects in page-local units, ignoring page numbers.
pub fn highlight_bounds(rects: &[HighlightRect]) -> Option<Rect> {
    let plain: Vec<Rect> =
        rects.iter().map(|r| Rect::new(r.left, r.top, r.width, r.height)).collect();
    bounding_box(&plain)
}

fn sanitize_factor(factor: f64) -> f64 {
    if factor.is_finite() && factor > 0.0 {
        factor
    } else {
        1.0
    }
}
