//! Raster surface state and rendered frames

use crate::engine::SurfaceKind;
use pdf_viewer_geometry::Rect;

/// Size and scale of one raster surface of a page
///
/// A hidden surface has zero dimensions and no visible region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterTileState {
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub effective_scale: f64,
    /// Region covered, in page-local units. `None` for the base surface.
    pub visible_region: Option<Rect>,
}

impl RasterTileState {
    pub fn hidden() -> Self {
        Self { pixel_width: 0, pixel_height: 0, effective_scale: 0.0, visible_region: None }
    }

    pub fn is_visible(&self) -> bool {
        self.pixel_width > 0 && self.pixel_height > 0
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.pixel_width) * u64::from(self.pixel_height)
    }
}

impl Default for RasterTileState {
    fn default() -> Self {
        Self::hidden()
    }
}

/// Where a detail surface is displayed within the page layer, in client units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePlacement {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl TilePlacement {
    /// Placement of a page-local `region` at `zoom`.
    pub fn from_region(region: &Rect, zoom: f64) -> Self {
        Self {
            left: region.left * zoom,
            top: region.top * zoom,
            width: region.width * zoom,
            height: region.height * zoom,
        }
    }
}

/// Rendered raster data
///
/// Contains the raw RGBA pixel data produced by the document engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFrame {
    pub surface: SurfaceKind,

    /// Pixel data in RGBA format (4 bytes per pixel)
    pub pixels: Vec<u8>,

    pub width: u32,
    pub height: u32,

    /// Raster pixels per page unit
    pub scale: f64,
}

impl RenderedFrame {
    /// Get the size of the pixel data in bytes
    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }

    /// Check if the frame is fully opaque
    pub fn is_opaque(&self) -> bool {
        self.pixels.chunks_exact(4).all(|rgba| rgba[3] == 255)
    }

    pub fn matches(&self, state: &RasterTileState) -> bool {
        self.width == state.pixel_width && self.height == state.pixel_height
    }
}
