//! Raster surface size limits
//!
//! Hosts refuse raster surfaces past a total pixel count or a per-dimension
//! size. Scales are clamped so the base surface always fits, and the detail
//! surface makes up the lost resolution for the visible region.

use serde::{Deserialize, Serialize};

/// Maximum number of pixels of one raster surface
pub const MAX_SURFACE_PIXELS: u64 = 16_777_216;

/// Maximum width or height of one raster surface
pub const MAX_SURFACE_DIMENSION: u32 = 32_767;

/// Pixel limits for a raster surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterLimits {
    pub max_pixels: u64,
    pub max_dimension: u32,
}

impl Default for RasterLimits {
    fn default() -> Self {
        Self { max_pixels: MAX_SURFACE_PIXELS, max_dimension: MAX_SURFACE_DIMENSION }
    }
}

/// Result of clamping a requested scale for a surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampedScale {
    pub requested: f64,
    pub scale: f64,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

impl ClampedScale {
    pub fn is_clamped(&self) -> bool {
        self.scale < self.requested
    }
}

impl RasterLimits {
    pub fn new(max_pixels: u64, max_dimension: u32) -> Self {
        Self { max_pixels, max_dimension }
    }

    /// Clamp `scale` so a `width` x `height` (unscaled) surface fits.
    ///
    /// The clamped scale is `scale * min(1, sqrt(A / (w*h)), D / w, D / h)`
    /// with `w` and `h` the requested pixel size. Pixel dimensions are
    /// floored, so they never exceed either limit.
    ///
    /// ```
    /// use pdf_viewer_render::RasterLimits;
    ///
    /// let clamped = RasterLimits::default().clamp_scale(1000.0, 1000.0, 6.0);
    /// assert!((clamped.scale - 4.096).abs() < 1e-9);
    /// ```
    pub fn clamp_scale(&self, width: f64, height: f64, scale: f64) -> ClampedScale {
        let requested = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return ClampedScale { requested, scale: requested, pixel_width: 0, pixel_height: 0 };
        }

        let max_pixels = self.max_pixels as f64;
        let max_dimension = f64::from(self.max_dimension);
        let scaled_width = width * requested;
        let scaled_height = height * requested;

        let factor = 1.0_f64
            .min((max_pixels / (scaled_width * scaled_height)).sqrt())
            .min(max_dimension / scaled_width)
            .min(max_dimension / scaled_height);

        let mut clamped = requested * factor;
        // Rounding in sqrt can leave the product a hair above the limit.
        while clamped > 0.0
            && (width * clamped * height * clamped > max_pixels
                || width * clamped > max_dimension
                || height * clamped > max_dimension)
        {
            clamped = f64::from_bits(clamped.to_bits() - 1);
        }

        ClampedScale {
            requested,
            scale: clamped,
            pixel_width: (width * clamped).floor() as u32,
            pixel_height: (height * clamped).floor() as u32,
        }
    }
}
