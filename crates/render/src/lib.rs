//! PDF Viewer Render Library
//!
//! Adaptive raster pipeline on top of an external document engine.
//!
//! Every page renders a base surface at `device_pixel_ratio * zoom`, clamped
//! to [`RasterLimits`]. When clamping cost resolution, a detail surface covers
//! the visible region of the page at elevated scale and is layered over the
//! base surface.

mod engine;
mod error;
mod limits;
mod pipeline;
mod surface;

pub use engine::{
    DocumentEngine, PageHandle, PageViewport, RenderPoll, RenderRequest, RenderTask, SurfaceKind,
    TextContent, TextItem,
};
pub use error::{EngineError, RenderError, RenderResult};
pub use limits::{ClampedScale, RasterLimits, MAX_SURFACE_DIMENSION, MAX_SURFACE_PIXELS};
pub use pipeline::{DetailPlan, PageRaster, RasterInputs, RasterPlan, RenderStats, DETAIL_SCALE_FACTOR};
pub use surface::{RasterTileState, RenderedFrame, TilePlacement};
