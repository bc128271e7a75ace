//! Paginated document viewer core
//!
//! Ties the raster pipeline, cross-page selection, annotation store and
//! tooltip state together behind [`Viewer`]. Hosts supply a
//! [`pdf_viewer_render::DocumentEngine`], a
//! [`pdf_viewer_selection::SelectionHost`] and optionally a [`Positioner`]
//! and [`storage::AnnotationPersistence`] backend.

mod config;
mod jump;
mod layout;
mod store;
mod tooltip;
mod viewer;

pub use config::{ConfigError, ViewerConfig};
pub use jump::{jump_offset, JumpAlign, JumpUnit};
pub use layout::{current_page, visible_pages, PageSize, ViewportState};
pub use store::{AnnotationStore, ErrorCallback};
pub use tooltip::{
    reference_rect, Placement, PlacementConstraints, Positioner, Side, TooltipKind, TooltipMachine,
    HOVER_CLOSE_DELAY,
};
pub use viewer::{TickReport, Viewer, ViewerError};
