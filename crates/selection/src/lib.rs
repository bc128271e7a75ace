//! Text selection for the PDF viewer
//!
//! Tracks one logical selection across independently mounted page text
//! containers and extracts it into page-local highlight geometry.
//!
//! # Example
//!
//! ```
//! use pdf_viewer_geometry::{ConsolidationConfig, Rect, ScriptHeuristic};
//! use pdf_viewer_selection::{extract_selection, PageBounds, RawFragment, SelectionSnapshot};
//!
//! let pages = vec![PageBounds { page_number: 1, bounds: Rect::new(0.0, 0.0, 600.0, 800.0) }];
//! let snapshot = SelectionSnapshot {
//!     fragments: vec![RawFragment::new(Rect::new(10.0, 10.0, 80.0, 14.0), "selected")],
//!     text: "selected".into(),
//!     is_collapsed: false,
//! };
//!
//! let selection = extract_selection(
//!     &snapshot,
//!     &pages,
//!     1.0,
//!     &ConsolidationConfig::default(),
//!     &ScriptHeuristic::default(),
//! )
//! .unwrap();
//! assert_eq!(selection.highlights.len(), 1);
//! ```

mod extract;
mod host;
mod registry;
mod sync;

pub use extract::{
    extract_selection, ExtractedSelection, PageBounds, PageResolver, RawFragment, SelectionSnapshot,
};
pub use host::{
    BoundaryPoint, ContainerId, MarkerId, MarkerSide, NodeId, SelectionHost, SelectionRange,
};
pub use registry::{ContainerRegistry, RegistryEntry};
pub use sync::{ContainerState, MarkerPlacement, SelectionEvent, SelectionSync, SweepReport};
