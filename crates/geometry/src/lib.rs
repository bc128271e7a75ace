//! Highlight geometry for the PDF viewer
//!
//! Converts client-space selection fragments into page-local rectangles and
//! consolidates them into the minimal set of highlight and underline rects.
//!
//! # Example
//!
//! ```
//! use doc_model::HighlightRect;
//! use pdf_viewer_geometry::{consolidate, ConsolidationConfig};
//!
//! let rects = vec![
//!     HighlightRect::new(1, 0.0, 0.0, 50.0, 10.0),
//!     HighlightRect::new(1, 52.0, 0.0, 30.0, 10.0),
//! ];
//! let merged = consolidate(&rects, &ConsolidationConfig::default());
//! assert_eq!(merged, vec![HighlightRect::new(1, 0.0, 0.0, 82.0, 10.0)]);
//! ```

mod consolidate;
mod coords;
mod rect;
mod script;
mod underline;

pub use consolidate::{
    consolidate, consolidate_selection, horizontally_adjacent, is_noise, merge_connected,
    overlaps, touches, Consolidated, ConsolidationConfig, MERGE_THRESHOLD,
};
pub use coords::{client_to_page, highlight_bounds, page_to_client, ViewTransform};
pub use rect::{bounding_box, Rect};
pub use script::{ScriptHeuristic, ScriptProbe};
pub use underline::{build_underlines, group_lines, merge_line_runs, synthesize_underlines};
