//! Rect consolidation
//!
//! Collapses raw per-glyph-run rectangles into the smallest set of rects that
//! still covers the same highlight region. Rects on different pages are never
//! merged.

use crate::rect::Rect;
use crate::underline::build_underlines;
use doc_model::HighlightRect;

/// Maximum horizontal gap (page units) bridged between neighbouring rects.
pub const MERGE_THRESHOLD: f64 = 2.0;

/// Tunable constants for highlight and underline consolidation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsolidationConfig {
    /// Horizontal gap bridged when merging fills and underline runs
    pub merge_threshold: f64,

    /// Vertical-center distance under which two rects share a text line
    pub line_tolerance: f64,

    /// Underline runs also bridge gaps up to this fraction of the rect height
    pub gap_height_ratio: f64,

    /// Thickness of generated underline rects
    pub underline_thickness: f64,

    /// Fraction of a highlight's height where a synthesized underline sits
    pub baseline_ratio: f64,

    /// Client-space fragments smaller than this in either dimension are noise
    pub min_fragment_size: f64,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            merge_threshold: MERGE_THRESHOLD,
            line_tolerance: 3.0,
            gap_height_ratio: 0.3,
            underline_thickness: 1.5,
            baseline_ratio: 0.85,
            min_fragment_size: 2.0,
        }
    }
}

/// Consolidated output of one selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Consolidated {
    pub highlights: Vec<HighlightRect>,
    pub underlines: Vec<HighlightRect>,
}

/// True if the two rects share interior area.
pub fn overlaps(a: &HighlightRect, b: &HighlightRect) -> bool {
    a.left < b.right() && b.left < a.right() && vertically_overlapping(a, b)
}

/// True if the rects overlap vertically and the horizontal gap between them
/// is at most `threshold`.
pub fn horizontally_adjacent(a: &HighlightRect, b: &HighlightRect, threshold: f64) -> bool {
    vertically_overlapping(a, b) && horizontal_gap(a, b) <= threshold
}

/// Merge predicate of the connected-component strategy.
pub fn touches(a: &HighlightRect, b: &HighlightRect, threshold: f64) -> bool {
    a.page_number == b.page_number && (overlaps(a, b) || horizontally_adjacent(a, b, threshold))
}

/// True if a client-space fragment is too small or malformed to keep.
pub fn is_noise(rect: &Rect, min_size: f64) -> bool {
    !rect.is_finite() || rect.width < min_size || rect.height < min_size
}

/// Connected-component merge used for highlight fills.
///
/// Components are collapsed to their bounding boxes, and collapsing repeats
/// until no two output boxes touch. The result is therefore a fixed point:
/// feeding it back in returns it unchanged.
///
/// Output is ordered by page number, then by the input position of each
/// component's first member.
pub fn merge_connected(rects: &[HighlightRect], threshold: f64) -> Vec<HighlightRect> {
    let mut current = collapse_components(rects, threshold);
    loop {
        let next = collapse_components(&current, threshold);
        if next.len() == current.len() {
            return next;
        }
        current = next;
    }
}

/// Highlight consolidation with the default strategy and thresholds.
pub fn consolidate(rects: &[HighlightRect], config: &ConsolidationConfig) -> Vec<HighlightRect> {
    merge_connected(rects, config.merge_threshold)
}

/// Consolidate highlight fills and underline candidates of one selection.
///
/// Underline candidates carry the baseline as their `top` and the glyph run
/// height as their `height`.
pub fn consolidate_selection(
    highlight_candidates: &[HighlightRect],
    underline_candidates: &[HighlightRect],
    config: &ConsolidationConfig,
) -> Consolidated {
    let highlights = consolidate(highlight_candidates, config);
    let underlines = build_underlines(underline_candidates, &highlights, config);
    Consolidated { highlights, underlines }
}

fn vertically_overlapping(a: &HighlightRect, b: &HighlightRect) -> bool {
    a.top < b.bottom() && b.top < a.bottom()
}

/// Signed horizontal gap; negative when the rects overlap horizontally.
fn horizontal_gap(a: &HighlightRect, b: &HighlightRect) -> f64 {
    (b.left - a.right()).max(a.left - b.right())
}

fn collapse_components(rects: &[HighlightRect], threshold: f64) -> Vec<HighlightRect> {
    // Stable sort keeps discovery order within a page.
    let mut order: Vec<usize> = (0..rects.len()).collect();
    order.sort_by_key(|&index| rects[index].page_number);

    let mut visited = vec![false; rects.len()];
    let mut collapsed = Vec::new();

    for &seed in &order {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        let mut group = vec![seed];

        // A later rect may bridge two earlier ones, so keep sweeping until the
        // group stops growing.
        let mut grew = true;
        while grew {
            grew = false;
            for &candidate in &order {
                if visited[candidate] {
                    continue;
                }
                let joins = group
                    .iter()
                    .any(|&member| touches(&rects[member], &rects[candidate], threshold));
                if joins {
                    visited[candidate] = true;
                    group.push(candidate);
                    grew = true;
                }
            }
        }

        if let Some(bounds) = collapse_group(rects, &group) {
            collapsed.push(bounds);
        }
    }

    collapsed
}

fn collapse_group(rects: &[HighlightRect], group: &[usize]) -> Option<HighlightRect> {
    let first = rects[*group.first()?];
    if group.len() == 1 {
        return Some(first);
    }

    let (mut left, mut top, mut right, mut bottom) =
        (first.left, first.top, first.right(), first.bottom());
    for &index in &group[1..] {
        let rect = &rects[index];
        left = left.min(rect.left);
        top = top.min(rect.top);
        right = right.max(rect.right());
        bottom = bottom.max(rect.bottom());
    }

    Some(HighlightRect::new(first.page_number, left, top, right - left, bottom - top))
}
