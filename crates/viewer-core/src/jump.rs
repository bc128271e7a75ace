//! Scroll targets for bringing highlight rects into view

use doc_model::HighlightRect;
use pdf_viewer_geometry::{bounding_box, Rect};

use crate::layout::ViewportState;

/// Units the rects passed to [`jump_offset`] are expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JumpUnit {
    /// Unscaled page-local units, as stored in annotations
    #[default]
    Page,
    /// Client pixels relative to the page container
    Client,
}

/// Where in the viewport the target lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JumpAlign {
    #[default]
    Start,
    Center,
    End,
}

/// Scroll offset that brings the union of `rects` to `align`, shifted by
/// `offset` pixels, clamped to the scrollable range.
///
/// Returns `None` if no rect is on a known page.
pub fn jump_offset(
    state: &ViewportState,
    rects: &[HighlightRect],
    unit: JumpUnit,
    align: JumpAlign,
    offset: f64,
) -> Option<f64> {
    let zoom = state.transform().effective_zoom();
    let scale = match unit {
        JumpUnit::Page => zoom,
        JumpUnit::Client => 1.0,
    };

    let content_rects: Vec<Rect> = rects
        .iter()
        .filter_map(|rect| {
            let page_top = state.page_top(rect.page_number)?;
            Some(Rect::new(
                rect.left * scale,
                page_top + rect.top * scale,
                rect.width * scale,
                rect.height * scale,
            ))
        })
        .collect();
    let target = bounding_box(&content_rects)?;

    let anchor = match align {
        JumpAlign::Start => target.top,
        JumpAlign::Center => target.center_y() - state.viewport_height / 2.0,
        JumpAlign::End => target.bottom() - state.viewport_height,
    };

    Some(state.clamp_scroll_top(anchor - offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::PageSize;

    fn state() -> ViewportState {
        ViewportState {
            zoom: 2.0,
            viewport_height: 800.0,
            page_sizes: vec![PageSize::new(600.0, 800.0); 4],
            page_gap: 10.0,
            ..ViewportState::default()
        }
    }

    #[test]
    fn start_alignment_scales_page_units() {
        let rects = [HighlightRect::new(2, 0.0, 100.0, 50.0, 20.0)];
        // Page 2 starts at 1610; rect top 200 client px into it.
        assert_eq!(jump_offset(&state(), &rects, JumpUnit::Page, JumpAlign::Start, 0.0), Some(1810.0));
        assert_eq!(jump_offset(&state(), &rects, JumpUnit::Page, JumpAlign::Start, 50.0), Some(1760.0));
    }

    #[test]
    fn client_units_are_not_rescaled() {
        let rects = [HighlightRect::new(2, 0.0, 100.0, 50.0, 20.0)];
        assert_eq!(jump_offset(&state(), &rects, JumpUnit::Client, JumpAlign::Start, 0.0), Some(1710.0));
    }

    #[test]
    fn center_and_end_alignment() {
        let rects = [
            HighlightRect::new(3, 0.0, 100.0, 50.0, 20.0),
            HighlightRect::new(3, 0.0, 300.0, 50.0, 20.0),
        ];
        // Union spans 3420..3860 in content space.
        assert_eq!(jump_offset(&state(), &rects, JumpUnit::Page, JumpAlign::Center, 0.0), Some(3240.0));
        assert_eq!(jump_offset(&state(), &rects, JumpUnit::Page, JumpAlign::End, 0.0), Some(3060.0));
    }

    #[test]
    fn result_is_clamped() {
        let first = [HighlightRect::new(1, 0.0, 5.0, 50.0, 20.0)];
        assert_eq!(jump_offset(&state(), &first, JumpUnit::Page, JumpAlign::Start, 100.0), Some(0.0));

        let unknown = [HighlightRect::new(9, 0.0, 5.0, 50.0, 20.0)];
        assert_eq!(jump_offset(&state(), &unknown, JumpUnit::Page, JumpAlign::Start, 0.0), None);
        assert_eq!(jump_offset(&state(), &[], JumpUnit::Page, JumpAlign::Start, 0.0), None);
    }
}
