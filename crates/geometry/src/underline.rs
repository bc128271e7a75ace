//! Line-grouped merge for underline segments

use crate::consolidate::ConsolidationConfig;
use doc_model::HighlightRect;

/// Cluster rects into text lines by vertical-center proximity.
///
/// A rect joins the first line on its page whose anchor (the center of the
/// line's first rect) is within `tolerance`; otherwise it starts a new line.
/// Horizontal position plays no part.
pub fn group_lines(rects: &[HighlightRect], tolerance: f64) -> Vec<Vec<HighlightRect>> {
    let mut ordered = rects.to_vec();
    ordered.sort_by_key(|rect| rect.page_number);

    let mut lines: Vec<(u32, f64, Vec<HighlightRect>)> = Vec::new();
    for rect in ordered {
        let center = rect.center_y();
        let existing = lines.iter_mut().find(|(page, anchor, _)| {
            *page == rect.page_number && (center - *anchor).abs() <= tolerance
        });

        match existing {
            Some((_, _, members)) => members.push(rect),
            None => lines.push((rect.page_number, center, vec![rect])),
        }
    }

    lines.into_iter().map(|(_, _, members)| members).collect()
}

/// Merge underline candidates into one segment per run of close rects.
///
/// Within a line, rects are walked left to right; a rect extends the current
/// run when its gap to the run's right edge is at most
/// `max(merge_threshold, gap_height_ratio * previous.height)`. Each run becomes
/// a segment of `underline_thickness` at the run's first rect top.
pub fn merge_line_runs(rects: &[HighlightRect], config: &ConsolidationConfig) -> Vec<HighlightRect> {
    let mut segments = Vec::new();

    for mut line in group_lines(rects, config.line_tolerance) {
        line.sort_by(|a, b| a.left.total_cmp(&b.left));
        let Some(&head) = line.first() else {
            continue;
        };

        let mut run_start = head;
        let mut run_right = head.right();
        let mut previous = head;

        for rect in line.iter().skip(1) {
            let allowed = config.merge_threshold.max(config.gap_height_ratio * previous.height);
            if rect.left - run_right <= allowed {
                run_right = run_right.max(rect.right());
            } else {
                segments.push(segment(&run_start, run_right, config.underline_thickness));
                run_start = *rect;
                run_right = rect.right();
            }
            previous = *rect;
        }

        segments.push(segment(&run_start, run_right, config.underline_thickness));
    }

    segments
}

/// Underlines derived straight from highlight boxes, placed at
/// `baseline_ratio` of each box's height.
pub fn synthesize_underlines(
    highlights: &[HighlightRect],
    config: &ConsolidationConfig,
) -> Vec<HighlightRect> {
    highlights
        .iter()
        .map(|rect| {
            HighlightRect::new(
                rect.page_number,
                rect.left,
                rect.top + rect.height * config.baseline_ratio,
                rect.width,
                config.underline_thickness,
            )
        })
        .collect()
}

/// Underline set for a selection.
///
/// Falls back to [`synthesize_underlines`] when line grouping finds nothing
/// but highlights exist, so every highlight keeps a visible underline.
pub fn build_underlines(
    candidates: &[HighlightRect],
    highlights: &[HighlightRect],
    config: &ConsolidationConfig,
) -> Vec<HighlightRect> {
    let segments = merge_line_runs(candidates, config);
    if segments.is_empty() && !highlights.is_empty() {
        log::debug!("no baseline underline segments, synthesizing from {} highlights", highlights.len());
        return synthesize_underlines(highlights, config);
    }
    segments
}

fn segment(first: &HighlightRect, right: f64, thickness: f64) -> HighlightRect {
    HighlightRect::new(first.page_number, first.left, first.top, right - first.left, thickness)
}
