//! Selection extraction
//!
//! Turns the client-space fragments of a committed selection into
//! consolidated page-local highlight and underline rects.

use doc_model::HighlightRect;
use pdf_viewer_geometry::{
    client_to_page, consolidate_selection, is_noise, ConsolidationConfig, Rect, ScriptHeuristic,
    ScriptProbe,
};

/// One client rect of the current selection, as reported by the host
#[derive(Debug, Clone, PartialEq)]
pub struct RawFragment {
    pub client_rect: Rect,
    pub text: String,
    /// Client y of the text baseline, when the host knows it
    pub baseline: Option<f64>,
    /// Client rect of the line element holding this run
    pub parent_rect: Option<Rect>,
}

impl RawFragment {
    pub fn new(client_rect: Rect, text: impl Into<String>) -> Self {
        Self { client_rect, text: text.into(), baseline: None, parent_rect: None }
    }

    pub fn with_baseline(mut self, baseline: f64) -> Self {
        self.baseline = Some(baseline);
        self
    }

    pub fn with_parent(mut self, parent_rect: Rect) -> Self {
        self.parent_rect = Some(parent_rect);
        self
    }
}

/// Everything the host reports about its current selection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSnapshot {
    pub fragments: Vec<RawFragment>,
    pub text: String,
    pub is_collapsed: bool,
}

/// Client bounds of one mounted page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBounds {
    pub page_number: u32,
    pub bounds: Rect,
}

/// Resolves which page a client point falls on
pub trait PageResolver {
    fn page_at(&self, x: f64, y: f64) -> Option<PageBounds>;
}

impl PageResolver for [PageBounds] {
    fn page_at(&self, x: f64, y: f64) -> Option<PageBounds> {
        self.iter().find(|page| page.bounds.contains_point(x, y)).copied()
    }
}

impl PageResolver for Vec<PageBounds> {
    fn page_at(&self, x: f64, y: f64) -> Option<PageBounds> {
        self.as_slice().page_at(x, y)
    }
}

/// Consolidated selection ready to become an annotation
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSelection {
    pub highlights: Vec<HighlightRect>,
    pub underlines: Vec<HighlightRect>,
    pub text: String,
    pub is_collapsed: bool,
}

/// Extract page-local geometry from a selection snapshot.
///
/// Returns `None` for a collapsed selection, or when no fragment survives
/// noise filtering and page resolution.
pub fn extract_selection(
    snapshot: &SelectionSnapshot,
    pages: &dyn PageResolver,
    zoom: f64,
    config: &ConsolidationConfig,
    script: &ScriptHeuristic,
) -> Option<ExtractedSelection> {
    if snapshot.is_collapsed || snapshot.fragments.is_empty() {
        return None;
    }

    let mut highlight_candidates = Vec::with_capacity(snapshot.fragments.len());
    let mut underline_candidates = Vec::new();

    for fragment in &snapshot.fragments {
        let client = &fragment.client_rect;
        if is_noise(client, config.min_fragment_size) {
            continue;
        }

        let Some(page) = pages.page_at(client.center_x(), client.center_y()) else {
            log::debug!("selection fragment at ({}, {}) is not on a mounted page", client.left, client.top);
            continue;
        };

        highlight_candidates.push(client_to_page(client, &page.bounds, zoom, page.page_number));

        let Some(baseline) = fragment.baseline else {
            continue;
        };
        let raised = fragment.parent_rect.is_some_and(|parent| {
            script.is_script(&ScriptProbe { rect: *client, text: &fragment.text, parent })
        });
        if !raised {
            let run = Rect::new(client.left, baseline, client.width, client.height);
            underline_candidates.push(client_to_page(&run, &page.bounds, zoom, page.page_number));
        }
    }

    if highlight_candidates.is_empty() {
        return None;
    }

    let consolidated = consolidate_selection(&highlight_candidates, &underline_candidates, config);
    if consolidated.highlights.is_empty() {
        return None;
    }

    Some(ExtractedSelection {
        highlights: consolidated.highlights,
        underlines: consolidated.underlines,
        text: snapshot.text.clone(),
        is_collapsed: false,
    })
}
