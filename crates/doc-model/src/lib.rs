//! Annotation data model shared by the viewer crates.
//!
//! All highlight geometry is stored in unzoomed page-local units so that a
//! stored annotation stays valid across zoom and device pixel ratio changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque annotation identifier.
///
/// Serialized as a plain string. Fresh ids are UUID v4.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(pub String);

impl AnnotationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AnnotationId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rectangle in unscaled page-local units, tagged with its 1-based page.
///
/// Width and height are never negative, including after deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredRect")]
pub struct HighlightRect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
    pub page_number: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRect {
    top: f64,
    left: f64,
    width: f64,
    height: f64,
    page_number: u32,
}

impl From<StoredRect> for HighlightRect {
    fn from(stored: StoredRect) -> Self {
        Self::new(stored.page_number, stored.left, stored.top, stored.width, stored.height)
    }
}

impl HighlightRect {
    pub fn new(page_number: u32, left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { top, left, width: width.max(0.0), height: height.max(0.0), page_number }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }

    /// True if `other` lies fully inside this rect, allowing `epsilon` slack.
    pub fn contains(&self, other: &HighlightRect, epsilon: f64) -> bool {
        self.page_number == other.page_number
            && other.left >= self.left - epsilon
            && other.top >= self.top - epsilon
            && other.right() <= self.right() + epsilon
            && other.bottom() <= self.bottom() + epsilon
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right() && y >= self.top && y <= self.bottom()
    }
}

pub const DEFAULT_HIGHLIGHT_COLOR: &str = "rgba(255, 226, 143, 0.6)";
pub const DEFAULT_BORDER_COLOR: &str = "rgba(230, 180, 40, 1)";

/// A persisted highlight or comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: AnnotationId,
    pub page_number: u32,
    pub highlights: Vec<HighlightRect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underlines: Option<Vec<HighlightRect>>,
    pub color: String,
    pub border_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_comment_pending: Option<bool>,
}

impl Annotation {
    /// Create a highlight annotation with a generated id.
    ///
    /// The page number is taken from the first highlight rect.
    pub fn new(highlights: Vec<HighlightRect>, underlines: Vec<HighlightRect>) -> Self {
        let now = Utc::now();
        let page_number = highlights.first().map(|rect| rect.page_number).unwrap_or(1);

        Self {
            id: AnnotationId::generate(),
            page_number,
            highlights,
            underlines: if underlines.is_empty() { None } else { Some(underlines) },
            color: DEFAULT_HIGHLIGHT_COLOR.to_owned(),
            border_color: DEFAULT_BORDER_COLOR.to_owned(),
            comment: None,
            created_at: now,
            updated_at: now,
            metadata: None,
            is_comment_pending: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<AnnotationId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_colors(mut self, color: impl Into<String>, border_color: impl Into<String>) -> Self {
        self.color = color.into();
        self.border_color = border_color.into();
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn is_comment_pending(&self) -> bool {
        self.is_comment_pending.unwrap_or(false)
    }

    pub fn has_comment(&self) -> bool {
        self.comment.as_deref().is_some_and(|comment| !comment.trim().is_empty())
    }

    /// Update the modified timestamp to now
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Apply a partial update, bumping `updated_at`.
    ///
    /// Attaching a non-empty comment clears the comment-pending flag.
    pub fn apply(&mut self, patch: AnnotationPatch) {
        if let Some(highlights) = patch.highlights {
            if let Some(first) = highlights.first() {
                self.page_number = first.page_number;
            }
            self.highlights = highlights;
        }
        if let Some(underlines) = patch.underlines {
            self.underlines = underlines;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(border_color) = patch.border_color {
            self.border_color = border_color;
        }
        if let Some(comment) = patch.comment {
            self.comment = comment;
            if self.has_comment() {
                self.is_comment_pending = None;
            }
        }
        if let Some(metadata) = patch.metadata {
            self.metadata = metadata;
        }
        if let Some(pending) = patch.is_comment_pending {
            self.is_comment_pending = pending;
        }
        self.touch();
    }
}

impl From<String> for AnnotationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Partial annotation record used by `update_annotation`.
///
/// Double options distinguish "leave unchanged" (`None`) from "clear"
/// (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationPatch {
    pub highlights: Option<Vec<HighlightRect>>,
    pub underlines: Option<Option<Vec<HighlightRect>>>,
    pub color: Option<String>,
    pub border_color: Option<String>,
    pub comment: Option<Option<String>>,
    pub metadata: Option<Option<BTreeMap<String, serde_json::Value>>>,
    pub is_comment_pending: Option<Option<bool>>,
}

impl AnnotationPatch {
    pub fn comment(comment: impl Into<String>) -> Self {
        Self { comment: Some(Some(comment.into())), ..Self::default() }
    }

    pub fn color(color: impl Into<String>) -> Self {
        Self { color: Some(color.into()), ..Self::default() }
    }
}
