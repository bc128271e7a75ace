//! Superscript and subscript detection
//!
//! Footnote markers and exponents sit off the baseline of their line, so an
//! underline built from them would float above or below the text.

use crate::rect::Rect;

/// Rendered text run to classify, with the box of its parent line element.
#[derive(Debug, Clone, Copy)]
pub struct ScriptProbe<'a> {
    pub rect: Rect,
    pub text: &'a str,
    pub parent: Rect,
}

/// Thresholds for classifying a run as super- or subscript (client pixels).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptHeuristic {
    pub max_height: f64,
    pub max_width: f64,
    pub max_chars: usize,
    /// Minimum center offset from the parent, as a fraction of parent height
    pub center_offset_ratio: f64,
}

impl Default for ScriptHeuristic {
    fn default() -> Self {
        Self { max_height: 6.0, max_width: 15.0, max_chars: 2, center_offset_ratio: 0.4 }
    }
}

impl ScriptHeuristic {
    pub fn is_script(&self, probe: &ScriptProbe<'_>) -> bool {
        if probe.rect.height >= self.max_height || probe.rect.width >= self.max_width {
            return false;
        }

        let text = probe.text.trim();
        let chars = text.chars().count();
        if chars == 0 || chars > self.max_chars || !text.chars().all(char::is_alphanumeric) {
            return false;
        }

        if probe.parent.height <= 0.0 {
            return false;
        }
        let offset = (probe.rect.center_y() - probe.parent.center_y()).abs();
        offset > probe.parent.height * self.center_offset_ratio
    }
}
