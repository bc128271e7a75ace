//! Render error types

use thiserror::Error;

/// Failure reported by the document engine for a single operation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The operation observed its cancellation token
    #[error("render operation cancelled")]
    Cancelled,

    #[error("page {0} is out of range")]
    PageOutOfRange(u32),

    #[error("text content unavailable for page {0}")]
    TextUnavailable(u32),

    #[error("render failed: {0}")]
    Failed(String),
}

impl EngineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors surfaced by the raster pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("page {page} {surface} render failed: {source}")]
    Engine { page: u32, surface: &'static str, source: EngineError },

    #[error("page {0} has an empty viewport")]
    EmptyViewport(u32),
}

/// Result type for raster pipeline operations
pub type RenderResult<T> = Result<T, RenderError>;
