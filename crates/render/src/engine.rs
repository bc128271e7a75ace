//! Document engine collaborator
//!
//! The viewer never parses documents. Everything it needs from a document
//! goes through these traits: page sizes, text runs, and cancellable raster
//! renders that are polled rather than awaited.

use crate::error::EngineError;
use crate::surface::RenderedFrame;
use pdf_viewer_geometry::Rect;
use pdf_viewer_scheduler::CancellationToken;

/// Which raster surface of a page a render targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// Whole page at the (possibly clamped) base scale
    Base,
    /// Visible region at elevated resolution
    Detail,
}

impl SurfaceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Detail => "detail",
        }
    }
}

/// Page size at a given scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageViewport {
    pub width: f64,
    pub height: f64,
    pub scale: f64,
}

/// Parameters of one raster operation
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub page_number: u32,
    pub surface: SurfaceKind,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub scale: f64,
    /// Translation applied before drawing, in raster pixels
    pub offset: (f64, f64),
    pub token: CancellationToken,
}

/// Outcome of polling a render task
#[derive(Debug)]
pub enum RenderPoll {
    Pending,
    Ready(Result<RenderedFrame, EngineError>),
}

/// In-flight raster operation
///
/// After [`RenderTask::cancel`] the task must still settle; it either
/// resolves with [`EngineError::Cancelled`] or with a frame the caller will
/// discard.
pub trait RenderTask {
    fn cancel(&mut self);
    fn poll(&mut self) -> RenderPoll;
}

/// One positioned run of text in page-local units
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub text: String,
    pub rect: Rect,
}

/// Text runs of a page in reading order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextContent {
    pub items: Vec<TextItem>,
}

impl TextContent {
    /// Plain text of the page, one run per line.
    pub fn plain_text(&self) -> String {
        self.items.iter().map(|item| item.text.as_str()).collect::<Vec<_>>().join("\n")
    }
}

pub trait PageHandle {
    fn page_number(&self) -> u32;
    fn viewport(&self, scale: f64) -> PageViewport;
    fn render(&self, request: RenderRequest) -> Box<dyn RenderTask>;
    fn text_content(&self) -> Result<TextContent, EngineError>;
}

pub trait DocumentEngine {
    fn page_count(&self) -> u32;

    /// Open page `page_number` (1-based).
    fn page(&self, page_number: u32) -> Result<Box<dyn PageHandle>, EngineError>;
}
