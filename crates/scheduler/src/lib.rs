//! PDF Viewer Scheduler Library
//!
//! Cancellation and timing primitives shared by the render pipeline and the
//! viewer controller.
//!
//! Render work is issued per surface through [`OperationSlots`], which keeps
//! exactly one live operation per key and cancels the previous one whenever a
//! new one is issued. Zoom and scroll recomputation go through [`Debouncer`],
//! which is driven with explicit instants instead of owning a timer.
//!
//! # Example
//!
//! ```
//! use pdf_viewer_scheduler::{Debouncer, OperationSlots};
//! use std::time::{Duration, Instant};
//!
//! let mut slots = OperationSlots::new();
//! let stale = slots.issue(("page-1", "base"));
//! let fresh = slots.issue(("page-1", "base"));
//! assert!(stale.token.is_cancelled());
//! assert!(slots.settle(&("page-1", "base"), fresh.id));
//!
//! let start = Instant::now();
//! let mut scroll = Debouncer::trailing(Duration::from_millis(100));
//! scroll.trigger(start);
//! assert!(scroll.poll(start + Duration::from_millis(100)));
//! ```

mod cancel;
mod debounce;

// Re-export public API
pub use cancel::{CancellationToken, OperationId, OperationSlots, OperationTicket};
pub use debounce::{DebounceEdge, Debouncer};
