//! Timer-coalescing debounce
//!
//! The debouncer never owns a timer. Callers report triggers and poll with an
//! explicit `Instant`, which keeps zoom and scroll recomputation decoupled
//! from rendering and deterministic under test.

use std::time::{Duration, Instant};

/// Which edge of a burst fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceEdge {
    /// Fire on the first trigger of a burst
    Leading,
    /// Fire once the burst has been quiet for the whole window
    Trailing,
    /// Fire on the first trigger, and again after the burst if it continued
    Both,
}

impl DebounceEdge {
    fn leading(self) -> bool {
        matches!(self, Self::Leading | Self::Both)
    }

    fn trailing(self) -> bool {
        matches!(self, Self::Trailing | Self::Both)
    }
}

/// Coalesces bursts of triggers into single firings
///
/// # Example
///
/// ```
/// use pdf_viewer_scheduler::Debouncer;
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let mut zoom = Debouncer::trailing(Duration::from_millis(150));
///
/// zoom.trigger(start);
/// zoom.trigger(start + Duration::from_millis(100));
/// assert!(!zoom.poll(start + Duration::from_millis(200)));
/// assert!(zoom.poll(start + Duration::from_millis(250)));
/// ```
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    edge: DebounceEdge,
    deadline: Option<Instant>,
    trailing_pending: bool,
}

impl Debouncer {
    pub fn new(window: Duration, edge: DebounceEdge) -> Self {
        Self { window, edge, deadline: None, trailing_pending: false }
    }

    pub fn trailing(window: Duration) -> Self {
        Self::new(window, DebounceEdge::Trailing)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn set_window(&mut self, window: Duration) {
        self.window = window;
    }

    /// Record a trigger at `now`, extending the quiet window.
    ///
    /// Returns `true` if the leading edge fires.
    pub fn trigger(&mut self, now: Instant) -> bool {
        // An elapsed window that was never polled still ends the burst.
        let idle = self.deadline.map_or(true, |deadline| now >= deadline);
        self.deadline = Some(now + self.window);

        if idle && self.edge.leading() {
            self.trailing_pending = false;
            return true;
        }

        self.trailing_pending = self.edge.trailing();
        false
    }

    /// Returns `true` once when the trailing edge fires at or after the
    /// deadline.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                std::mem::take(&mut self.trailing_pending)
            }
            _ => false,
        }
    }

    /// Drop any pending firing.
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.trailing_pending = false;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn trailing_fires_once_after_quiet_window() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::trailing(ms(20));

        assert!(!debouncer.trigger(t0));
        assert!(!debouncer.trigger(t0 + ms(10)));
        assert!(!debouncer.poll(t0 + ms(25)));
        assert!(debouncer.poll(t0 + ms(30)));
        assert!(!debouncer.poll(t0 + ms(60)));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn leading_fires_immediately_and_suppresses_burst() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(ms(100), DebounceEdge::Leading);

        assert!(debouncer.trigger(t0));
        assert!(!debouncer.trigger(t0 + ms(50)));
        assert!(!debouncer.poll(t0 + ms(200)));

        // A new burst fires again
        assert!(debouncer.trigger(t0 + ms(300)));
    }

    #[test]
    fn both_edges_fire_trailing_only_for_continued_bursts() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(ms(100), DebounceEdge::Both);

        assert!(debouncer.trigger(t0));
        assert!(!debouncer.poll(t0 + ms(150)));

        assert!(debouncer.trigger(t0 + ms(200)));
        assert!(!debouncer.trigger(t0 + ms(250)));
        assert!(debouncer.poll(t0 + ms(350)));
    }

    #[test]
    fn expired_window_without_poll_starts_new_burst() {
        let t0 = Instant::now();
        let mut leading = Debouncer::new(ms(100), DebounceEdge::Leading);

        assert!(leading.trigger(t0));
        assert!(leading.trigger(t0 + ms(150)));
        assert!(!leading.trigger(t0 + ms(200)));

        let mut trailing = Debouncer::trailing(ms(20));
        trailing.trigger(t0);
        assert!(!trailing.trigger(t0 + ms(50)));
        assert!(!trailing.poll(t0 + ms(60)));
        assert!(trailing.poll(t0 + ms(70)));
    }

    #[test]
    fn cancel_drops_pending_fire() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::trailing(ms(20));

        debouncer.trigger(t0);
        debouncer.cancel();
        assert!(!debouncer.poll(t0 + ms(40)));
    }
}
