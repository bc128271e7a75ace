//! Cancellation for render operations
//!
//! Render operations are cancelled cooperatively: the issuer flips a shared
//! token and the document engine settles the operation with a "cancelled"
//! outcome the next time it checks. [`OperationSlots`] keeps at most one live
//! operation per key, so issuing a new operation for a surface always cancels
//! the one it replaces.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Shared cancellation flag for one operation
///
/// Clones observe the same state, so the engine can hold a clone while the
/// pipeline keeps the original.
///
/// # Example
///
/// ```
/// use pdf_viewer_scheduler::CancellationToken;
///
/// let token = CancellationToken::new();
/// let engine_side = token.clone();
///
/// token.cancel();
/// assert!(engine_side.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token in the non-cancelled state
    pub fn new() -> Self {
        Self { cancelled: Arc::new(AtomicBool::new(false)) }
    }

    /// Cancel this token and every clone of it. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Monotonic id of an issued operation
pub type OperationId = u64;

/// Handle returned when an operation is issued
#[derive(Debug, Clone)]
pub struct OperationTicket {
    pub id: OperationId,
    pub token: CancellationToken,
}

/// Latest-wins registry of live operations keyed by target
///
/// # Example
///
/// ```
/// use pdf_viewer_scheduler::OperationSlots;
///
/// let mut slots = OperationSlots::new();
/// let first = slots.issue("base");
/// let second = slots.issue("base");
///
/// assert!(first.token.is_cancelled());
/// assert!(slots.is_current(&"base", second.id));
/// assert!(!slots.is_current(&"base", first.id));
/// ```
#[derive(Debug)]
pub struct OperationSlots<K> {
    next_id: OperationId,
    live: HashMap<K, OperationTicket>,
}

impl<K: Eq + Hash + Clone> OperationSlots<K> {
    pub fn new() -> Self {
        Self { next_id: 1, live: HashMap::new() }
    }

    /// Issue a new operation for `key`, cancelling the previous one first.
    pub fn issue(&mut self, key: K) -> OperationTicket {
        if let Some(previous) = self.live.remove(&key) {
            previous.token.cancel();
            log::trace!("operation {} superseded by {}", previous.id, self.next_id);
        }

        let ticket = OperationTicket { id: self.next_id, token: CancellationToken::new() };
        self.next_id += 1;
        self.live.insert(key, ticket.clone());
        ticket
    }

    /// True if `id` is still the live operation for `key`.
    pub fn is_current(&self, key: &K, id: OperationId) -> bool {
        self.live.get(key).is_some_and(|ticket| ticket.id == id && !ticket.token.is_cancelled())
    }

    /// Release the slot once its operation settled.
    ///
    /// Returns `false` if `id` was already superseded or cancelled.
    pub fn settle(&mut self, key: &K, id: OperationId) -> bool {
        if self.is_current(key, id) {
            self.live.remove(key);
            true
        } else {
            false
        }
    }

    /// Cancel the live operation for `key`, if any.
    pub fn cancel(&mut self, key: &K) -> bool {
        match self.live.remove(key) {
            Some(ticket) => {
                ticket.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every live operation. Returns how many were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.live.len();
        for (_, ticket) in self.live.drain() {
            ticket.token.cancel();
        }
        count
    }

    pub fn is_live(&self, key: &K) -> bool {
        self.live.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for OperationSlots<K> {
    fn default() -> Self {
        Self::new()
    }
}
