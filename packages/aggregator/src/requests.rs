//! Registry of in-flight page requests.
//!
//! Each request gets a [`RequestHandle`] carrying a cancellation flag. The
//! pager races the network call against [`RequestHandle::cancelled`], so
//! cancelling only stops a request that has not resolved yet; processing
//! already under way is never interrupted.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Identifier of a registered request, unique for the registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// A cancellable handle for one outstanding request.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    id: RequestId,
    state: Arc<CancelState>,
}

impl RequestHandle {
    /// The request's identifier.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// Flags the request as cancelled and wakes anyone waiting on it.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the request is cancelled.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent cancel
            // cannot slip between the check and the wait.
            let notified = self.state.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Result of removing a request from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The id was not registered (already removed or cancelled by a clear).
    NotFound,
    /// Removed; other requests are still outstanding.
    Removed,
    /// Removed and no requests remain.
    Drained,
}

/// The set of outstanding requests.
#[derive(Debug, Default)]
pub struct RequestRegistry {
    next_id: u64,
    in_flight: BTreeMap<RequestId, RequestHandle>,
}

impl RequestRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new request and returns its handle.
    pub fn register(&mut self) -> RequestHandle {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        let handle = RequestHandle {
            id,
            state: Arc::new(CancelState::default()),
        };
        self.in_flight.insert(id, handle.clone());
        handle
    }

    /// Removes a completed request.
    pub fn remove(&mut self, id: RequestId) -> Removal {
        if self.in_flight.remove(&id).is_none() {
            return Removal::NotFound;
        }
        if self.in_flight.is_empty() {
            Removal::Drained
        } else {
            Removal::Removed
        }
    }

    /// Cancels and drops every outstanding request, returning how many
    /// there were.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.in_flight.len();
        for handle in std::mem::take(&mut self.in_flight).into_values() {
            handle.cancel();
        }
        count
    }

    /// Number of outstanding requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether nothing is outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}
