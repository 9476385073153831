//! Lifecycle notifications.
//!
//! Observers subscribe to a broadcast channel. Slow receivers that fall more
//! than the channel capacity behind see `RecvError::Lagged` and skip ahead.

use tokio::sync::broadcast;

/// Buffered notifications per receiver.
const CHANNEL_CAPACITY: usize = 256;

/// A lifecycle event emitted by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A page was classified and its markers submitted.
    Update {
        /// 1-based page number within its search.
        page: u32,
    },
    /// A search finished, successfully or after an error.
    UpdateEnd,
    /// A page request failed.
    Error {
        /// Description of the failure.
        message: String,
    },
    /// All results were discarded.
    Clear,
}

/// Sends [`Notification`]s to every subscriber.
#[derive(Debug)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    /// Creates a notifier with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tx: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    /// Registers a new subscriber.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Emits `notification`. Having no subscribers is not an error.
    pub fn emit(&self, notification: Notification) {
        log::trace!("notify: {notification:?}");
        let _ = self.tx.send(notification);
    }

    /// Emits an error followed by the end of the search it terminated.
    pub fn error(&self, message: String) {
        self.emit(Notification::Error { message });
        self.emit(Notification::UpdateEnd);
    }
}
