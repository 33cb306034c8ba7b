//! SubscriberRegistry - membership set of connected stream subscribers

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info};

use super::subscriber::{Subscriber, SubscriberId};
use super::StateMessage;

/// Sending half of a registered subscriber, as seen by the broadcaster
#[derive(Clone)]
pub struct SubscriberHandle {
    id: SubscriberId,
    tx: Arc<watch::Sender<StateMessage>>,
}

impl SubscriberHandle {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Replace the subscriber's pending message with `message`
    ///
    /// Never blocks. Returns `false` if the receiving side is gone.
    pub fn deliver(&self, message: &StateMessage) -> bool {
        self.tx.send(Arc::clone(message)).is_ok()
    }
}

/// Tracks the currently connected subscribers
///
/// Membership changes take a short lock; fan-out works on a copy from
/// [`SubscriberRegistry::snapshot_subscribers`] so no lock is held while
/// delivering.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: Mutex<BTreeMap<SubscriberId, Arc<watch::Sender<StateMessage>>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl SubscriberRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create and add a subscriber whose first message is `initial`
    ///
    /// After [`close_all`](Self::close_all) the subscriber is still created,
    /// but it is not added: it yields `initial` and then ends.
    pub fn register(self: &Arc<Self>, initial: StateMessage) -> Subscriber {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = watch::channel(initial);

        let mut subscribers = self.subscribers.lock();
        if self.closed.load(Ordering::Acquire) {
            debug!("Registry closed, {} will not receive updates", id);
        } else {
            subscribers.insert(id, Arc::new(tx));
            debug!("Registered {} ({} active)", id, subscribers.len());
        }
        drop(subscribers);

        Subscriber::new(id, rx, Arc::clone(self))
    }

    /// Remove a subscriber; a no-op if it is already gone
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let removed = subscribers.remove(&id).is_some();
        if removed {
            debug!("Unregistered {} ({} active)", id, subscribers.len());
        }
        removed
    }

    /// Point-in-time copy of the membership, ordered by id
    pub fn snapshot_subscribers(&self) -> Vec<SubscriberHandle> {
        self.subscribers
            .lock()
            .iter()
            .map(|(id, tx)| SubscriberHandle {
                id: *id,
                tx: Arc::clone(tx),
            })
            .collect()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }

    /// Insert a member whose receiving side is already gone, as happens
    /// when a session is torn down mid fan-out
    #[cfg(test)]
    pub(crate) fn insert_detached(&self, initial: StateMessage) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, _) = watch::channel(initial);
        self.subscribers.lock().insert(id, Arc::new(tx));
        id
    }

    /// Drop every channel so that all sessions end, and refuse new members
    pub fn close_all(&self) {
        let mut subscribers = self.subscribers.lock();
        self.closed.store(true, Ordering::Release);
        let count = subscribers.len();
        subscribers.clear();
        info!("Closed {} stream subscriber(s)", count);
    }
}
