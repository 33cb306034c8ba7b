//! Subscriber - receiving end of one stream connection

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use super::registry::SubscriberRegistry;
use super::StateMessage;

/// Registry-unique subscriber identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(pub(crate) u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// One registered stream subscriber
///
/// The channel is coalescing: if several snapshots are published before the
/// subscriber reads, only the newest one is delivered. Dropping the
/// subscriber removes it from the registry.
pub struct Subscriber {
    id: SubscriberId,
    rx: watch::Receiver<StateMessage>,
    /// Whether the snapshot queued at registration has been handed out
    primed: bool,
    registry: Arc<SubscriberRegistry>,
}

impl Subscriber {
    pub(crate) fn new(
        id: SubscriberId,
        rx: watch::Receiver<StateMessage>,
        registry: Arc<SubscriberRegistry>,
    ) -> Self {
        Self {
            id,
            rx,
            primed: false,
            registry,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next message
    ///
    /// The first call returns the snapshot queued at registration without
    /// waiting. Returns `None` once the registry has dropped this
    /// subscriber's channel (unregistered or shut down).
    pub async fn recv(&mut self) -> Option<StateMessage> {
        if !self.primed {
            self.primed = true;
            return Some(self.rx.borrow_and_update().clone());
        }

        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Take the pending message, if any, without waiting
    pub fn try_recv(&mut self) -> Option<StateMessage> {
        if !self.primed {
            self.primed = true;
            return Some(self.rx.borrow_and_update().clone());
        }

        match self.rx.has_changed() {
            Ok(true) => Some(self.rx.borrow_and_update().clone()),
            _ => None,
        }
    }

    /// Remove this subscriber from the registry
    ///
    /// Idempotent; also runs on drop.
    pub fn unregister(&self) {
        self.registry.unregister(self.id);
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.unregister();
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("primed", &self.primed)
            .finish()
    }
}
