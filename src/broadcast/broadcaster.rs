//! Broadcaster - serialize once, deliver to everyone, best-effort

use std::sync::Arc;

use tracing::{debug, warn};

use super::registry::SubscriberRegistry;
use super::encode_state;
use crate::state::OverlayState;

/// Pushes state snapshots to every registered subscriber
pub struct Broadcaster {
    registry: Arc<SubscriberRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<SubscriberRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Deliver `state` to all current subscribers
    ///
    /// Subscribers whose channel is gone are removed. Returns the number of
    /// subscribers the message was delivered to.
    pub fn notify(&self, state: &OverlayState) -> usize {
        let message = match encode_state(state) {
            Ok(message) => message,
            Err(e) => {
                warn!("Failed to serialize state for broadcast: {}", e);
                return 0;
            },
        };

        let mut delivered = 0;
        for handle in self.registry.snapshot_subscribers() {
            if handle.deliver(&message) {
                delivered += 1;
            } else {
                debug!("Dropping {} (channel closed)", handle.id());
                self.registry.unregister(handle.id());
            }
        }

        debug!("Broadcast state to {} subscriber(s)", delivered);
        delivered
    }
}
