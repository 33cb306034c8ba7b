//! Broadcast module - fan-out of state snapshots to stream subscribers
//!
//! The registry owns the sending half of one coalescing channel per
//! connected display client. The broadcaster serializes each new state once
//! and pushes the shared message into every channel without blocking.

mod broadcaster;
mod registry;
mod subscriber;

pub use broadcaster::Broadcaster;
pub use registry::{SubscriberHandle, SubscriberRegistry};
pub use subscriber::{Subscriber, SubscriberId};

use std::sync::Arc;

use crate::state::OverlayState;

/// A serialized state snapshot, shared by every subscriber it is delivered to
pub type StateMessage = Arc<str>;

/// Serialize a state snapshot into the wire message sent to clients
pub fn encode_state(state: &OverlayState) -> serde_json::Result<StateMessage> {
    serde_json::to_string(state).map(Arc::from)
}
