//! OverlayHub - owns the state store and the broadcaster
//!
//! This is the control entry point: requests are validated, applied to the
//! store and broadcast inside one critical section, and the resulting state
//! is returned to the caller. It is also where stream subscribers are
//! registered against a consistent snapshot.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::broadcast::{encode_state, Broadcaster, Subscriber, SubscriberRegistry};
use crate::state::{Action, OverlayState, StateStore};

/// Errors returned by the control entry point
#[derive(Debug, Error)]
pub enum ControlError {
    /// The request body is not a JSON object with a string `action`
    #[error("malformed update request: {0}")]
    MalformedRequest(#[from] serde_json::Error),
    /// The state could not be encoded for a new subscriber
    #[error("failed to encode state: {0}")]
    Encode(serde_json::Error),
}

/// Body of a control request: `{"action": "...", ...params}`
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRequest {
    pub action: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl UpdateRequest {
    /// Validate and parse a raw request body
    pub fn from_slice(body: &[u8]) -> Result<Self, ControlError> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn to_action(&self) -> Action {
        Action::parse(&self.action, &self.params)
    }
}

/// Shared overlay state plus its subscribers
pub struct OverlayHub {
    store: StateStore,
    broadcaster: Broadcaster,
}

impl OverlayHub {
    pub fn new(store: StateStore) -> Self {
        Self {
            store,
            broadcaster: Broadcaster::new(SubscriberRegistry::new()),
        }
    }

    pub fn snapshot(&self) -> OverlayState {
        self.store.snapshot()
    }

    pub fn subscriber_count(&self) -> usize {
        self.broadcaster.registry().len()
    }

    /// Apply a control request and broadcast the result
    ///
    /// The returned state is exactly the one that was broadcast.
    pub fn handle(&self, request: &UpdateRequest) -> OverlayState {
        let action = request.to_action();
        debug!("Received action '{}' with params {:?}", request.action, request.params);

        let state = self.store.apply_and_then(&action, |state| {
            self.broadcaster.notify(state);
        });

        info!(
            "Applied '{}': counter={} mode={} name={} shiny={} generation={}",
            action.name(),
            state.counter,
            state.mode,
            state.name,
            state.shiny,
            state.generation
        );
        state
    }

    /// Validate a raw body, then [`handle`](Self::handle) it
    pub fn handle_raw(&self, body: &[u8]) -> Result<OverlayState, ControlError> {
        let request = UpdateRequest::from_slice(body)?;
        Ok(self.handle(&request))
    }

    /// Register a new stream subscriber primed with the current state
    ///
    /// The snapshot and the registration happen under the store lock, so the
    /// subscriber cannot miss a mutation applied concurrently.
    pub fn subscribe(&self) -> Result<Subscriber, ControlError> {
        self.store.read(|state| -> Result<Subscriber, ControlError> {
            let initial = encode_state(state).map_err(ControlError::Encode)?;
            Ok(self.broadcaster.registry().register(initial))
        })
    }

    /// End every open stream; later subscribers get one snapshot and close
    pub fn shutdown(&self) {
        self.broadcaster.registry().close_all();
    }
}

impl Default for OverlayHub {
    fn default() -> Self {
        Self::new(StateStore::default())
    }
}

/// Cheaply cloneable handle to the hub
pub type SharedHub = Arc<OverlayHub>;
