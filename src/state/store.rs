//! StateStore - the single overlay record behind a mutex
//!
//! Every mutation runs under one lock together with whatever must observe the
//! exact post-mutation snapshot (the broadcast fan-out), so observers see
//! mutations in the order they were applied.

use parking_lot::Mutex;
use tracing::debug;

use super::commands::Action;
use super::types::{OverlayState, DEFAULT_SHINY_MODE};

/// Holds the current overlay state and applies actions to it
pub struct StateStore {
    state: Mutex<OverlayState>,
    /// Mode tag in which `toggle_shiny` is effective
    shiny_mode: String,
}

impl StateStore {
    /// Create a store seeded with `initial`
    pub fn new(initial: OverlayState, shiny_mode: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(initial),
            shiny_mode: shiny_mode.into(),
        }
    }

    /// The mode in which the shiny flag can be toggled
    pub fn shiny_mode(&self) -> &str {
        &self.shiny_mode
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> OverlayState {
        self.state.lock().clone()
    }

    /// Run `f` against the current state while holding the lock
    ///
    /// No mutation can interleave with `f`.
    pub fn read<R>(&self, f: impl FnOnce(&OverlayState) -> R) -> R {
        let state = self.state.lock();
        f(&state)
    }

    /// Apply an action and return the new snapshot
    pub fn apply(&self, action: &Action) -> OverlayState {
        self.apply_and_then(action, |_| ())
    }

    /// Apply an action, then hand the post-mutation state to `commit` before
    /// releasing the lock
    ///
    /// `commit` must not block; it runs inside the critical section.
    pub fn apply_and_then(
        &self,
        action: &Action,
        commit: impl FnOnce(&OverlayState),
    ) -> OverlayState {
        let mut state = self.state.lock();
        action.apply(&mut state, &self.shiny_mode);

        if let Action::Ignored(name) = action {
            debug!("Ignoring action '{}'", name);
        }

        commit(&state);
        state.clone()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(OverlayState::default(), DEFAULT_SHINY_MODE)
    }
}
