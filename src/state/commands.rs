//! Control actions for the StateStore
//!
//! A control request arrives as an action string plus a loose JSON parameter
//! object. Parsing turns it into a typed [`Action`] up front, so applying it
//! inside the store lock is a plain match with no fallible steps.

use serde_json::{Map, Value};

use super::types::{OverlayState, DEFAULT_GENERATION};

// ============================================================================
// Action
// ============================================================================

/// A parsed control action
///
/// Unrecognized action strings and actions with malformed parameters parse
/// to [`Action::Ignored`], which leaves the state untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `inc`: counter + 1
    Increment,
    /// `dec`: counter - 1, floored at zero
    Decrement,
    /// `reset`: counter = 0
    Reset,
    /// `set_generation`: select a sub-filter within the mode
    SetGeneration(String),
    /// `set_mode`: switch domain and reset every dependent field
    SetMode(String),
    /// `set_name`: select an entity
    SetName(String),
    /// `toggle_shiny`: flip the shiny flag (shiny-capable mode only)
    ToggleShiny,
    /// Anything else; carries the original action string for logging
    Ignored(String),
}

impl Action {
    /// Parse an action string and its parameters
    pub fn parse(action: &str, params: &Map<String, Value>) -> Self {
        let parsed = match action {
            "inc" => Some(Self::Increment),
            "dec" => Some(Self::Decrement),
            "reset" => Some(Self::Reset),
            "toggle_shiny" => Some(Self::ToggleShiny),
            "set_generation" => {
                generation_param(params.get("generation")).map(Self::SetGeneration)
            },
            "set_mode" => string_param(params.get("mode"), "").map(Self::SetMode),
            "set_name" => string_param(params.get("name"), "").map(Self::SetName),
            _ => None,
        };

        parsed.unwrap_or_else(|| Self::Ignored(action.to_string()))
    }

    /// Wire name of the action
    pub fn name(&self) -> &str {
        match self {
            Self::Increment => "inc",
            Self::Decrement => "dec",
            Self::Reset => "reset",
            Self::SetGeneration(_) => "set_generation",
            Self::SetMode(_) => "set_mode",
            Self::SetName(_) => "set_name",
            Self::ToggleShiny => "toggle_shiny",
            Self::Ignored(action) => action,
        }
    }

    /// Apply the action to `state` in place
    ///
    /// `shiny_mode` is the mode tag in which `toggle_shiny` is effective.
    pub fn apply(&self, state: &mut OverlayState, shiny_mode: &str) {
        match self {
            Self::Increment => state.counter = state.counter.saturating_add(1),
            Self::Decrement => state.counter = state.counter.saturating_sub(1),
            Self::Reset => state.counter = 0,
            Self::SetGeneration(generation) => state.generation.clone_from(generation),
            Self::SetMode(mode) => {
                state.mode.clone_from(mode);
                state.counter = 0;
                state.shiny = false;
                state.name.clear();
                state.generation = DEFAULT_GENERATION.to_string();
            },
            Self::SetName(name) => state.name.clone_from(name),
            Self::ToggleShiny => {
                if state.mode == shiny_mode {
                    state.shiny = !state.shiny;
                }
            },
            Self::Ignored(_) => {},
        }
    }
}

/// Absent and null fall back to `default`; non-strings are malformed
fn string_param(value: Option<&Value>, default: &str) -> Option<String> {
    match value {
        None | Some(Value::Null) => Some(default.to_string()),
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => None,
    }
}

/// Generations come from a dropdown and may be sent as numbers
fn generation_param(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::Number(n)) => Some(n.to_string()),
        other => string_param(other, DEFAULT_GENERATION),
    }
}
