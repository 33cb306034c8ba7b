//! Core state types

use serde::{Deserialize, Serialize};

/// Generation sentinel used when no sub-filter is selected
pub const DEFAULT_GENERATION: &str = "default";

/// Mode active at startup when the config does not say otherwise
pub const DEFAULT_MODE: &str = "pokemon";

/// Entity name selected at startup
pub const DEFAULT_NAME: &str = "pikachu";

/// The only mode in which the shiny flag means anything
pub const DEFAULT_SHINY_MODE: &str = "pokemon";

/// The overlay record pushed to every display client
///
/// Always serialized in full; clients never see a partial state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayState {
    /// Encounter counter, never negative
    pub counter: u64,
    /// Active name/asset domain (e.g. "pokemon", "digimon")
    pub mode: String,
    /// Shiny variant flag, meaningful only in the shiny-capable mode
    pub shiny: bool,
    /// Selected entity name within the active mode
    pub name: String,
    /// Sub-filter within the mode
    pub generation: String,
}

impl OverlayState {
    /// Create a fresh state for the given mode and selected name
    pub fn new(mode: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            counter: 0,
            mode: mode.into(),
            shiny: false,
            name: name.into(),
            generation: DEFAULT_GENERATION.to_string(),
        }
    }
}

impl Default for OverlayState {
    fn default() -> Self {
        Self::new(DEFAULT_MODE, DEFAULT_NAME)
    }
}
