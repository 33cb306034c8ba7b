//! State management module - the single shared overlay record
//!
//! This module provides the state store that holds the overlay state shown by
//! every display client, and the typed actions that mutate it. Mutation is
//! serialized through one mutex so that each broadcast carries the exact
//! post-mutation snapshot.

mod commands;
mod store;
mod types;

pub use commands::Action;
pub use store::StateStore;
pub use types::{OverlayState, DEFAULT_GENERATION, DEFAULT_MODE, DEFAULT_NAME, DEFAULT_SHINY_MODE};
