//! Overlay Hub - shared overlay state broadcaster
//!
//! One overlay state record is mutated by control requests and pushed to
//! every connected display client over Server-Sent Events.

pub mod api;
pub mod broadcast;
pub mod config;
pub mod hub;
pub mod providers;
pub mod resolver;
pub mod state;

pub use hub::{OverlayHub, SharedHub};
pub use state::{Action, OverlayState, StateStore};
