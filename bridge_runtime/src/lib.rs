//! Shared wire contracts for the card-run bridge.
//!
//! This crate holds the JSON documents exchanged with remote callers (state,
//! legal actions, action results, health) and the action command surface,
//! without depending on the socket and host plumbing in `bridge_core`.

mod action_text;
mod actions;
mod phase;
mod schema;

pub use action_text::{parse_action_line, ActionTextError};
pub use actions::{ActionCommand, ActionCommandError, ActionKind};
pub use phase::Phase;
pub use schema::{
    ActionDescriptor, ActionParams, ActionResult, BlindView, CardSelection, CardView,
    ConsumableView, DeckCounts, GameState, HandLevel, HealthReport, JokerView, LegalActionSet,
    PackItemView, PackView, ShopItemView, ShopView, SCHEMA_VERSION,
};
