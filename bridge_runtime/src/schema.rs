//! JSON documents served by the bridge.
//!
//! Field names and defaults follow the published client contract; every
//! collection index carried on the wire is 1-based.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{ActionKind, Phase};

/// Version tag stamped on every state and legal-action document.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Full state document for one read of the host world.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GameState {
    pub schema_version: String,
    pub timestamp_ms: u64,
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default)]
    pub round: i64,
    #[serde(default)]
    pub ante: i64,
    #[serde(default)]
    pub money: i64,
    #[serde(default)]
    pub hands_remaining: i64,
    #[serde(default)]
    pub discards_remaining: i64,
    #[serde(default)]
    pub hands_played: i64,
    #[serde(default)]
    pub blind: Option<BlindView>,
    #[serde(default)]
    pub hand: Vec<CardView>,
    #[serde(default)]
    pub jokers: Vec<JokerView>,
    #[serde(default)]
    pub consumables: Vec<ConsumableView>,
    #[serde(default)]
    pub shop: Option<ShopView>,
    #[serde(default)]
    pub pack: Option<PackView>,
    #[serde(default)]
    pub deck_counts: DeckCounts,
    #[serde(default)]
    pub hand_levels: BTreeMap<String, HandLevel>,
}

impl GameState {
    /// Header-only document used when the host has no run in progress.
    pub fn inactive(phase: Phase, timestamp_ms: u64, reason: impl Into<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            timestamp_ms,
            phase,
            error: Some(reason.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CardView {
    pub id: String,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub suit: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub edition: Option<String>,
    #[serde(default)]
    pub enhancement: Option<String>,
    #[serde(default)]
    pub seal: Option<String>,
    #[serde(default)]
    pub debuffed: bool,
    #[serde(default = "default_facing")]
    pub facing: String,
    #[serde(default)]
    pub highlighted: bool,
    #[serde(default)]
    pub hand_index: Option<usize>,
    /// 1-based slot in the owning card area, found by identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_index: Option<usize>,
}

fn default_facing() -> String {
    "front".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JokerView {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub rarity: Option<i64>,
    #[serde(default)]
    pub sell_cost: i64,
    /// Raw ability table as the host holds it.
    #[serde(default)]
    pub ability: Option<JsonValue>,
    #[serde(default)]
    pub edition: Option<JsonValue>,
    pub joker_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_index: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConsumableView {
    pub index: usize,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BlindView {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub chips_needed: Option<i64>,
    #[serde(default)]
    pub chips_scored: i64,
    #[serde(default)]
    pub boss: bool,
    #[serde(default)]
    pub debuff_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ShopView {
    #[serde(default)]
    pub items: Vec<ShopItemView>,
    #[serde(default)]
    pub reroll_cost: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ShopItemView {
    pub slot: usize,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cost: i64,
    #[serde(rename = "type", default = "default_item_kind")]
    pub kind: String,
}

fn default_item_kind() -> String {
    "unknown".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PackView {
    #[serde(default)]
    pub cards: Vec<PackItemView>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PackItemView {
    pub index: usize,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(rename = "type", default = "default_item_kind")]
    pub kind: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeckCounts {
    pub deck_size: usize,
    pub discard_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HandLevel {
    pub level: i64,
    #[serde(default)]
    pub mult: Option<f64>,
    #[serde(default)]
    pub chips: Option<i64>,
}

/// Actions the dispatcher will accept for the current world, in display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LegalActionSet {
    pub schema_version: String,
    pub phase: Phase,
    #[serde(default)]
    pub actions: Vec<ActionDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LegalActionSet {
    pub fn new(phase: Phase, actions: Vec<ActionDescriptor>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            phase,
            actions,
            error: None,
        }
    }

    pub fn contains(&self, kind: ActionKind) -> bool {
        self.actions.iter().any(|action| action.kind == kind)
    }

    pub fn of_kind(&self, kind: ActionKind) -> impl Iterator<Item = &ActionDescriptor> {
        self.actions.iter().filter(move |action| action.kind == kind)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActionDescriptor {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub description: String,
    #[serde(default)]
    pub params: ActionParams,
}

impl ActionDescriptor {
    pub fn new(kind: ActionKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            params: ActionParams::default(),
        }
    }

    pub fn with_params(mut self, params: ActionParams) -> Self {
        self.params = params;
        self
    }
}

/// Parameter constraints attached to a legal action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActionParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_indices: Option<CardSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joker_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sell_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CardSelection {
    pub available: Vec<usize>,
    pub min_select: usize,
    pub max_select: usize,
}

/// Outcome of `POST /action`. Domain failures still travel with HTTP 200.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActionResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Box<GameState>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal: Option<LegalActionSet>,
}

impl ActionResult {
    pub fn success(state: GameState, legal: LegalActionSet) -> Self {
        Self {
            ok: true,
            error: None,
            state: Some(Box::new(state)),
            legal: Some(legal),
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(reason.into()),
            state: None,
            legal: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HealthReport {
    pub status: String,
    pub version: String,
    pub uptime_ms: u64,
    #[serde(default)]
    pub request_count: u64,
    #[serde(default)]
    pub error_count: u64,
    #[serde(default)]
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_params_serialize_as_empty_object() {
        let descriptor = ActionDescriptor::new(ActionKind::ShopEnd, "Leave the shop");
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["type"], "SHOP_END");
        assert_eq!(json["params"], serde_json::json!({}));
    }

    #[test]
    fn failure_result_omits_views() {
        let json = serde_json::to_value(ActionResult::failure("Not enough money")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"ok": false, "error": "Not enough money"})
        );
    }

    #[test]
    fn inactive_state_keeps_header_fields() {
        let state = GameState::inactive(Phase::Menu, 42, "No active run");
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["schema_version"], SCHEMA_VERSION);
        assert_eq!(json["phase"], "MENU");
        assert_eq!(json["error"], "No active run");
        assert_eq!(json["hand"], serde_json::json!([]));
    }
}
