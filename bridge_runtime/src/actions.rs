use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use thiserror::Error;

/// Closed set of action kinds understood by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    PlayHand,
    Discard,
    SortHand,
    ShopBuy,
    ShopReroll,
    ShopSellJoker,
    ShopEnd,
    SelectBlind,
    SkipBlind,
    SelectPackItem,
    SkipPack,
}

impl ActionKind {
    pub const ALL: [ActionKind; 11] = [
        ActionKind::PlayHand,
        ActionKind::Discard,
        ActionKind::SortHand,
        ActionKind::ShopBuy,
        ActionKind::ShopReroll,
        ActionKind::ShopSellJoker,
        ActionKind::ShopEnd,
        ActionKind::SelectBlind,
        ActionKind::SkipBlind,
        ActionKind::SelectPackItem,
        ActionKind::SkipPack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::PlayHand => "PLAY_HAND",
            ActionKind::Discard => "DISCARD",
            ActionKind::SortHand => "SORT_HAND",
            ActionKind::ShopBuy => "SHOP_BUY",
            ActionKind::ShopReroll => "SHOP_REROLL",
            ActionKind::ShopSellJoker => "SHOP_SELL_JOKER",
            ActionKind::ShopEnd => "SHOP_END",
            ActionKind::SelectBlind => "SELECT_BLIND",
            ActionKind::SkipBlind => "SKIP_BLIND",
            ActionKind::SelectPackItem => "SELECT_PACK_ITEM",
            ActionKind::SkipPack => "SKIP_PACK",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ActionCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ActionCommandError::UnknownKind(s.to_string()))
    }
}

/// Error returned when an action request cannot be turned into a command.
///
/// The display strings are the reasons reported back to callers, so they
/// stay stable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionCommandError {
    #[error("Action request must be a JSON object")]
    NotAnObject,
    #[error("Missing action type")]
    MissingKind,
    #[error("Unknown action type")]
    UnknownKind(String),
    #[error("Invalid parameter {name}: expected {expected}")]
    InvalidParam {
        name: &'static str,
        expected: &'static str,
    },
}

/// Caller-supplied instruction: a kind plus its raw parameter mapping.
///
/// Parameters stay untyped until a handler asks for them so that each
/// handler owns its own validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionCommand {
    pub kind: ActionKind,
    pub params: JsonMap<String, JsonValue>,
}

impl ActionCommand {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            params: JsonMap::new(),
        }
    }

    pub fn with_param(mut self, name: &str, value: impl Into<JsonValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Build a command from a decoded `{"type": ..., "params": {...}}` body.
    pub fn from_json(value: &JsonValue) -> Result<Self, ActionCommandError> {
        let object = value.as_object().ok_or(ActionCommandError::NotAnObject)?;
        let kind = match object.get("type") {
            Some(JsonValue::String(tag)) => tag.parse::<ActionKind>()?,
            Some(JsonValue::Null) | None => return Err(ActionCommandError::MissingKind),
            Some(other) => return Err(ActionCommandError::UnknownKind(other.to_string())),
        };
        let params = match object.get("params") {
            Some(JsonValue::Object(map)) => map.clone(),
            Some(JsonValue::Null) | None => JsonMap::new(),
            Some(_) => {
                return Err(ActionCommandError::InvalidParam {
                    name: "params",
                    expected: "object",
                })
            }
        };
        Ok(Self { kind, params })
    }

    pub fn to_json(&self) -> JsonValue {
        let mut object = JsonMap::new();
        object.insert("type".to_string(), JsonValue::from(self.kind.as_str()));
        object.insert("params".to_string(), JsonValue::Object(self.params.clone()));
        JsonValue::Object(object)
    }

    /// `params.card_indices` as signed integers; absent means an empty selection.
    pub fn card_indices(&self) -> Result<Vec<i64>, ActionCommandError> {
        const INVALID: ActionCommandError = ActionCommandError::InvalidParam {
            name: "card_indices",
            expected: "array of integers",
        };
        match self.params.get("card_indices") {
            None | Some(JsonValue::Null) => Ok(Vec::new()),
            Some(JsonValue::Array(items)) => items
                .iter()
                .map(|item| integral(item).ok_or(INVALID))
                .collect(),
            Some(_) => Err(INVALID),
        }
    }

    /// Integer parameter such as `slot`, `joker_index` or `choice_index`.
    pub fn index_param(&self, name: &'static str) -> Result<Option<i64>, ActionCommandError> {
        match self.params.get(name) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(value) => integral(value)
                .map(Some)
                .ok_or(ActionCommandError::InvalidParam {
                    name,
                    expected: "integer",
                }),
        }
    }

    /// String parameter such as `mode` or `option`.
    pub fn text_param(&self, name: &'static str) -> Result<Option<&str>, ActionCommandError> {
        match self.params.get(name) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::String(text)) => Ok(Some(text.as_str())),
            Some(_) => Err(ActionCommandError::InvalidParam {
                name,
                expected: "string",
            }),
        }
    }
}

/// Accepts JSON integers and integral floats (`3.0`).
fn integral(value: &JsonValue) -> Option<i64> {
    if let Some(int) = value.as_i64() {
        return Some(int);
    }
    let float = value.as_f64()?;
    if float.is_finite() && float.fract() == 0.0 && float.abs() < i64::MAX as f64 {
        Some(float as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_kind_and_params() {
        let body = json!({"type": "PLAY_HAND", "params": {"card_indices": [1, 2.0, 3]}});
        let command = ActionCommand::from_json(&body).unwrap();
        assert_eq!(command.kind, ActionKind::PlayHand);
        assert_eq!(command.card_indices().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn unknown_kind_reports_fixed_reason() {
        let body = json!({"type": "FLIP_TABLE"});
        let err = ActionCommand::from_json(&body).unwrap_err();
        assert_eq!(err, ActionCommandError::UnknownKind("FLIP_TABLE".into()));
        assert_eq!(err.to_string(), "Unknown action type");
    }

    #[test]
    fn missing_type_is_rejected() {
        let err = ActionCommand::from_json(&json!({"params": {}})).unwrap_err();
        assert_eq!(err, ActionCommandError::MissingKind);
    }

    #[test]
    fn missing_params_default_to_empty() {
        let command = ActionCommand::from_json(&json!({"type": "SHOP_END"})).unwrap();
        assert!(command.params.is_empty());
        assert_eq!(command.index_param("slot").unwrap(), None);
    }

    #[test]
    fn non_integer_indices_are_invalid() {
        let command = ActionCommand::new(ActionKind::Discard).with_param("card_indices", json!(["a"]));
        assert!(matches!(
            command.card_indices(),
            Err(ActionCommandError::InvalidParam { name: "card_indices", .. })
        ));
        let command = ActionCommand::new(ActionKind::ShopBuy).with_param("slot", 1.5);
        assert!(command.index_param("slot").is_err());
    }

    #[test]
    fn kind_tags_round_trip() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.as_str().parse::<ActionKind>().unwrap(), kind);
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, JsonValue::from(kind.as_str()));
        }
    }
}
