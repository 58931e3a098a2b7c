use std::fmt;

use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Discrete interaction mode of the host, derived fresh for every request.
///
/// Serialized as a bare tag (`"SHOP"`, `"SELECTING_HAND"`, ...). Raw host
/// states that match no known mode travel as `STATE_<raw>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    Menu,
    Splash,
    Shop,
    SelectingHand,
    HandPlayed,
    DrawToHand,
    BlindSelect,
    PackOpening,
    Raw(String),
    #[default]
    Unknown,
}

const RAW_PREFIX: &str = "STATE_";

impl Phase {
    /// Parse a wire tag. Anything unrecognised that does not carry the raw
    /// prefix maps to [`Phase::Unknown`].
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "MENU" => Phase::Menu,
            "SPLASH" => Phase::Splash,
            "SHOP" => Phase::Shop,
            "SELECTING_HAND" => Phase::SelectingHand,
            "HAND_PLAYED" => Phase::HandPlayed,
            "DRAW_TO_HAND" => Phase::DrawToHand,
            "BLIND_SELECT" => Phase::BlindSelect,
            "PACK_OPENING" => Phase::PackOpening,
            other => match other.strip_prefix(RAW_PREFIX) {
                Some(raw) if !raw.is_empty() => Phase::Raw(raw.to_string()),
                _ => Phase::Unknown,
            },
        }
    }

    /// Phases in which the remote caller is expected to pick an action.
    pub fn is_decision_point(&self) -> bool {
        matches!(
            self,
            Phase::SelectingHand | Phase::Shop | Phase::BlindSelect | Phase::PackOpening
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Menu => f.write_str("MENU"),
            Phase::Splash => f.write_str("SPLASH"),
            Phase::Shop => f.write_str("SHOP"),
            Phase::SelectingHand => f.write_str("SELECTING_HAND"),
            Phase::HandPlayed => f.write_str("HAND_PLAYED"),
            Phase::DrawToHand => f.write_str("DRAW_TO_HAND"),
            Phase::BlindSelect => f.write_str("BLIND_SELECT"),
            Phase::PackOpening => f.write_str("PACK_OPENING"),
            Phase::Raw(raw) => write!(f, "{RAW_PREFIX}{raw}"),
            Phase::Unknown => f.write_str("UNKNOWN"),
        }
    }
}

impl Serialize for Phase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Phase {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Phase::from_tag(&tag))
    }
}

impl JsonSchema for Phase {
    fn schema_name() -> String {
        "Phase".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        <String as JsonSchema>::json_schema(gen)
    }
}
