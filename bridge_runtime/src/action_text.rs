use std::num::ParseIntError;

use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::{ActionCommand, ActionCommandError, ActionKind};

#[derive(Debug, Error)]
pub enum ActionTextError {
    #[error("empty action")]
    Empty,
    #[error("unknown action verb: {0}")]
    UnknownVerb(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("invalid integer '{value}' for {context}: {source}")]
    InvalidInteger {
        value: String,
        context: &'static str,
        source: ParseIntError,
    },
    #[error("invalid sort mode '{0}'")]
    InvalidSortMode(String),
    #[error("invalid blind option '{0}'")]
    InvalidBlind(String),
    #[error("invalid JSON action: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error(transparent)]
    Command(#[from] ActionCommandError),
}

/// Parse a console line such as `play 1 2 3` or `buy 2` into a command.
///
/// A line starting with `{` is taken as a literal JSON action body.
pub fn parse_action_line(input: &str) -> Result<ActionCommand, ActionTextError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ActionTextError::Empty);
    }
    if trimmed.starts_with('{') {
        let value: JsonValue = serde_json::from_str(trimmed)?;
        return Ok(ActionCommand::from_json(&value)?);
    }

    let mut parts = trimmed.split_whitespace();
    let verb = parts
        .next()
        .map(|v| v.to_ascii_lowercase())
        .ok_or(ActionTextError::Empty)?;

    match verb.as_str() {
        "play" | "discard" => {
            let kind = if verb == "play" {
                ActionKind::PlayHand
            } else {
                ActionKind::Discard
            };
            let indices = parts
                .map(|token| parse_i64(token, "card index"))
                .collect::<Result<Vec<_>, _>>()?;
            if indices.is_empty() {
                return Err(ActionTextError::MissingArgument("card indices"));
            }
            Ok(ActionCommand::new(kind).with_param("card_indices", indices))
        }
        "buy" => {
            let slot_str = parts
                .next()
                .ok_or(ActionTextError::MissingArgument("slot"))?;
            let slot = parse_i64(slot_str, "shop slot")?;
            Ok(ActionCommand::new(ActionKind::ShopBuy).with_param("slot", slot))
        }
        "reroll" => Ok(ActionCommand::new(ActionKind::ShopReroll)),
        "sell" => {
            let index_str = parts
                .next()
                .ok_or(ActionTextError::MissingArgument("joker index"))?;
            let index = parse_i64(index_str, "joker index")?;
            Ok(ActionCommand::new(ActionKind::ShopSellJoker).with_param("joker_index", index))
        }
        "end_shop" | "leave" | "next_round" => Ok(ActionCommand::new(ActionKind::ShopEnd)),
        "sort" => {
            let mode = parts.next().unwrap_or("rank").to_ascii_lowercase();
            let mode = match mode.as_str() {
                "rank" | "value" => "rank",
                "suit" => "suit",
                other => return Err(ActionTextError::InvalidSortMode(other.to_string())),
            };
            Ok(ActionCommand::new(ActionKind::SortHand).with_param("mode", mode))
        }
        "pick" | "choose" => {
            let choice_str = parts
                .next()
                .ok_or(ActionTextError::MissingArgument("choice index"))?;
            let choice = parse_i64(choice_str, "pack choice")?;
            Ok(ActionCommand::new(ActionKind::SelectPackItem).with_param("choice_index", choice))
        }
        "skip_pack" => Ok(ActionCommand::new(ActionKind::SkipPack)),
        "blind" | "select_blind" => {
            let option = parts.next().unwrap_or("small").to_ascii_lowercase();
            match option.as_str() {
                "small" | "big" | "boss" => {
                    Ok(ActionCommand::new(ActionKind::SelectBlind).with_param("option", option))
                }
                other => Err(ActionTextError::InvalidBlind(other.to_string())),
            }
        }
        "skip_blind" | "skip" => Ok(ActionCommand::new(ActionKind::SkipBlind)),
        other => Err(ActionTextError::UnknownVerb(other.to_string())),
    }
}

fn parse_i64(value: &str, context: &'static str) -> Result<i64, ActionTextError> {
    value
        .parse::<i64>()
        .map_err(|source| ActionTextError::InvalidInteger {
            value: value.to_string(),
            context,
            source,
        })
}
