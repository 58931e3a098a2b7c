//! Table-driven execution of action commands against the host.
//!
//! Every handler checks the same phase and resource conditions that
//! [`crate::legal::enumerate`] uses, then issues exactly one host call. A
//! rejected command never touches the host.

use std::collections::BTreeSet;

use bridge_runtime::{ActionCommand, ActionKind, ActionResult, GameState, LegalActionSet, Phase};
use tracing::{debug, info, warn};

use crate::host::{Host, HostError, HostValue};
use crate::legal::{self, BLIND_OPTIONS, MAX_PLAY_SELECTION, SORT_MODES};
use crate::phase::classify;
use crate::router::HandlerError;
use crate::snapshot::{build_snapshot, now_ms};
use crate::world::{area_cards, ResourceView, AREA_HAND, AREA_JOKERS, AREA_PACK, AREA_SHOP};

pub const SORT_BY_RANK: &str = "sort_hand_value";
pub const SORT_BY_SUIT: &str = "sort_hand_suit";

/// Host operations tried in order for each action kind.
const OPERATIONS: [(ActionKind, &[&str]); 11] = [
    (ActionKind::PlayHand, &["play_cards_from_highlighted"]),
    (ActionKind::Discard, &["discard_cards_from_highlighted"]),
    (ActionKind::SortHand, &[SORT_BY_RANK, SORT_BY_SUIT]),
    (ActionKind::ShopBuy, &["buy_from_shop"]),
    (ActionKind::ShopReroll, &["reroll_shop"]),
    (ActionKind::ShopSellJoker, &["sell_card"]),
    (ActionKind::ShopEnd, &["toggle_shop"]),
    (ActionKind::SelectBlind, &["select_blind"]),
    (ActionKind::SkipBlind, &["skip_blind"]),
    (ActionKind::SelectPackItem, &["use_card"]),
    (ActionKind::SkipPack, &["skip_booster"]),
];

pub fn operations_for(kind: ActionKind) -> &'static [&'static str] {
    OPERATIONS
        .iter()
        .find(|(candidate, _)| *candidate == kind)
        .map(|(_, operations)| *operations)
        .unwrap_or(&[])
}

/// Snapshot and legal actions from one world read and one classification.
pub fn observe<H: Host + ?Sized>(host: &H) -> (GameState, LegalActionSet) {
    let world = host.world();
    let phase = classify(&world);
    let resources = ResourceView::read(&world);
    let legal = legal::enumerate(&phase, &resources);
    let state = build_snapshot(&world, phase, now_ms());
    (state, legal)
}

/// Host call chosen by a handler once validation has passed.
struct HostCall {
    operation: &'static str,
    args: Vec<HostValue>,
}

impl HostCall {
    fn new(operation: &'static str, args: Vec<HostValue>) -> Self {
        Self { operation, args }
    }
}

/// Reason reported back to the caller with `ok: false`.
type Rejection = String;

/// Validate and execute `command`.
///
/// Domain failures come back as `Ok` with `ok: false`; only host faults are
/// returned as errors.
pub fn dispatch<H: Host + ?Sized>(
    host: &mut H,
    command: &ActionCommand,
) -> Result<ActionResult, HandlerError> {
    let world = host.world();
    let phase = classify(&world);
    let resources = ResourceView::read(&world);

    let call = match plan(host, command, &world, &phase, &resources) {
        Ok(call) => call,
        Err(reason) => {
            debug!(
                target: "card_bridge::dispatch",
                kind = %command.kind,
                %phase,
                %reason,
                "action.rejected"
            );
            return Ok(ActionResult::failure(reason));
        }
    };

    match host.invoke(call.operation, &call.args) {
        Ok(()) => {}
        Err(HostError::Rejected(reason)) => {
            debug!(
                target: "card_bridge::dispatch",
                kind = %command.kind,
                operation = call.operation,
                %reason,
                "action.rejected=host"
            );
            return Ok(ActionResult::failure(reason));
        }
        Err(err @ HostError::Fault { .. }) => {
            warn!(
                target: "card_bridge::dispatch",
                kind = %command.kind,
                operation = call.operation,
                error = %err,
                "action.fault"
            );
            return Err(HandlerError::Host(err));
        }
    }

    info!(
        target: "card_bridge::dispatch",
        kind = %command.kind,
        operation = call.operation,
        "action.applied"
    );
    let (state, legal) = observe(host);
    Ok(ActionResult::success(state, legal))
}

fn plan<H: Host + ?Sized>(
    host: &H,
    command: &ActionCommand,
    world: &HostValue,
    phase: &Phase,
    resources: &ResourceView,
) -> Result<HostCall, Rejection> {
    let kind = command.kind;
    match kind {
        ActionKind::PlayHand => {
            let indices = command.card_indices().map_err(|err| err.to_string())?;
            if indices.is_empty() || indices.len() > MAX_PLAY_SELECTION {
                return Err(format!("Must select 1-{MAX_PLAY_SELECTION} cards"));
            }
            require_run_in(resources, phase, kind, &Phase::SelectingHand)?;
            if resources.hands_left.unwrap_or(0) <= 0 {
                return Err("No hands remaining".to_string());
            }
            let cards = select(&area_cards(world, AREA_HAND), &indices, |index| {
                format!("Invalid card index: {index}")
            })?;
            Ok(HostCall::new(resolve(host, kind)?, cards))
        }
        ActionKind::Discard => {
            let indices = command.card_indices().map_err(|err| err.to_string())?;
            if indices.is_empty() {
                return Err("Must select at least 1 card".to_string());
            }
            require_run_in(resources, phase, kind, &Phase::SelectingHand)?;
            if resources.discards_left.unwrap_or(0) <= 0 {
                return Err("No discards remaining".to_string());
            }
            let cards = select(&area_cards(world, AREA_HAND), &indices, |index| {
                format!("Invalid card index: {index}")
            })?;
            Ok(HostCall::new(resolve(host, kind)?, cards))
        }
        ActionKind::SortHand => {
            let mode = command
                .text_param("mode")
                .map_err(|err| err.to_string())?
                .unwrap_or("rank");
            if !SORT_MODES.contains(&mode) {
                return Err(format!("Invalid sort mode: {mode}"));
            }
            require_run_in(resources, phase, kind, &Phase::SelectingHand)?;
            for operation in [SORT_BY_RANK, SORT_BY_SUIT] {
                if !host.has_operation(operation) {
                    return Err(missing_operation(operation));
                }
            }
            let operation = if mode == "suit" { SORT_BY_SUIT } else { SORT_BY_RANK };
            Ok(HostCall::new(operation, Vec::new()))
        }
        ActionKind::ShopBuy => {
            let slot = required_index(command, "slot")?;
            require_run_in(resources, phase, kind, &Phase::Shop)?;
            let item = slot_offset(slot, resources.shop.len())
                .and_then(|offset| resources.shop.get(offset))
                .ok_or_else(|| "Invalid shop slot".to_string())?;
            if !resources.can_afford(item.cost) {
                return Err("Not enough money".to_string());
            }
            let card = area_cards(world, AREA_SHOP)
                .get(item.slot - 1)
                .cloned()
                .unwrap_or_default();
            Ok(HostCall::new(resolve(host, kind)?, vec![card]))
        }
        ActionKind::ShopReroll => {
            require_run_in(resources, phase, kind, &Phase::Shop)?;
            if !resources.can_afford(resources.reroll_cost.unwrap_or(0)) {
                return Err("Not enough money".to_string());
            }
            Ok(HostCall::new(resolve(host, kind)?, Vec::new()))
        }
        ActionKind::ShopSellJoker => {
            let joker_index = required_index(command, "joker_index")?;
            require_run_in(resources, phase, kind, &Phase::Shop)?;
            let jokers = area_cards(world, AREA_JOKERS);
            let joker = slot_offset(joker_index, jokers.len())
                .and_then(|offset| jokers.get(offset))
                .cloned()
                .ok_or_else(|| "Invalid joker index".to_string())?;
            Ok(HostCall::new(resolve(host, kind)?, vec![joker]))
        }
        ActionKind::ShopEnd => {
            require_run_in(resources, phase, kind, &Phase::Shop)?;
            Ok(HostCall::new(resolve(host, kind)?, Vec::new()))
        }
        ActionKind::SelectBlind => {
            let option = command
                .text_param("option")
                .map_err(|err| err.to_string())?
                .unwrap_or("small");
            if !BLIND_OPTIONS.contains(&option) {
                return Err(format!("Invalid blind option: {option}"));
            }
            require_run_in(resources, phase, kind, &Phase::BlindSelect)?;
            Ok(HostCall::new(
                resolve(host, kind)?,
                vec![HostValue::from(option)],
            ))
        }
        ActionKind::SkipBlind => {
            require_run_in(resources, phase, kind, &Phase::BlindSelect)?;
            Ok(HostCall::new(resolve(host, kind)?, Vec::new()))
        }
        ActionKind::SelectPackItem => {
            let choice = required_index(command, "choice_index")?;
            require_run_in(resources, phase, kind, &Phase::PackOpening)?;
            let cards = area_cards(world, AREA_PACK);
            let card = slot_offset(choice, cards.len())
                .and_then(|offset| cards.get(offset))
                .cloned()
                .ok_or_else(|| "Invalid pack choice".to_string())?;
            Ok(HostCall::new(resolve(host, kind)?, vec![card]))
        }
        ActionKind::SkipPack => {
            require_run_in(resources, phase, kind, &Phase::PackOpening)?;
            Ok(HostCall::new(resolve(host, kind)?, Vec::new()))
        }
    }
}

fn require_run_in(
    resources: &ResourceView,
    phase: &Phase,
    kind: ActionKind,
    expected: &Phase,
) -> Result<(), Rejection> {
    if !resources.active {
        return Err(crate::snapshot::NO_ACTIVE_RUN.to_string());
    }
    if phase != expected {
        return Err(format!("{kind} not available in phase {phase}"));
    }
    Ok(())
}

fn required_index(command: &ActionCommand, name: &'static str) -> Result<i64, Rejection> {
    command
        .index_param(name)
        .map_err(|err| err.to_string())?
        .ok_or_else(|| format!("Missing parameter: {name}"))
}

/// Zero-based offset of a 1-based wire index, if it is in `1..=len`.
fn slot_offset(index: i64, len: usize) -> Option<usize> {
    usize::try_from(index)
        .ok()
        .filter(|index| (1..=len).contains(index))
        .map(|index| index - 1)
}

/// Resolve 1-based indices against `cards`, rejecting gaps and repeats.
fn select(
    cards: &[HostValue],
    indices: &[i64],
    invalid: impl Fn(i64) -> Rejection,
) -> Result<Vec<HostValue>, Rejection> {
    let mut seen = BTreeSet::new();
    let mut selected = Vec::with_capacity(indices.len());
    for &index in indices {
        let offset = slot_offset(index, cards.len()).ok_or_else(|| invalid(index))?;
        if !seen.insert(offset) {
            return Err("Duplicate card index".to_string());
        }
        selected.push(cards[offset].clone());
    }
    Ok(selected)
}

fn resolve<H: Host + ?Sized>(host: &H, kind: ActionKind) -> Result<&'static str, Rejection> {
    let operations = operations_for(kind);
    operations
        .iter()
        .copied()
        .find(|operation| host.has_operation(operation))
        .ok_or_else(|| missing_operation(operations.first().copied().unwrap_or("host")))
}

fn missing_operation(operation: &str) -> Rejection {
    format!("cannot find {operation} function")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_host::{MemoryHost, WorldBuilder};
    use serde_json::json;

    fn command(body: serde_json::Value) -> ActionCommand {
        ActionCommand::from_json(&body).unwrap()
    }

    fn hand_host(hands: i64, discards: i64, cards: usize) -> MemoryHost {
        MemoryHost::new(
            WorldBuilder::new()
                .selecting_hand()
                .hands_left(hands)
                .discards_left(discards)
                .standard_hand(cards)
                .build(),
        )
    }

    #[test]
    fn oversized_play_is_rejected_without_mutation() {
        let mut host = hand_host(2, 0, 8);
        let result = dispatch(
            &mut host,
            &command(json!({"type": "PLAY_HAND", "params": {"card_indices": [1, 2, 3, 4, 5, 6]}})),
        )
        .unwrap();
        assert!(!result.ok);
        assert_eq!(result.error.as_deref(), Some("Must select 1-5 cards"));
        assert!(result.state.is_none());
        assert!(host.calls().is_empty());
    }

    #[test]
    fn play_passes_the_selected_cards() {
        let mut host = hand_host(2, 1, 8);
        let result = dispatch(
            &mut host,
            &command(json!({"type": "PLAY_HAND", "params": {"card_indices": [3, 1]}})),
        )
        .unwrap();
        assert!(result.ok, "{:?}", result.error);
        assert_eq!(host.calls(), ["play_cards_from_highlighted"]);
        let state = result.state.unwrap();
        let legal = result.legal.unwrap();
        assert_eq!(state.phase, legal.phase);
        assert_eq!(state.phase, Phase::HandPlayed);
        assert_eq!(state.hands_remaining, 1);
    }

    #[test]
    fn out_of_range_and_duplicate_indices_are_rejected() {
        let mut host = hand_host(2, 2, 4);
        let result = dispatch(
            &mut host,
            &command(json!({"type": "DISCARD", "params": {"card_indices": [5]}})),
        )
        .unwrap();
        assert_eq!(result.error.as_deref(), Some("Invalid card index: 5"));

        let result = dispatch(
            &mut host,
            &command(json!({"type": "DISCARD", "params": {"card_indices": [2, 2]}})),
        )
        .unwrap();
        assert_eq!(result.error.as_deref(), Some("Duplicate card index"));
        assert!(host.calls().is_empty());
    }

    #[test]
    fn discard_needs_remaining_discards() {
        let mut host = hand_host(2, 0, 5);
        let result = dispatch(
            &mut host,
            &command(json!({"type": "DISCARD", "params": {"card_indices": [1]}})),
        )
        .unwrap();
        assert_eq!(result.error.as_deref(), Some("No discards remaining"));
    }

    #[test]
    fn wrong_phase_names_kind_and_phase() {
        let mut host = hand_host(2, 2, 5);
        let result = dispatch(&mut host, &command(json!({"type": "SHOP_END"}))).unwrap();
        assert_eq!(
            result.error.as_deref(),
            Some("SHOP_END not available in phase SELECTING_HAND")
        );
    }

    #[test]
    fn unaffordable_purchase_reports_money() {
        let mut host = MemoryHost::new(
            WorldBuilder::new()
                .shop()
                .money(4)
                .shop_item("Blueprint", "Joker", 10)
                .build(),
        );
        let result = dispatch(
            &mut host,
            &command(json!({"type": "SHOP_BUY", "params": {"slot": 1}})),
        )
        .unwrap();
        assert_eq!(result.error.as_deref(), Some("Not enough money"));
        assert!(host.calls().is_empty());

        let result = dispatch(
            &mut host,
            &command(json!({"type": "SHOP_BUY", "params": {"slot": 2}})),
        )
        .unwrap();
        assert_eq!(result.error.as_deref(), Some("Invalid shop slot"));
    }

    #[test]
    fn missing_host_operation_is_named() {
        let mut host = MemoryHost::new(WorldBuilder::new().shop().money(10).build())
            .without_operation("toggle_shop");
        let result = dispatch(&mut host, &command(json!({"type": "SHOP_END"}))).unwrap();
        assert_eq!(result.error.as_deref(), Some("cannot find toggle_shop function"));
    }

    #[test]
    fn sort_requires_both_sort_operations() {
        let mut host = hand_host(1, 1, 3).without_operation(SORT_BY_SUIT);
        let result = dispatch(
            &mut host,
            &command(json!({"type": "SORT_HAND", "params": {"mode": "rank"}})),
        )
        .unwrap();
        assert_eq!(
            result.error.as_deref(),
            Some("cannot find sort_hand_suit function")
        );
        assert!(host.calls().is_empty());
    }

    #[test]
    fn no_active_run_is_reported() {
        let mut host = MemoryHost::new(WorldBuilder::new().menu().build());
        let result = dispatch(&mut host, &command(json!({"type": "SKIP_BLIND"}))).unwrap();
        assert_eq!(result.error.as_deref(), Some("No active run"));
    }

    #[test]
    fn host_faults_surface_as_errors() {
        let mut host = MemoryHost::new(WorldBuilder::new().blind_select().build())
            .failing_operation("skip_blind");
        let err = dispatch(&mut host, &command(json!({"type": "SKIP_BLIND"}))).unwrap_err();
        assert!(matches!(err, HandlerError::Host(HostError::Fault { .. })));
    }

    #[test]
    fn every_kind_has_an_operation() {
        for kind in ActionKind::ALL {
            assert!(!operations_for(kind).is_empty(), "{kind}");
        }
    }
}
