use bridge_runtime::{
    ActionDescriptor, ActionKind, ActionParams, CardSelection, LegalActionSet, Phase,
};

use crate::world::ResourceView;

/// Largest selection a played hand may contain.
pub const MAX_PLAY_SELECTION: usize = 5;

pub const SORT_MODES: [&str; 2] = ["rank", "suit"];
pub const BLIND_OPTIONS: [&str; 3] = ["small", "big", "boss"];

/// Actions the dispatcher will accept for `phase` given `resources`.
///
/// Both must come from the same world read as the accompanying snapshot.
pub fn enumerate(phase: &Phase, resources: &ResourceView) -> LegalActionSet {
    let actions = if resources.active {
        match phase {
            Phase::SelectingHand => selecting_hand(resources),
            Phase::Shop => shop(resources),
            Phase::BlindSelect => blind_select(),
            Phase::PackOpening => pack_opening(resources),
            _ => Vec::new(),
        }
    } else {
        Vec::new()
    };
    LegalActionSet::new(phase.clone(), actions)
}

fn card_selection(hand_size: usize, max_select: usize) -> ActionParams {
    ActionParams {
        card_indices: Some(CardSelection {
            available: (1..=hand_size).collect(),
            min_select: 1,
            max_select,
        }),
        ..Default::default()
    }
}

fn selecting_hand(resources: &ResourceView) -> Vec<ActionDescriptor> {
    let mut actions = Vec::new();
    if resources.has_hands() {
        actions.push(
            ActionDescriptor::new(ActionKind::PlayHand, "Play 1-5 cards from hand").with_params(
                card_selection(
                    resources.hand_size,
                    resources.hand_size.min(MAX_PLAY_SELECTION),
                ),
            ),
        );
    }
    if resources.has_discards() {
        actions.push(
            ActionDescriptor::new(ActionKind::Discard, "Discard cards from hand")
                .with_params(card_selection(resources.hand_size, resources.hand_size)),
        );
    }
    actions.push(
        ActionDescriptor::new(ActionKind::SortHand, "Sort hand by rank or suit").with_params(
            ActionParams {
                mode: Some(SORT_MODES.iter().map(|mode| mode.to_string()).collect()),
                ..Default::default()
            },
        ),
    );
    actions
}

fn shop(resources: &ResourceView) -> Vec<ActionDescriptor> {
    let mut actions = Vec::new();
    for item in &resources.shop {
        if !resources.can_afford(item.cost) {
            continue;
        }
        let description = match &item.name {
            Some(name) => format!("Buy {name} for ${}", item.cost),
            None => format!("Buy shop slot {} for ${}", item.slot, item.cost),
        };
        actions.push(
            ActionDescriptor::new(ActionKind::ShopBuy, description).with_params(ActionParams {
                slot: Some(item.slot),
                cost: Some(item.cost),
                ..Default::default()
            }),
        );
    }

    let reroll_cost = resources.reroll_cost.unwrap_or(0);
    if resources.can_afford(reroll_cost) {
        actions.push(
            ActionDescriptor::new(ActionKind::ShopReroll, format!("Reroll shop for ${reroll_cost}"))
                .with_params(ActionParams {
                    cost: Some(reroll_cost),
                    ..Default::default()
                }),
        );
    }

    for (offset, sell_cost) in resources.jokers.iter().enumerate() {
        let joker_index = offset + 1;
        let sell_value = sell_cost.unwrap_or(0);
        actions.push(
            ActionDescriptor::new(
                ActionKind::ShopSellJoker,
                format!("Sell joker {joker_index} for ${sell_value}"),
            )
            .with_params(ActionParams {
                joker_index: Some(joker_index),
                sell_value: Some(sell_value),
                ..Default::default()
            }),
        );
    }

    actions.push(ActionDescriptor::new(ActionKind::ShopEnd, "Leave the shop"));
    actions
}

fn blind_select() -> Vec<ActionDescriptor> {
    vec![
        ActionDescriptor::new(ActionKind::SelectBlind, "Play the upcoming blind").with_params(
            ActionParams {
                options: Some(BLIND_OPTIONS.iter().map(|option| option.to_string()).collect()),
                ..Default::default()
            },
        ),
        ActionDescriptor::new(ActionKind::SkipBlind, "Skip the upcoming blind"),
    ]
}

fn pack_opening(resources: &ResourceView) -> Vec<ActionDescriptor> {
    let mut actions: Vec<_> = (1..=resources.pack_size)
        .map(|choice_index| {
            ActionDescriptor::new(
                ActionKind::SelectPackItem,
                format!("Take pack card {choice_index}"),
            )
            .with_params(ActionParams {
                choice_index: Some(choice_index),
                ..Default::default()
            })
        })
        .collect();
    actions.push(ActionDescriptor::new(ActionKind::SkipPack, "Skip the rest of the pack"));
    actions
}
