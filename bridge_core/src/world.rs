//! Named reads over the host world layout.
//!
//! Everything the classifier, snapshot builder, enumerator and dispatcher
//! need from the world goes through here, so that they all observe the same
//! fields with the same fallbacks.

use crate::host::{HostValue, TableRef};

pub const STATE: &str = "STATE";
pub const STATES: &str = "STATES";
pub const GAME: &str = "GAME";

pub const AREA_HAND: &str = "hand";
pub const AREA_JOKERS: &str = "jokers";
pub const AREA_CONSUMABLES: &str = "consumeables";
pub const AREA_SHOP: &str = "shop_jokers";
pub const AREA_PACK: &str = "pack_cards";
pub const AREA_DECK: &str = "deck";
pub const AREA_DISCARD: &str = "discard";

/// Cards held by a card area (`<area>.cards`), empty when absent.
pub fn area_cards(world: &HostValue, area: &str) -> Vec<HostValue> {
    world.path(&[area, "cards"]).sequence()
}

/// The `cards` table of an area, for identity scans.
pub fn area_table(world: &HostValue, area: &str) -> Option<TableRef> {
    world.path(&[area, "cards"]).as_table().cloned()
}

/// Raw state tag and, when the `STATES` table knows it, its name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StateTag {
    pub raw: Option<String>,
    pub name: Option<String>,
}

pub fn state_tag(world: &HostValue) -> StateTag {
    let raw_value = world.get(STATE);
    let raw = raw_value.to_text();
    let name = match world.get(STATES).as_table() {
        Some(states) if !raw_value.is_nil() => states
            .borrow()
            .iter()
            .find(|(_, tag)| same_tag(tag, &raw_value))
            .map(|(name, _)| name.to_string()),
        _ => None,
    };
    StateTag { raw, name }
}

fn same_tag(a: &HostValue, b: &HostValue) -> bool {
    match (a, b) {
        (HostValue::Number(x), HostValue::Number(y)) => x == y,
        (HostValue::Str(x), HostValue::Str(y)) => x == y,
        _ => false,
    }
}

/// One purchasable shop slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ShopSlot {
    pub slot: usize,
    pub cost: i64,
    pub name: Option<String>,
}

/// Resource counters and collection sizes shared by every reader.
///
/// Fields the host has not populated stay `None`; callers decide what an
/// absent counter means for them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceView {
    pub active: bool,
    pub money: Option<i64>,
    pub hands_left: Option<i64>,
    pub discards_left: Option<i64>,
    pub reroll_cost: Option<i64>,
    pub hand_size: usize,
    pub shop: Vec<ShopSlot>,
    pub jokers: Vec<Option<i64>>,
    pub pack_size: usize,
}

impl ResourceView {
    pub fn read(world: &HostValue) -> Self {
        let game = world.get(GAME);
        let round = game.get("current_round");
        let shop = area_cards(world, AREA_SHOP)
            .iter()
            .enumerate()
            .map(|(offset, card)| ShopSlot {
                slot: offset + 1,
                cost: card.get("cost").as_i64().unwrap_or(0),
                name: card_name(card),
            })
            .collect();
        let jokers = area_cards(world, AREA_JOKERS)
            .iter()
            .map(|joker| joker.get("sell_cost").as_i64())
            .collect();

        Self {
            active: game.as_table().is_some(),
            money: game.get("dollars").as_i64(),
            hands_left: round.get("hands_left").as_i64(),
            discards_left: round.get("discards_left").as_i64(),
            reroll_cost: round.get("reroll_cost").as_i64(),
            hand_size: area_cards(world, AREA_HAND).len(),
            shop,
            jokers,
            pack_size: area_cards(world, AREA_PACK).len(),
        }
    }

    /// Spending is checked against zero money when the counter is absent.
    pub fn can_afford(&self, cost: i64) -> bool {
        cost <= self.money.unwrap_or(0)
    }

    pub fn has_hands(&self) -> bool {
        self.hands_left.unwrap_or(0) > 0 && self.hand_size > 0
    }

    pub fn has_discards(&self) -> bool {
        self.discards_left.unwrap_or(0) > 0 && self.hand_size > 0
    }
}

/// Display name of any card-like table: `ability.name`, then
/// `config.center.name`, then `base.name`.
pub fn card_name(card: &HostValue) -> Option<String> {
    first_text(card, &[&["ability", "name"], &["config", "center", "name"], &["base", "name"]])
}

/// First path in `chain` holding a scalar, rendered as text.
pub fn first_text(value: &HostValue, chain: &[&[&str]]) -> Option<String> {
    chain.iter().find_map(|path| value.path(path).to_text())
}
