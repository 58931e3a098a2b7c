//! Assembly of the state document from a single world read.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use bridge_runtime::{
    BlindView, CardView, ConsumableView, DeckCounts, GameState, HandLevel, JokerView,
    PackItemView, PackView, Phase, ShopItemView, ShopView, SCHEMA_VERSION,
};

use crate::codec::host_to_json;
use crate::host::{HostValue, TableRef};
use crate::world::{
    area_cards, area_table, card_name, first_text, AREA_CONSUMABLES, AREA_DECK, AREA_DISCARD,
    AREA_HAND, AREA_JOKERS, AREA_PACK, AREA_SHOP, GAME,
};

pub const NO_ACTIVE_RUN: &str = "No active run";

const EDITION_PRIORITY: [&str; 4] = ["foil", "holo", "polychrome", "negative"];

static LAST_TIMESTAMP_MS: AtomicU64 = AtomicU64::new(0);

/// Milliseconds since the Unix epoch, never lower than a value already handed out.
pub fn now_ms() -> u64 {
    let wall = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0);
    clamp_forward(&LAST_TIMESTAMP_MS, wall)
}

fn clamp_forward(last: &AtomicU64, wall: u64) -> u64 {
    last.fetch_max(wall, Ordering::Relaxed).max(wall)
}

/// Build a fresh state document. `phase` must come from the same world read.
pub fn build_snapshot(world: &HostValue, phase: Phase, timestamp_ms: u64) -> GameState {
    let game = world.get(GAME);
    if game.as_table().is_none() {
        return GameState::inactive(phase, timestamp_ms, NO_ACTIVE_RUN);
    }
    let round = game.get("current_round");

    GameState {
        schema_version: SCHEMA_VERSION.to_string(),
        timestamp_ms,
        phase,
        error: None,
        run_id: game.path(&["pseudorandom", "seed"]).to_text(),
        round: game.get("round").as_i64().unwrap_or(0),
        ante: game.path(&["round_resets", "ante"]).as_i64().unwrap_or(0),
        money: game.get("dollars").as_i64().unwrap_or(0),
        hands_remaining: round.get("hands_left").as_i64().unwrap_or(0),
        discards_remaining: round.get("discards_left").as_i64().unwrap_or(0),
        hands_played: round.get("hands_played").as_i64().unwrap_or(0),
        blind: blind_view(&game),
        hand: hand_cards(world),
        jokers: jokers(world),
        consumables: consumables(world),
        shop: shop_view(world, &round),
        pack: pack_view(world),
        deck_counts: DeckCounts {
            deck_size: area_cards(world, AREA_DECK).len(),
            discard_size: area_cards(world, AREA_DISCARD).len(),
        },
        hand_levels: hand_levels(&game),
    }
}

/// 1-based position of `card` in `area`, compared by identity.
pub fn position_in(area: &TableRef, card: &HostValue) -> Option<usize> {
    let card = card.as_table()?;
    area.sequence()
        .iter()
        .position(|item| item.as_table().is_some_and(|item| item.ptr_eq(card)))
        .map(|offset| offset + 1)
}

fn blind_view(game: &HostValue) -> Option<BlindView> {
    let blind = game.get("blind");
    blind.as_table()?;
    Some(BlindView {
        name: blind.get("name").to_text(),
        chips_needed: blind.get("chips").as_i64(),
        chips_scored: game.get("chips").as_i64().unwrap_or(0),
        boss: blind.get("boss").truthy(),
        debuff_text: blind.get("debuff_text").to_text(),
    })
}

fn hand_cards(world: &HostValue) -> Vec<CardView> {
    let area = area_table(world, AREA_HAND);
    area_cards(world, AREA_HAND)
        .iter()
        .enumerate()
        .map(|(offset, card)| {
            let area_index = area.as_ref().and_then(|area| position_in(area, card));
            CardView {
                id: card_id(card).unwrap_or_else(|| format!("hand_{}", offset + 1)),
                rank: first_text(card, &[&["base", "value"], &["config", "card", "value"]]),
                suit: first_text(card, &[&["base", "suit"], &["config", "card", "suit"]]),
                name: first_text(card, &[&["base", "name"], &["config", "card", "name"]]),
                edition: edition_name(card),
                enhancement: enhancement(card),
                seal: card.get("seal").to_text(),
                debuffed: card.get("debuff").truthy(),
                facing: card
                    .get("facing")
                    .to_text()
                    .unwrap_or_else(|| "front".to_string()),
                highlighted: card.get("highlighted").truthy(),
                hand_index: area_index,
                area_index,
            }
        })
        .collect()
}

fn card_id(card: &HostValue) -> Option<String> {
    card.get("unique_val")
        .to_text()
        .or_else(|| card.get("sort_id").to_text())
}

/// First set flag in `foil > holo > polychrome > negative`.
fn edition_name(card: &HostValue) -> Option<String> {
    let edition = card.get("edition");
    EDITION_PRIORITY
        .iter()
        .find(|flag| edition.get(flag).truthy())
        .map(|flag| flag.to_string())
}

fn enhancement(card: &HostValue) -> Option<String> {
    let enhanced = card.path(&["config", "center", "set"]).as_str() == Some("Enhanced")
        || card.path(&["ability", "set"]).as_str() == Some("Enhanced");
    if !enhanced {
        return None;
    }
    first_text(card, &[&["config", "center", "name"], &["ability", "name"]])
}

fn jokers(world: &HostValue) -> Vec<JokerView> {
    let area = area_table(world, AREA_JOKERS);
    area_cards(world, AREA_JOKERS)
        .iter()
        .enumerate()
        .map(|(offset, joker)| {
            let area_index = area.as_ref().and_then(|area| position_in(area, joker));
            let joker_index = area_index.unwrap_or(offset + 1);
            JokerView {
                id: card_id(joker).unwrap_or_else(|| format!("joker_{joker_index}")),
                name: card_name(joker),
                key: joker.path(&["config", "center", "key"]).to_text(),
                rarity: joker.path(&["config", "center", "rarity"]).as_i64(),
                sell_cost: joker.get("sell_cost").as_i64().unwrap_or(0),
                ability: raw_table(&joker.get("ability")),
                edition: raw_table(&joker.get("edition")),
                joker_index,
                area_index,
            }
        })
        .collect()
}

fn raw_table(value: &HostValue) -> Option<serde_json::Value> {
    value.as_table().map(|_| host_to_json(value))
}

fn consumables(world: &HostValue) -> Vec<ConsumableView> {
    area_cards(world, AREA_CONSUMABLES)
        .iter()
        .enumerate()
        .map(|(offset, card)| ConsumableView {
            index: offset + 1,
            name: card_name(card),
            key: card.path(&["config", "center", "key"]).to_text(),
        })
        .collect()
}

fn item_kind(card: &HostValue) -> String {
    first_text(card, &[&["ability", "set"], &["config", "center", "set"]])
        .map(|set| set.to_ascii_lowercase())
        .unwrap_or_else(|| "unknown".to_string())
}

fn shop_view(world: &HostValue, round: &HostValue) -> Option<ShopView> {
    let cards = area_cards(world, AREA_SHOP);
    if cards.is_empty() {
        return None;
    }
    let items = cards
        .iter()
        .enumerate()
        .map(|(offset, card)| ShopItemView {
            slot: offset + 1,
            name: card_name(card),
            cost: card.get("cost").as_i64().unwrap_or(0),
            kind: item_kind(card),
        })
        .collect();
    Some(ShopView {
        items,
        reroll_cost: round.get("reroll_cost").as_i64().unwrap_or(0),
    })
}

fn pack_view(world: &HostValue) -> Option<PackView> {
    let cards = area_cards(world, AREA_PACK);
    if cards.is_empty() {
        return None;
    }
    let cards = cards
        .iter()
        .enumerate()
        .map(|(offset, card)| PackItemView {
            index: offset + 1,
            name: card_name(card),
            key: card.path(&["config", "center", "key"]).to_text(),
            kind: item_kind(card),
        })
        .collect();
    Some(PackView { cards })
}

fn hand_levels(game: &HostValue) -> BTreeMap<String, HandLevel> {
    let Some(hands) = game.get("hands").as_table().cloned() else {
        return BTreeMap::new();
    };
    let hands = hands.borrow();
    hands
        .iter()
        .filter(|(_, entry)| entry.get("visible").as_bool() != Some(false))
        .filter_map(|(name, entry)| {
            let level = entry.get("level").as_i64()?;
            Some((
                name.to_string(),
                HandLevel {
                    level,
                    mult: entry.get("mult").as_f64(),
                    chips: entry.get("chips").as_i64(),
                },
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing_card(id: i64, value: &str, suit: &str) -> HostValue {
        HostValue::table([
            ("unique_val", HostValue::from(id)),
            (
                "base",
                HostValue::table([
                    ("value", HostValue::from(value)),
                    ("suit", HostValue::from(suit)),
                    ("name", HostValue::from(format!("{value} of {suit}"))),
                ]),
            ),
        ])
    }

    fn area(cards: Vec<HostValue>) -> HostValue {
        HostValue::table([("cards", HostValue::list(cards))])
    }

    #[test]
    fn missing_game_reports_no_active_run() {
        let state = build_snapshot(&HostValue::Nil, Phase::Menu, 7);
        assert_eq!(state.error.as_deref(), Some(NO_ACTIVE_RUN));
        assert_eq!(state.phase, Phase::Menu);
        assert_eq!(state.timestamp_ms, 7);
        assert!(state.hand.is_empty());
    }

    #[test]
    fn partial_game_defaults_at_the_boundary() {
        let world = HostValue::table([(GAME, HostValue::table([("dollars", HostValue::from(9i64))]))]);
        let state = build_snapshot(&world, Phase::Unknown, 0);
        assert_eq!(state.error, None);
        assert_eq!(state.money, 9);
        assert_eq!(state.hands_remaining, 0);
        assert_eq!(state.blind, None);
        assert_eq!(state.shop, None);
        assert_eq!(state.deck_counts, DeckCounts::default());
    }

    #[test]
    fn hand_cards_use_fallback_chains() {
        let alternate = HostValue::table([
            ("sort_id", HostValue::from(77i64)),
            (
                "config",
                HostValue::table([(
                    "card",
                    HostValue::table([
                        ("value", HostValue::from("King")),
                        ("suit", HostValue::from("Hearts")),
                    ]),
                )]),
            ),
            (
                "edition",
                HostValue::table([
                    ("negative", HostValue::Bool(true)),
                    ("holo", HostValue::Bool(true)),
                ]),
            ),
            ("highlighted", HostValue::Bool(true)),
        ]);
        let world = HostValue::table([
            (GAME, HostValue::Table(TableRef::new())),
            (AREA_HAND, area(vec![playing_card(3, "Ace", "Spades"), alternate])),
        ]);
        let state = build_snapshot(&world, Phase::SelectingHand, 0);
        assert_eq!(state.hand.len(), 2);

        let first = &state.hand[0];
        assert_eq!(first.id, "3");
        assert_eq!(first.rank.as_deref(), Some("Ace"));
        assert_eq!(first.name.as_deref(), Some("Ace of Spades"));
        assert_eq!(first.hand_index, Some(1));
        assert_eq!(first.facing, "front");

        let second = &state.hand[1];
        assert_eq!(second.id, "77");
        assert_eq!(second.rank.as_deref(), Some("King"));
        assert_eq!(second.suit.as_deref(), Some("Hearts"));
        assert_eq!(second.name, None);
        assert_eq!(second.edition.as_deref(), Some("holo"));
        assert!(second.highlighted);
        assert_eq!(second.hand_index, Some(2));
        assert_eq!(second.area_index, Some(2));
    }

    #[test]
    fn identity_scan_distinguishes_equal_looking_cards() {
        let a = playing_card(1, "2", "Clubs");
        let b = playing_card(1, "2", "Clubs");
        let hand = TableRef::from_sequence([a.clone(), b.clone()]);
        assert_eq!(position_in(&hand, &b), Some(2));
        assert_eq!(position_in(&hand, &a), Some(1));
        assert_eq!(position_in(&hand, &playing_card(1, "2", "Clubs")), None);
    }

    #[test]
    fn area_index_follows_the_owning_area() {
        let first = HostValue::table([("unique_val", HostValue::from(1i64))]);
        let second = HostValue::table([("unique_val", HostValue::from(2i64))]);
        let world = HostValue::table([
            (GAME, HostValue::Table(TableRef::new())),
            (AREA_HAND, area(vec![playing_card(9, "Ten", "Clubs")])),
            (AREA_JOKERS, area(vec![first, second])),
        ]);
        let state = build_snapshot(&world, Phase::SelectingHand, 0);
        assert_eq!(state.hand[0].area_index, Some(1));
        let slots: Vec<_> = state.jokers.iter().map(|joker| joker.area_index).collect();
        assert_eq!(slots, [Some(1), Some(2)]);

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["hand"][0]["area_index"], 1);
        assert_eq!(json["jokers"][1]["area_index"], 2);
    }

    #[test]
    fn jokers_carry_raw_ability_tables() {
        let joker = HostValue::table([
            ("unique_val", HostValue::from(12i64)),
            ("sell_cost", HostValue::from(3i64)),
            (
                "ability",
                HostValue::table([
                    ("name", HostValue::from("Greedy Joker")),
                    ("extra", HostValue::table([("s_mult", HostValue::from(3i64))])),
                ]),
            ),
            (
                "config",
                HostValue::table([(
                    "center",
                    HostValue::table([
                        ("key", HostValue::from("j_greedy_joker")),
                        ("rarity", HostValue::from(1i64)),
                    ]),
                )]),
            ),
        ]);
        let world = HostValue::table([
            (GAME, HostValue::Table(TableRef::new())),
            (AREA_JOKERS, area(vec![joker])),
        ]);
        let state = build_snapshot(&world, Phase::Shop, 0);
        let joker = &state.jokers[0];
        assert_eq!(joker.name.as_deref(), Some("Greedy Joker"));
        assert_eq!(joker.key.as_deref(), Some("j_greedy_joker"));
        assert_eq!(joker.rarity, Some(1));
        assert_eq!(joker.sell_cost, 3);
        assert_eq!(joker.joker_index, 1);
        assert_eq!(joker.area_index, Some(1));
        assert_eq!(
            joker.ability,
            Some(serde_json::json!({"name": "Greedy Joker", "extra": {"s_mult": 3}}))
        );
        assert_eq!(joker.edition, None);
    }

    #[test]
    fn shop_and_levels_are_read() {
        let item = HostValue::table([
            ("cost", HostValue::from(6i64)),
            (
                "ability",
                HostValue::table([
                    ("name", HostValue::from("Jupiter")),
                    ("set", HostValue::from("Planet")),
                ]),
            ),
        ]);
        let game = HostValue::table([
            (
                "current_round",
                HostValue::table([("reroll_cost", HostValue::from(5i64))]),
            ),
            (
                "hands",
                HostValue::table([
                    (
                        "Flush",
                        HostValue::table([
                            ("level", HostValue::from(2i64)),
                            ("mult", HostValue::from(6.0)),
                            ("chips", HostValue::from(50i64)),
                            ("visible", HostValue::Bool(true)),
                        ]),
                    ),
                    (
                        "Flush Five",
                        HostValue::table([
                            ("level", HostValue::from(1i64)),
                            ("visible", HostValue::Bool(false)),
                        ]),
                    ),
                ]),
            ),
        ]);
        let world = HostValue::table([(GAME, game), (AREA_SHOP, area(vec![item]))]);
        let state = build_snapshot(&world, Phase::Shop, 0);

        let shop = state.shop.expect("shop");
        assert_eq!(shop.reroll_cost, 5);
        assert_eq!(shop.items[0].slot, 1);
        assert_eq!(shop.items[0].kind, "planet");
        assert_eq!(shop.items[0].name.as_deref(), Some("Jupiter"));

        assert_eq!(state.hand_levels.len(), 1);
        assert_eq!(state.hand_levels["Flush"].mult, Some(6.0));
    }

    #[test]
    fn timestamps_never_step_backwards() {
        let last = AtomicU64::new(0);
        assert_eq!(clamp_forward(&last, 1_000), 1_000);
        assert_eq!(clamp_forward(&last, 900), 1_000);
        assert_eq!(clamp_forward(&last, 1_200), 1_200);

        let first = now_ms();
        let second = now_ms();
        assert!(second >= first);
    }
}
