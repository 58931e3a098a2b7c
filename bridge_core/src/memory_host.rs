//! In-process host world for headless runs and tests.
//!
//! Lays out a card run the way the bridge expects to find it and implements
//! every host operation the dispatcher can call. Hand resolution is spread
//! over several frames, so callers see the intermediate phases between an
//! action and the next decision point.

use std::collections::{BTreeSet, VecDeque};

use crate::host::{Host, HostError, HostValue, TableRef};
use crate::snapshot::position_in;
use crate::world::{
    AREA_CONSUMABLES, AREA_DECK, AREA_DISCARD, AREA_HAND, AREA_JOKERS, AREA_PACK, AREA_SHOP,
    GAME, STATE, STATES,
};

/// Every operation a [`MemoryHost`] provides.
pub const OPERATIONS: [&str; 12] = [
    "play_cards_from_highlighted",
    "discard_cards_from_highlighted",
    "buy_from_shop",
    "reroll_shop",
    "sell_card",
    "toggle_shop",
    "sort_hand_value",
    "sort_hand_suit",
    "use_card",
    "skip_booster",
    "select_blind",
    "skip_blind",
];

const STATE_TAGS: [(&str, i64); 19] = [
    ("SELECTING_HAND", 1),
    ("HAND_PLAYED", 2),
    ("DRAW_TO_HAND", 3),
    ("GAME_OVER", 4),
    ("SHOP", 5),
    ("PLAY_TAROT", 6),
    ("BLIND_SELECT", 7),
    ("ROUND_EVAL", 8),
    ("TAROT_PACK", 9),
    ("PLANET_PACK", 10),
    ("MENU", 11),
    ("TUTORIAL", 12),
    ("SPLASH", 13),
    ("SANDBOX", 14),
    ("SPECTRAL_PACK", 15),
    ("DEMO_CTA", 16),
    ("STANDARD_PACK", 17),
    ("BUFFOON_PACK", 18),
    ("NEW_ROUND", 19),
];

const SUITS: [&str; 4] = ["Spades", "Hearts", "Clubs", "Diamonds"];
const RANKS: [&str; 13] = [
    "2", "3", "4", "5", "6", "7", "8", "9", "10", "Jack", "Queen", "King", "Ace",
];
const BLIND_TIERS: [(&str, &str, i64); 3] = [
    ("small", "Small Blind", 100),
    ("big", "Big Blind", 150),
    ("boss", "The Hook", 200),
];

/// Shop catalog cycled on restock: name, key, set, cost.
const CATALOG: [(&str, &str, &str, i64); 6] = [
    ("Joker", "j_joker", "Joker", 2),
    ("Jupiter", "c_jupiter", "Planet", 3),
    ("Arcana Pack", "p_arcana_normal_1", "Booster", 4),
    ("Greedy Joker", "j_greedy_joker", "Joker", 5),
    ("The Fool", "c_fool", "Tarot", 3),
    ("Blueprint", "j_blueprint", "Joker", 10),
];
const PACK_CONTENTS: [(&str, &str, &str); 3] = [
    ("The Magician", "c_magician", "Tarot"),
    ("Strength", "c_strength", "Tarot"),
    ("The Hermit", "c_hermit", "Tarot"),
];

/// Shop stock set aside while a booster pack is open.
const AREA_SHOP_STASH: &str = "shop_stash";

const DEFAULT_HAND_SIZE: i64 = 8;
const JOKER_SLOTS: usize = 5;
const SHOP_SLOTS: usize = 2;
const ROUND_HANDS: i64 = 4;
const ROUND_DISCARDS: i64 = 3;
const BASE_REROLL_COST: i64 = 5;

pub fn state_tag_for(name: &str) -> Option<i64> {
    STATE_TAGS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, tag)| *tag)
}

/// Work left over from an action, applied one step per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    DrawToHand,
    Settle,
}

pub struct MemoryHost {
    root: TableRef,
    disabled: BTreeSet<String>,
    failing: BTreeSet<String>,
    calls: Vec<String>,
    transitions: VecDeque<Transition>,
    next_id: i64,
    stock_cursor: usize,
}

impl MemoryHost {
    pub fn new(root: TableRef) -> Self {
        Self {
            root,
            disabled: BTreeSet::new(),
            failing: BTreeSet::new(),
            calls: Vec::new(),
            transitions: VecDeque::new(),
            next_id: 100_000,
            stock_cursor: 0,
        }
    }

    /// A fresh run waiting at the first blind with a full deck.
    pub fn demo() -> Self {
        Self::new(WorldBuilder::demo_run().build())
    }

    /// Remove an operation, as if the host build did not ship it.
    pub fn without_operation(mut self, name: &str) -> Self {
        self.disabled.insert(name.to_string());
        self
    }

    /// Make an operation fail with a host fault when invoked.
    pub fn failing_operation(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    /// Names of every operation invoked so far, in order.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    pub fn root(&self) -> &TableRef {
        &self.root
    }

    pub fn has_pending_transitions(&self) -> bool {
        !self.transitions.is_empty()
    }

    /// Apply one queued transition step. Returns `false` when idle.
    pub fn advance_frame(&mut self) -> bool {
        let Some(step) = self.transitions.pop_front() else {
            return false;
        };
        match step {
            Transition::DrawToHand => {
                self.set_state("DRAW_TO_HAND");
                self.draw_to_hand();
            }
            Transition::Settle => self.settle(),
        }
        true
    }

    /// Drain every queued transition.
    pub fn settle_frames(&mut self) {
        while self.advance_frame() {}
    }

    fn game(&self) -> Result<TableRef, HostError> {
        self.root
            .get(GAME)
            .as_table()
            .cloned()
            .ok_or_else(|| HostError::Rejected("No active run".to_string()))
    }

    fn round(&self) -> Result<TableRef, HostError> {
        let game = self.game()?;
        Ok(child_table(&game, "current_round"))
    }

    fn cards(&self, area: &str) -> TableRef {
        let holder = child_table(&self.root, area);
        child_table(&holder, "cards")
    }

    fn set_state(&self, name: &str) {
        match state_tag_for(name) {
            Some(tag) => self.root.set(STATE, tag),
            None => self.root.set(STATE, name),
        }
    }

    /// Name of the current state tag, for logging.
    pub fn current_state(&self) -> Option<String> {
        let raw = self.root.get(STATE);
        STATE_TAGS
            .iter()
            .find(|(_, tag)| raw.as_i64() == Some(*tag))
            .map(|(name, _)| name.to_string())
            .or_else(|| raw.as_str().map(str::to_string))
    }

    fn hand_size(&self) -> usize {
        self.game()
            .ok()
            .and_then(|game| game.get("hand_size").as_i64())
            .unwrap_or(DEFAULT_HAND_SIZE)
            .max(0) as usize
    }

    fn fresh_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn draw_to_hand(&self) {
        let hand = self.cards(AREA_HAND);
        let deck = self.cards(AREA_DECK);
        let mut held = hand.sequence();
        let mut remaining = deck.sequence().into_iter();
        while held.len() < self.hand_size() {
            match remaining.next() {
                Some(card) => held.push(card),
                None => break,
            }
        }
        hand.replace_sequence(held);
        deck.replace_sequence(remaining.collect());
    }

    /// Return hand and discard pile to the deck.
    fn collect_cards(&self) {
        let deck = self.cards(AREA_DECK);
        let mut cards = deck.sequence();
        for area in [AREA_HAND, AREA_DISCARD] {
            let pile = self.cards(area);
            for card in pile.sequence() {
                if let Some(card) = card.as_table() {
                    card.set("highlighted", false);
                }
                cards.push(card);
            }
            pile.replace_sequence(Vec::new());
        }
        deck.replace_sequence(cards);
    }

    fn settle(&mut self) {
        let (Ok(game), Ok(round)) = (self.game(), self.round()) else {
            return;
        };
        let scored = counter(&game, "chips");
        let needed = child_table(&game, "blind").get("chips").as_i64().unwrap_or(0);
        if scored >= needed {
            let reward = 3 + counter(&round, "hands_left");
            game.set("dollars", counter(&game, "dollars") + reward);
            game.set("chips", 0i64);
            self.collect_cards();
            self.advance_blind_tier(&game);
            round.set("reroll_cost", BASE_REROLL_COST);
            self.restock();
            self.set_state("SHOP");
        } else if counter(&round, "hands_left") <= 0 {
            self.set_state("GAME_OVER");
        } else {
            self.set_state("SELECTING_HAND");
        }
    }

    fn advance_blind_tier(&self, game: &TableRef) {
        let tier = counter(game, "blind_tier") + 1;
        if tier as usize >= BLIND_TIERS.len() {
            game.set("blind_tier", 0i64);
            let resets = child_table(game, "round_resets");
            resets.set("ante", counter(&resets, "ante") + 1);
        } else {
            game.set("blind_tier", tier);
        }
    }

    fn restock(&mut self) {
        let shop = self.cards(AREA_SHOP);
        let mut items = Vec::with_capacity(SHOP_SLOTS);
        for _ in 0..SHOP_SLOTS {
            let (name, key, set, cost) = CATALOG[self.stock_cursor % CATALOG.len()];
            self.stock_cursor += 1;
            let id = self.fresh_id();
            items.push(center_card(id, name, key, set, cost));
        }
        shop.replace_sequence(items);
    }

    fn open_pack(&mut self) {
        let shop = self.cards(AREA_SHOP);
        self.cards(AREA_SHOP_STASH).replace_sequence(shop.sequence());
        shop.replace_sequence(Vec::new());

        let pack = self.cards(AREA_PACK);
        let mut cards = Vec::with_capacity(PACK_CONTENTS.len());
        for (name, key, set) in PACK_CONTENTS {
            let id = self.fresh_id();
            cards.push(center_card(id, name, key, set, 0));
        }
        pack.replace_sequence(cards);
        self.set_state("TAROT_PACK");
    }

    fn close_pack(&self) {
        self.cards(AREA_PACK).replace_sequence(Vec::new());
        let stash = self.cards(AREA_SHOP_STASH);
        let mut stock = self.cards(AREA_SHOP).sequence();
        stock.extend(stash.sequence());
        self.cards(AREA_SHOP).replace_sequence(stock);
        stash.replace_sequence(Vec::new());
        self.set_state("SHOP");
    }

    fn play(&mut self, args: &[HostValue]) -> Result<(), HostError> {
        let game = self.game()?;
        let round = self.round()?;
        if counter(&round, "hands_left") <= 0 {
            return Err(HostError::Rejected("No hands remaining".to_string()));
        }
        let played = take_cards(&self.cards(AREA_HAND), args, "Card is not in hand")?;
        let chips: i64 = played.iter().map(nominal).sum::<i64>() * played.len() as i64;

        let discard = self.cards(AREA_DISCARD);
        let mut pile = discard.sequence();
        pile.extend(played);
        discard.replace_sequence(pile);

        game.set("chips", counter(&game, "chips") + chips);
        round.set("hands_left", counter(&round, "hands_left") - 1);
        round.set("hands_played", counter(&round, "hands_played") + 1);
        self.set_state("HAND_PLAYED");
        self.transitions
            .extend([Transition::DrawToHand, Transition::Settle]);
        Ok(())
    }

    fn discard(&mut self, args: &[HostValue]) -> Result<(), HostError> {
        let round = self.round()?;
        if counter(&round, "discards_left") <= 0 {
            return Err(HostError::Rejected("No discards remaining".to_string()));
        }
        let dropped = take_cards(&self.cards(AREA_HAND), args, "Card is not in hand")?;
        let discard = self.cards(AREA_DISCARD);
        let mut pile = discard.sequence();
        pile.extend(dropped);
        discard.replace_sequence(pile);

        round.set("discards_left", counter(&round, "discards_left") - 1);
        self.set_state("DRAW_TO_HAND");
        self.transitions
            .extend([Transition::DrawToHand, Transition::Settle]);
        Ok(())
    }

    fn buy(&mut self, args: &[HostValue]) -> Result<(), HostError> {
        let game = self.game()?;
        let shop = self.cards(AREA_SHOP);
        let card = first_arg(args)?;
        if position_in(&shop, card).is_none() {
            return Err(HostError::Rejected("Item is not in the shop".to_string()));
        }
        let cost = card.get("cost").as_i64().unwrap_or(0);
        if counter(&game, "dollars") < cost {
            return Err(HostError::Rejected("Not enough money".to_string()));
        }
        let set = card.path(&["ability", "set"]).to_text().unwrap_or_default();
        let jokers = self.cards(AREA_JOKERS);
        if set == "Joker" && jokers.sequence().len() >= JOKER_SLOTS {
            return Err(HostError::Rejected("Joker slots full".to_string()));
        }

        let bought = take_cards(&shop, std::slice::from_ref(card), "Item is not in the shop")?;
        game.set("dollars", counter(&game, "dollars") - cost);
        for item in bought {
            match set.as_str() {
                "Booster" => self.open_pack(),
                "Joker" => {
                    if let Some(table) = item.as_table() {
                        table.set("sell_cost", (cost / 2).max(1));
                    }
                    push_card(&jokers, item);
                }
                _ => push_card(&self.cards(AREA_CONSUMABLES), item),
            }
        }
        Ok(())
    }

    fn reroll(&mut self) -> Result<(), HostError> {
        let game = self.game()?;
        let round = self.round()?;
        let cost = counter(&round, "reroll_cost");
        if counter(&game, "dollars") < cost {
            return Err(HostError::Rejected("Not enough money".to_string()));
        }
        game.set("dollars", counter(&game, "dollars") - cost);
        round.set("reroll_cost", cost + 1);
        self.restock();
        Ok(())
    }

    fn sell(&mut self, args: &[HostValue]) -> Result<(), HostError> {
        let game = self.game()?;
        let card = first_arg(args)?;
        let sold = take_cards(&self.cards(AREA_JOKERS), std::slice::from_ref(card), "Joker is not owned")?;
        let value: i64 = sold
            .iter()
            .map(|joker| joker.get("sell_cost").as_i64().unwrap_or(0))
            .sum();
        game.set("dollars", counter(&game, "dollars") + value);
        Ok(())
    }

    fn leave_shop(&mut self) -> Result<(), HostError> {
        let game = self.game()?;
        self.cards(AREA_SHOP).replace_sequence(Vec::new());
        self.cards(AREA_PACK).replace_sequence(Vec::new());
        self.cards(AREA_SHOP_STASH).replace_sequence(Vec::new());
        game.set("round", counter(&game, "round") + 1);
        self.set_state("BLIND_SELECT");
        Ok(())
    }

    fn sort_hand(&mut self, by_suit: bool) -> Result<(), HostError> {
        let hand = self.cards(AREA_HAND);
        let mut cards = hand.sequence();
        if by_suit {
            cards.sort_by_key(|card| (suit_order(card), std::cmp::Reverse(rank_order(card))));
        } else {
            cards.sort_by_key(|card| (std::cmp::Reverse(rank_order(card)), suit_order(card)));
        }
        hand.replace_sequence(cards);
        Ok(())
    }

    fn use_pack_card(&mut self, args: &[HostValue]) -> Result<(), HostError> {
        let card = first_arg(args)?;
        let taken = take_cards(&self.cards(AREA_PACK), std::slice::from_ref(card), "Card is not in the pack")?;
        for item in taken {
            let area = if item.path(&["ability", "set"]).as_str() == Some("Joker") {
                AREA_JOKERS
            } else {
                AREA_CONSUMABLES
            };
            push_card(&self.cards(area), item);
        }
        self.close_pack();
        Ok(())
    }

    fn skip_pack(&mut self) -> Result<(), HostError> {
        self.close_pack();
        Ok(())
    }

    fn select_blind(&mut self, args: &[HostValue]) -> Result<(), HostError> {
        let game = self.game()?;
        let round = self.round()?;
        let tier = counter(&game, "blind_tier").clamp(0, BLIND_TIERS.len() as i64 - 1) as usize;
        let (option, name, chips) = BLIND_TIERS[tier];
        let requested = args.first().and_then(HostValue::as_str).unwrap_or(option);
        if requested != option {
            return Err(HostError::Rejected(format!("Upcoming blind is {option}")));
        }

        let blind = child_table(&game, "blind");
        let ante = child_table(&game, "round_resets").get("ante").as_i64().unwrap_or(1).max(1);
        blind.set("name", name);
        blind.set("chips", chips * ante);
        blind.set("boss", option == "boss");
        blind.set(
            "debuff_text",
            (option == "boss").then_some("Discards 2 random cards per hand played"),
        );
        game.set("chips", 0i64);
        round.set("hands_left", ROUND_HANDS);
        round.set("discards_left", ROUND_DISCARDS);
        round.set("hands_played", 0i64);

        self.collect_cards();
        self.draw_to_hand();
        self.set_state("SELECTING_HAND");
        Ok(())
    }

    fn skip_blind(&mut self) -> Result<(), HostError> {
        let game = self.game()?;
        let tier = counter(&game, "blind_tier");
        if tier as usize + 1 >= BLIND_TIERS.len() {
            return Err(HostError::Rejected("Boss blind cannot be skipped".to_string()));
        }
        game.set("blind_tier", tier + 1);
        game.set("skips", counter(&game, "skips") + 1);
        Ok(())
    }
}

impl Host for MemoryHost {
    fn world(&self) -> HostValue {
        HostValue::Table(self.root.clone())
    }

    fn has_operation(&self, name: &str) -> bool {
        OPERATIONS.contains(&name) && !self.disabled.contains(name)
    }

    fn invoke(&mut self, name: &str, args: &[HostValue]) -> Result<(), HostError> {
        self.calls.push(name.to_string());
        if !self.has_operation(name) {
            return Err(HostError::Fault {
                operation: name.to_string(),
                detail: "operation is not available".to_string(),
            });
        }
        if self.failing.contains(name) {
            return Err(HostError::Fault {
                operation: name.to_string(),
                detail: "simulated failure".to_string(),
            });
        }
        match name {
            "play_cards_from_highlighted" => self.play(args),
            "discard_cards_from_highlighted" => self.discard(args),
            "buy_from_shop" => self.buy(args),
            "reroll_shop" => self.reroll(),
            "sell_card" => self.sell(args),
            "toggle_shop" => self.leave_shop(),
            "sort_hand_value" => self.sort_hand(false),
            "sort_hand_suit" => self.sort_hand(true),
            "use_card" => self.use_pack_card(args),
            "skip_booster" => self.skip_pack(),
            "select_blind" => self.select_blind(args),
            "skip_blind" => self.skip_blind(),
            other => Err(HostError::Fault {
                operation: other.to_string(),
                detail: "operation is not implemented".to_string(),
            }),
        }
    }
}

fn child_table(parent: &TableRef, key: &str) -> TableRef {
    if let Some(table) = parent.get(key).as_table() {
        return table.clone();
    }
    let table = TableRef::new();
    parent.set(key, table.clone());
    table
}

fn counter(table: &TableRef, key: &str) -> i64 {
    table.get(key).as_i64().unwrap_or(0)
}

fn first_arg(args: &[HostValue]) -> Result<&HostValue, HostError> {
    args.first()
        .filter(|arg| arg.as_table().is_some())
        .ok_or_else(|| HostError::Rejected("Expected a card argument".to_string()))
}

fn push_card(area: &TableRef, card: HostValue) {
    let mut cards = area.sequence();
    cards.push(card);
    area.replace_sequence(cards);
}

/// Remove `picked` from `area`, all or nothing.
fn take_cards(
    area: &TableRef,
    picked: &[HostValue],
    missing: &str,
) -> Result<Vec<HostValue>, HostError> {
    let mut offsets = Vec::with_capacity(picked.len());
    for card in picked {
        let position = position_in(area, card).ok_or_else(|| HostError::Rejected(missing.to_string()))?;
        offsets.push(position - 1);
    }
    let (taken, kept): (Vec<_>, Vec<_>) = area
        .sequence()
        .into_iter()
        .enumerate()
        .partition(|(offset, _)| offsets.contains(offset));
    area.replace_sequence(kept.into_iter().map(|(_, card)| card).collect());
    Ok(taken
        .into_iter()
        .map(|(_, card)| {
            if let Some(table) = card.as_table() {
                table.set("highlighted", false);
            }
            card
        })
        .collect())
}

fn rank_order(card: &HostValue) -> usize {
    card.path(&["base", "value"])
        .as_str()
        .and_then(|value| RANKS.iter().position(|rank| *rank == value))
        .unwrap_or(0)
}

fn suit_order(card: &HostValue) -> usize {
    card.path(&["base", "suit"])
        .as_str()
        .and_then(|value| SUITS.iter().position(|suit| *suit == value))
        .unwrap_or(SUITS.len())
}

fn nominal(card: &HostValue) -> i64 {
    card.path(&["base", "nominal"]).as_i64().unwrap_or(0)
}

fn playing_card(id: i64, value: &str, suit: &str) -> HostValue {
    let nominal = match value {
        "Ace" => 11,
        "Jack" | "Queen" | "King" => 10,
        digits => digits.parse::<i64>().unwrap_or(0),
    };
    let name = format!("{value} of {suit}");
    HostValue::table([
        ("unique_val", HostValue::from(id)),
        ("sort_id", HostValue::from(id)),
        (
            "base",
            HostValue::table([
                ("value", HostValue::from(value)),
                ("suit", HostValue::from(suit)),
                ("name", HostValue::from(name.clone())),
                ("nominal", HostValue::from(nominal)),
            ]),
        ),
        (
            "config",
            HostValue::table([
                (
                    "card",
                    HostValue::table([
                        ("value", HostValue::from(value)),
                        ("suit", HostValue::from(suit)),
                        ("name", HostValue::from(name)),
                    ]),
                ),
                (
                    "center",
                    HostValue::table([
                        ("name", HostValue::from("Default Base")),
                        ("set", HostValue::from("Default")),
                    ]),
                ),
            ]),
        ),
        (
            "ability",
            HostValue::table([
                ("name", HostValue::from("Default Base")),
                ("set", HostValue::from("Default")),
            ]),
        ),
        ("facing", HostValue::from("front")),
        ("highlighted", HostValue::Bool(false)),
        ("debuff", HostValue::Bool(false)),
    ])
}

fn center_card(id: i64, name: &str, key: &str, set: &str, cost: i64) -> HostValue {
    HostValue::table([
        ("unique_val", HostValue::from(id)),
        ("cost", HostValue::from(cost)),
        ("sell_cost", HostValue::from((cost / 2).max(1))),
        (
            "ability",
            HostValue::table([
                ("name", HostValue::from(name)),
                ("set", HostValue::from(set)),
            ]),
        ),
        (
            "config",
            HostValue::table([(
                "center",
                HostValue::table([
                    ("name", HostValue::from(name)),
                    ("key", HostValue::from(key)),
                    ("set", HostValue::from(set)),
                    ("rarity", HostValue::from((set == "Joker").then_some(1i64))),
                ]),
            )]),
        ),
    ])
}

/// Builds a root world table in the layout [`MemoryHost`] and the bridge share.
#[derive(Debug, Clone)]
pub struct WorldBuilder {
    state: String,
    active: bool,
    money: i64,
    round: i64,
    ante: i64,
    hands_left: i64,
    discards_left: i64,
    reroll_cost: i64,
    blind_tier: i64,
    hand: Vec<(String, String)>,
    deck: Vec<(String, String)>,
    jokers: Vec<(String, String, i64)>,
    shop: Vec<(String, String, i64)>,
    pack: Vec<(String, String)>,
}

impl Default for WorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldBuilder {
    pub fn new() -> Self {
        Self {
            state: "SELECTING_HAND".to_string(),
            active: true,
            money: 4,
            round: 1,
            ante: 1,
            hands_left: ROUND_HANDS,
            discards_left: ROUND_DISCARDS,
            reroll_cost: BASE_REROLL_COST,
            blind_tier: 0,
            hand: Vec::new(),
            deck: Vec::new(),
            jokers: Vec::new(),
            shop: Vec::new(),
            pack: Vec::new(),
        }
    }

    /// Blind selection at ante 1 with a full 52-card deck and one joker.
    pub fn demo_run() -> Self {
        Self::new()
            .blind_select()
            .full_deck()
            .joker("Joker", "j_joker", 1)
    }

    pub fn state(mut self, name: &str) -> Self {
        self.state = name.to_string();
        self
    }

    /// Main menu with no run in progress.
    pub fn menu(mut self) -> Self {
        self.active = false;
        self.state("MENU")
    }

    pub fn selecting_hand(self) -> Self {
        self.state("SELECTING_HAND")
    }

    pub fn shop(self) -> Self {
        self.state("SHOP")
    }

    pub fn blind_select(self) -> Self {
        self.state("BLIND_SELECT")
    }

    pub fn money(mut self, dollars: i64) -> Self {
        self.money = dollars;
        self
    }

    pub fn hands_left(mut self, hands: i64) -> Self {
        self.hands_left = hands;
        self
    }

    pub fn discards_left(mut self, discards: i64) -> Self {
        self.discards_left = discards;
        self
    }

    pub fn reroll_cost(mut self, cost: i64) -> Self {
        self.reroll_cost = cost;
        self
    }

    pub fn blind_tier(mut self, tier: i64) -> Self {
        self.blind_tier = tier;
        self
    }

    pub fn hand_card(mut self, value: &str, suit: &str) -> Self {
        self.hand.push((value.to_string(), suit.to_string()));
        self
    }

    /// `count` distinct cards dealt in deck order.
    pub fn standard_hand(mut self, count: usize) -> Self {
        self.hand.extend(deck_order().take(count));
        self
    }

    pub fn full_deck(mut self) -> Self {
        self.deck = deck_order().collect();
        self
    }

    pub fn deck_cards(mut self, count: usize) -> Self {
        self.deck = deck_order().take(count).collect();
        self
    }

    pub fn joker(mut self, name: &str, key: &str, sell_cost: i64) -> Self {
        self.jokers.push((name.to_string(), key.to_string(), sell_cost));
        self
    }

    pub fn shop_item(mut self, name: &str, set: &str, cost: i64) -> Self {
        self.shop.push((name.to_string(), set.to_string(), cost));
        self
    }

    pub fn pack_card(mut self, name: &str, set: &str) -> Self {
        self.pack.push((name.to_string(), set.to_string()));
        self
    }

    pub fn build(self) -> TableRef {
        let root = TableRef::new();
        let states = TableRef::new();
        for (name, tag) in STATE_TAGS {
            states.set(name, tag);
        }
        root.set(STATES, states);
        match state_tag_for(&self.state) {
            Some(tag) => root.set(STATE, tag),
            None => root.set(STATE, self.state.as_str()),
        }

        let mut next_id = 0i64;
        let mut id = || {
            next_id += 1;
            next_id
        };

        let hand: Vec<_> = self
            .hand
            .iter()
            .map(|(value, suit)| playing_card(id(), value, suit))
            .collect();
        let deck: Vec<_> = self
            .deck
            .iter()
            .map(|(value, suit)| playing_card(id(), value, suit))
            .collect();
        let jokers: Vec<_> = self
            .jokers
            .iter()
            .map(|(name, key, sell_cost)| {
                let joker = center_card(id(), name, key, "Joker", sell_cost * 2);
                if let Some(table) = joker.as_table() {
                    table.set("sell_cost", *sell_cost);
                }
                joker
            })
            .collect();
        let shop: Vec<_> = self
            .shop
            .iter()
            .map(|(name, set, cost)| {
                let key = format!("x_{}", name.to_ascii_lowercase().replace(' ', "_"));
                center_card(id(), name, &key, set, *cost)
            })
            .collect();
        let pack: Vec<_> = self
            .pack
            .iter()
            .map(|(name, set)| {
                let key = format!("x_{}", name.to_ascii_lowercase().replace(' ', "_"));
                center_card(id(), name, &key, set, 0)
            })
            .collect();

        for (area, cards) in [
            (AREA_HAND, hand),
            (AREA_DECK, deck),
            (AREA_DISCARD, Vec::new()),
            (AREA_JOKERS, jokers),
            (AREA_CONSUMABLES, Vec::new()),
            (AREA_SHOP, shop),
            (AREA_PACK, pack),
        ] {
            root.set(
                area,
                HostValue::table([("cards", HostValue::list(cards))]),
            );
        }

        if self.active {
            root.set(GAME, self.game_table());
        }
        root
    }

    fn game_table(&self) -> HostValue {
        let (_, blind_name, blind_chips) =
            BLIND_TIERS[self.blind_tier.clamp(0, BLIND_TIERS.len() as i64 - 1) as usize];
        let hand_level = |level: i64, mult: f64, chips: i64| {
            HostValue::table([
                ("level", HostValue::from(level)),
                ("mult", HostValue::from(mult)),
                ("chips", HostValue::from(chips)),
                ("visible", HostValue::Bool(true)),
            ])
        };
        HostValue::table([
            ("dollars", HostValue::from(self.money)),
            ("round", HostValue::from(self.round)),
            ("chips", HostValue::from(0i64)),
            ("hand_size", HostValue::from(DEFAULT_HAND_SIZE)),
            ("blind_tier", HostValue::from(self.blind_tier)),
            (
                "round_resets",
                HostValue::table([("ante", HostValue::from(self.ante))]),
            ),
            (
                "current_round",
                HostValue::table([
                    ("hands_left", HostValue::from(self.hands_left)),
                    ("discards_left", HostValue::from(self.discards_left)),
                    ("reroll_cost", HostValue::from(self.reroll_cost)),
                    ("hands_played", HostValue::from(0i64)),
                ]),
            ),
            (
                "blind",
                HostValue::table([
                    ("name", HostValue::from(blind_name)),
                    ("chips", HostValue::from(blind_chips * self.ante)),
                    ("boss", HostValue::Bool(false)),
                ]),
            ),
            (
                "hands",
                HostValue::table([
                    ("High Card", hand_level(1, 1.0, 5)),
                    ("Pair", hand_level(1, 2.0, 10)),
                    ("Two Pair", hand_level(1, 2.0, 20)),
                    ("Three of a Kind", hand_level(1, 3.0, 30)),
                    ("Straight", hand_level(1, 4.0, 30)),
                    ("Flush", hand_level(1, 4.0, 35)),
                    ("Full House", hand_level(1, 4.0, 40)),
                    ("Four of a Kind", hand_level(1, 7.0, 60)),
                    ("Straight Flush", hand_level(1, 8.0, 100)),
                ]),
            ),
            (
                "pseudorandom",
                HostValue::table([("seed", HostValue::from("HEADLESS"))]),
            ),
        ])
    }
}

fn deck_order() -> impl Iterator<Item = (String, String)> {
    SUITS.iter().flat_map(|suit| {
        RANKS
            .iter()
            .rev()
            .map(move |rank| (rank.to_string(), suit.to_string()))
    })
}
