use bridge_runtime::Phase;

use crate::host::HostValue;
use crate::world::{area_cards, state_tag, AREA_PACK, AREA_SHOP, STATE};

const PACK_STATES: [&str; 6] = [
    "TAROT_PACK",
    "PLANET_PACK",
    "SPECTRAL_PACK",
    "STANDARD_PACK",
    "BUFFOON_PACK",
    "SMODS_BOOSTER_OPENED",
];

/// Derive the interaction phase from one read of the world.
///
/// State names come from the `STATES` lookup; when the host stores the
/// state as its name directly, the raw tag is used as the name.
pub fn classify(world: &HostValue) -> Phase {
    let tag = state_tag(world);
    let name = tag
        .name
        .clone()
        .or_else(|| world.get(STATE).as_str().map(str::to_string));
    let name = name.as_deref();

    match name {
        Some("MENU") => return Phase::Menu,
        Some("SPLASH") => return Phase::Splash,
        _ => {}
    }

    if !area_cards(world, AREA_SHOP).is_empty() || name == Some("SHOP") {
        return Phase::Shop;
    }

    match name {
        Some("SELECTING_HAND") => return Phase::SelectingHand,
        Some("HAND_PLAYED") => return Phase::HandPlayed,
        Some("DRAW_TO_HAND") => return Phase::DrawToHand,
        Some("BLIND_SELECT") => return Phase::BlindSelect,
        _ => {}
    }

    let pack_state = name.is_some_and(|name| PACK_STATES.contains(&name));
    if pack_state || !area_cards(world, AREA_PACK).is_empty() {
        return Phase::PackOpening;
    }

    match tag.raw {
        Some(raw) => Phase::Raw(raw),
        None => Phase::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::TableRef;
    use crate::world::STATES;

    fn states() -> HostValue {
        HostValue::table([
            ("SELECTING_HAND", HostValue::from(1i64)),
            ("HAND_PLAYED", HostValue::from(2i64)),
            ("DRAW_TO_HAND", HostValue::from(3i64)),
            ("SHOP", HostValue::from(5i64)),
            ("BLIND_SELECT", HostValue::from(7i64)),
            ("ROUND_EVAL", HostValue::from(8i64)),
            ("TAROT_PACK", HostValue::from(9i64)),
            ("MENU", HostValue::from(11i64)),
            ("SPLASH", HostValue::from(13i64)),
        ])
    }

    fn world(state: i64, shop: usize, pack: usize) -> HostValue {
        let cards = |count: usize| {
            HostValue::table([(
                "cards",
                HostValue::list((0..count).map(|i| HostValue::table([("cost", HostValue::from(i))]))),
            )])
        };
        HostValue::table([
            (STATE, HostValue::from(state)),
            (STATES, states()),
            (AREA_SHOP, cards(shop)),
            (AREA_PACK, cards(pack)),
        ])
    }

    #[test]
    fn named_states_map_to_phases() {
        assert_eq!(classify(&world(11, 0, 0)), Phase::Menu);
        assert_eq!(classify(&world(13, 0, 0)), Phase::Splash);
        assert_eq!(classify(&world(1, 0, 0)), Phase::SelectingHand);
        assert_eq!(classify(&world(2, 0, 0)), Phase::HandPlayed);
        assert_eq!(classify(&world(3, 0, 0)), Phase::DrawToHand);
        assert_eq!(classify(&world(7, 0, 0)), Phase::BlindSelect);
        assert_eq!(classify(&world(9, 0, 0)), Phase::PackOpening);
    }

    #[test]
    fn shop_inventory_wins_over_explicit_state() {
        assert_eq!(classify(&world(1, 2, 0)), Phase::Shop);
        assert_eq!(classify(&world(5, 0, 0)), Phase::Shop);
    }

    #[test]
    fn menu_wins_over_shop_inventory() {
        assert_eq!(classify(&world(11, 3, 0)), Phase::Menu);
    }

    #[test]
    fn pack_cards_imply_pack_opening() {
        assert_eq!(classify(&world(8, 0, 3)), Phase::PackOpening);
    }

    #[test]
    fn unlisted_states_keep_their_raw_tag() {
        assert_eq!(classify(&world(8, 0, 0)), Phase::Raw("8".into()));
        assert_eq!(classify(&world(8, 0, 0)).to_string(), "STATE_8");
        assert_eq!(classify(&world(99, 0, 0)), Phase::Raw("99".into()));
    }

    #[test]
    fn string_states_without_lookup_are_names() {
        let world = HostValue::table([(STATE, HostValue::from("BLIND_SELECT"))]);
        assert_eq!(classify(&world), Phase::BlindSelect);
    }

    #[test]
    fn missing_state_is_unknown() {
        assert_eq!(classify(&HostValue::Nil), Phase::Unknown);
        assert_eq!(classify(&HostValue::Table(TableRef::new())), Phase::Unknown);
    }
}
