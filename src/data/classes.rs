use std::collections::HashSet;

/// Minimum number of distinct classes needed to build a Conquest lineup.
pub const LINEUP_SIZE: usize = 4;

/// Class names as they appear inside archetype names, paired with the solver's class codes.
/// "Demon Hunter" must be tried before "Hunter".
const CLASS_NAMES: [(&str, &str); 11] = [
    ("Demon Hunter", "DEMONHUNTER"),
    ("Death Knight", "DEATHKNIGHT"),
    ("Warrior", "WARRIOR"),
    ("Paladin", "PALADIN"),
    ("Hunter", "HUNTER"),
    ("Rogue", "ROGUE"),
    ("Priest", "PRIEST"),
    ("Shaman", "SHAMAN"),
    ("Mage", "MAGE"),
    ("Warlock", "WARLOCK"),
    ("Druid", "DRUID"),
];

/// Class code for a deck, inferred from its archetype name.
pub fn infer_class(deck: &str) -> Option<&'static str> {
    CLASS_NAMES
        .iter()
        .find(|(name, _)| deck.contains(name))
        .map(|(_, code)| *code)
}

/// Number of distinct known classes among `decks`.
pub fn distinct_classes<'a>(decks: impl IntoIterator<Item = &'a str>) -> usize {
    decks
        .into_iter()
        .filter_map(infer_class)
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demon_hunter_is_not_hunter() {
        assert_eq!(infer_class("Aggro Demon Hunter"), Some("DEMONHUNTER"));
        assert_eq!(infer_class("Face Hunter"), Some("HUNTER"));
        assert_eq!(infer_class("Mystery Deck"), None);
    }

    #[test]
    fn warlock_is_recognised() {
        assert_eq!(infer_class("Zoo Warlock"), Some("WARLOCK"));
    }

    #[test]
    fn counts_distinct_classes() {
        let decks = ["Control Warrior", "Odd Warrior", "Big Priest", "Tempo Mage", "Unknown"];
        assert_eq!(distinct_classes(decks), 3);
    }
}
