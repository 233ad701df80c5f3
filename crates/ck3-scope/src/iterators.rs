//! Iterator key tables.
//!
//! Keys of the form `any_child`, `every_vassal`, `random_courtier`,
//! `ordered_held_title` drive loops over a list derived from the current
//! scope. The prefix decides the evaluation context: `any_` forms are
//! triggers, the other three are effects.

use crate::ScopeType;
use phf::phf_map;

use ScopeType::*;

/// The four iterator prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IteratorPrefix {
    /// `any_` - trigger form, true if any element matches.
    Any,
    /// `every_` - effect form, runs for every element.
    Every,
    /// `random_` - effect form, runs for one random element.
    Random,
    /// `ordered_` - effect form, runs for elements in order.
    Ordered,
}

impl IteratorPrefix {
    /// Parse the prefix off an iterator key, returning the remaining base.
    pub fn strip(key: &str) -> Option<(IteratorPrefix, &str)> {
        if let Some(base) = key.strip_prefix("any_") {
            Some((IteratorPrefix::Any, base))
        } else if let Some(base) = key.strip_prefix("every_") {
            Some((IteratorPrefix::Every, base))
        } else if let Some(base) = key.strip_prefix("random_") {
            Some((IteratorPrefix::Random, base))
        } else if let Some(base) = key.strip_prefix("ordered_") {
            Some((IteratorPrefix::Ordered, base))
        } else {
            Option::None
        }
    }

    /// The literal prefix text including the trailing underscore.
    pub fn as_str(&self) -> &'static str {
        match self {
            IteratorPrefix::Any => "any_",
            IteratorPrefix::Every => "every_",
            IteratorPrefix::Random => "random_",
            IteratorPrefix::Ordered => "ordered_",
        }
    }

    /// Whether this form is only legal inside effect blocks.
    pub fn is_effect(&self) -> bool {
        !matches!(self, IteratorPrefix::Any)
    }
}

/// Iterator base descriptor: required source scope (None = usable anywhere)
/// and the scope each element is iterated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IteratorBase {
    /// Scope the iterator must be invoked from; `None` for global lists.
    pub source: Option<ScopeType>,
    /// Scope type of each iterated element.
    pub target: ScopeType,
}

const fn from(source: ScopeType, target: ScopeType) -> IteratorBase {
    IteratorBase { source: Some(source), target }
}

const fn global(target: ScopeType) -> IteratorBase {
    IteratorBase { source: Option::None, target }
}

static ITERATOR_BASES: phf::Map<&'static str, IteratorBase> = phf_map! {
    // Character lists
    "child" => from(Character, Character),
    "parent" => from(Character, Character),
    "spouse" => from(Character, Character),
    "concubine" => from(Character, Character),
    "vassal" => from(Character, Character),
    "liege_or_above" => from(Character, Character),
    "courtier" => from(Character, Character),
    "knight" => from(Character, Character),
    "prisoner" => from(Character, Character),
    "ally" => from(Character, Character),
    "war_ally" => from(Character, Character),
    "war_enemy" => from(Character, Character),
    "councillor" => from(Character, Character),
    "close_family_member" => from(Character, Character),
    "close_or_extended_family_member" => from(Character, Character),
    "heir" => from(Character, Character),
    "held_title" => from(Character, LandedTitle),
    "claim" => from(Character, LandedTitle),
    "heir_title" => from(Character, LandedTitle),
    "directly_owned_province" => from(Character, Province),
    "realm_province" => from(Character, Province),
    "realm_county" => from(Character, LandedTitle),
    "sub_realm_county" => from(Character, LandedTitle),
    "scheme" => from(Character, Scheme),
    "targeting_scheme" => from(Character, Scheme),
    "secret" => from(Character, Secret),
    "known_secret" => from(Character, Secret),
    "character_artifact" => from(Character, Artifact),
    "owned_story" => from(Character, Story),
    "character_war" => from(Character, War),
    "character_struggle" => from(Character, Struggle),
    "court_position_holder" => from(Character, Character),

    // Landed-title lists
    "in_de_facto_hierarchy" => from(LandedTitle, LandedTitle),
    "in_de_jure_hierarchy" => from(LandedTitle, LandedTitle),
    "de_jure_county" => from(LandedTitle, LandedTitle),
    "de_jure_county_holder" => from(LandedTitle, Character),
    "county_province" => from(LandedTitle, Province),
    "connected_county" => from(LandedTitle, LandedTitle),
    "claimant" => from(LandedTitle, Character),
    "election_candidate" => from(LandedTitle, Character),
    "title_heir" => from(LandedTitle, Character),

    // Faith / religion / culture lists
    "faith_character" => from(Faith, Character),
    "faith_playable_ruler" => from(Faith, Character),
    "faith_holy_order" => from(Faith, HolyOrder),
    "defensive_great_holy_war" => from(Faith, GreatHolyWar),
    "culture_county" => from(Culture, LandedTitle),
    "culture_pillar" => from(Culture, CulturePillar),
    "culture_tradition" => from(Culture, CultureTradition),

    // Dynasty / house lists
    "dynasty_member" => from(Dynasty, Character),
    "house_member" => from(DynastyHouse, Character),
    "house_claimed_artifact" => from(DynastyHouse, Artifact),

    // War / combat lists
    "war_attacker" => from(War, Character),
    "war_defender" => from(War, Character),
    "war_participant" => from(War, Character),
    "side_commander" => from(CombatSide, Character),
    "side_knight" => from(CombatSide, Character),

    // Activity / struggle / travel lists
    "attending_character" => from(Activity, Character),
    "involved_ruler" => from(Struggle, Character),
    "interloper_ruler" => from(Struggle, Character),
    "companion" => from(TravelPlan, Character),

    // Global lists, usable from any scope
    "ruler" => global(Character),
    "independent_ruler" => global(Character),
    "living_character" => global(Character),
    "player" => global(Character),
    "pool_character" => global(Character),
    "county" => global(LandedTitle),
    "duchy" => global(LandedTitle),
    "kingdom" => global(LandedTitle),
    "empire" => global(LandedTitle),
    "barony" => global(LandedTitle),
    "province" => global(Province),
    "activity" => global(Activity),
    "artifact" => global(Artifact),
};

/// Split a key into iterator prefix and base if it is a known iterator form.
///
/// An unknown base still parses; the caller decides whether that is an error.
pub fn parse_iterator_key(key: &str) -> Option<(IteratorPrefix, &str)> {
    IteratorPrefix::strip(key)
}

/// Resolve an iterator base against the current scope.
///
/// Returns the element scope on success, `Some(Unknown)` when the current
/// scope is itself unresolved, and `None` when the base is unknown or not
/// legal from the current scope.
pub fn resolve_iterator(base: &str, current: ScopeType) -> Option<ScopeType> {
    if matches!(current, ScopeType::Unknown | ScopeType::Any) {
        return Some(ScopeType::Unknown);
    }
    let entry = ITERATOR_BASES.get(base)?;
    match entry.source {
        Some(required) if required != current => Option::None,
        _ => Some(entry.target),
    }
}

/// Iterator bases legal from `current`, for completion.
pub fn iterator_bases(current: ScopeType) -> Vec<(&'static str, ScopeType)> {
    let mut bases: Vec<(&'static str, ScopeType)> = ITERATOR_BASES
        .entries()
        .filter(|(_, b)| b.source.is_none() || b.source == Some(current))
        .map(|(k, b)| (*k, b.target))
        .collect();
    bases.sort_unstable_by_key(|(k, _)| *k);
    bases
}

/// Nearest known iterator base within Levenshtein distance 2.
pub fn suggest_iterator_base(base: &str) -> Option<&'static str> {
    ITERATOR_BASES
        .keys()
        .map(|k| (*k, strsim::levenshtein(k, base)))
        .filter(|(_, d)| *d <= 2)
        .min_by_key(|(k, d)| (*d, *k))
        .map(|(k, _)| k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_recognizes_all_prefixes() {
        assert_eq!(IteratorPrefix::strip("any_child"), Some((IteratorPrefix::Any, "child")));
        assert_eq!(IteratorPrefix::strip("every_vassal"), Some((IteratorPrefix::Every, "vassal")));
        assert_eq!(IteratorPrefix::strip("random_courtier"), Some((IteratorPrefix::Random, "courtier")));
        assert_eq!(IteratorPrefix::strip("ordered_heir"), Some((IteratorPrefix::Ordered, "heir")));
        assert_eq!(IteratorPrefix::strip("liege"), Option::None);
    }

    #[test]
    fn resolve_checks_source_scope() {
        assert_eq!(resolve_iterator("child", Character), Some(Character));
        assert_eq!(resolve_iterator("held_title", Character), Some(LandedTitle));
        assert_eq!(resolve_iterator("child", Province), Option::None);
        assert_eq!(resolve_iterator("ruler", Province), Some(Character));
    }

    #[test]
    fn unknown_current_scope_is_permissive() {
        assert_eq!(resolve_iterator("child", Unknown), Some(Unknown));
        assert_eq!(resolve_iterator("completely_made_up", Unknown), Some(Unknown));
    }

    #[test]
    fn global_bases_offered_everywhere() {
        assert!(iterator_bases(Faith).iter().any(|(k, _)| *k == "ruler"));
        assert!(iterator_bases(Faith).iter().any(|(k, _)| *k == "faith_character"));
        assert!(!iterator_bases(Faith).iter().any(|(k, _)| *k == "child"));
    }
}
