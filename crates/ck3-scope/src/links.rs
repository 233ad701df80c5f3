//! Static scope-link tables.
//!
//! A link is a named edge between scope types: from a `character` scope,
//! `liege` navigates to another `character`, `primary_title` to a
//! `landed_title`, and so on. The tables below are the single source of truth
//! consulted by the chain validator, completion, hover, and inlay hints.

use crate::ScopeType;
use phf::phf_map;

use ScopeType::*;

static CHARACTER_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "liege" => Character,
    "top_liege" => Character,
    "employer" => Character,
    "host" => Character,
    "court_owner" => Character,
    "father" => Character,
    "mother" => Character,
    "primary_spouse" => Character,
    "betrothed" => Character,
    "primary_heir" => Character,
    "player_heir" => Character,
    "killer" => Character,
    "imprisoner" => Character,
    "realm_priest" => Character,
    "designated_heir" => Character,
    "matchmaker" => Character,
    "dynasty" => Dynasty,
    "house" => DynastyHouse,
    "faith" => Faith,
    "culture" => Culture,
    "capital_county" => LandedTitle,
    "capital_barony" => LandedTitle,
    "capital_province" => Province,
    "location" => Province,
    "primary_title" => LandedTitle,
    "domicile" => Province,
    "commanding_army" => Army,
    "inspiration" => Inspiration,
    "joined_faction" => Unknown,
    "government" => Government,
    "court_chaplain" => Character,
    "chancellor" => Character,
    "steward" => Character,
    "marshal" => Character,
    "spymaster" => Character,
    "current_travel_plan" => TravelPlan,
};

static LANDED_TITLE_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "holder" => Character,
    "previous_holder" => Character,
    "controller" => Character,
    "lessee" => Character,
    "lessee_title" => LandedTitle,
    "current_heir" => Character,
    "de_facto_liege" => LandedTitle,
    "de_jure_liege" => LandedTitle,
    "county" => LandedTitle,
    "duchy" => LandedTitle,
    "kingdom" => LandedTitle,
    "empire" => LandedTitle,
    "title_province" => Province,
    "title_capital_county" => LandedTitle,
    "faith" => Faith,
    "culture" => Culture,
};

static PROVINCE_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "county" => LandedTitle,
    "barony" => LandedTitle,
    "barony_controller" => Character,
    "province_owner" => Character,
    "faith" => Faith,
    "culture" => Culture,
};

static FAITH_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "religion" => Religion,
    "religious_head" => Character,
    "religious_head_title" => LandedTitle,
    "founder" => Character,
    "great_holy_war" => GreatHolyWar,
};

static CULTURE_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "culture_head" => Character,
    "parent_culture" => Culture,
};

static DYNASTY_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "dynast" => Character,
};

static HOUSE_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "house_head" => Character,
    "house_founder" => Character,
    "dynasty" => Dynasty,
};

static ARTIFACT_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "artifact_owner" => Character,
    "creator" => Character,
    "previous_artifact_owner" => Character,
};

static STORY_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "story_owner" => Character,
};

static SCHEME_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "scheme_owner" => Character,
    "scheme_target" => Character,
};

static ACTIVITY_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "activity_owner" => Character,
    "activity_host" => Character,
    "activity_location" => Province,
};

static WAR_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "primary_attacker" => Character,
    "primary_defender" => Character,
    "casus_belli" => CasusBelli,
    "claimant" => Character,
};

static COMBAT_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "combat_attacker" => CombatSide,
    "combat_defender" => CombatSide,
    "combat_war" => War,
    "location" => Province,
};

static COMBAT_SIDE_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "enemy_side" => CombatSide,
    "combat" => Combat,
    "side_commander" => Character,
    "side_primary_participant" => Character,
};

static CASUS_BELLI_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "claimant" => Character,
    "war" => War,
};

static ARMY_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "army_commander" => Character,
    "army_owner" => Character,
    "location" => Province,
};

static SECRET_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "secret_owner" => Character,
    "secret_target" => Character,
};

static GREAT_HOLY_WAR_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "ghw_target_character" => Character,
    "ghw_target_title" => LandedTitle,
    "ghw_title_recipient" => Character,
    "ghw_war" => War,
    "ghw_war_declarer" => Character,
};

static INSPIRATION_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "inspiration_owner" => Character,
    "inspiration_sponsor" => Character,
};

static TRAVEL_PLAN_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "travel_plan_owner" => Character,
    "departure_location" => Province,
    "final_destination_province" => Province,
    "current_location" => Province,
};

static ACCOLADE_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "accolade_owner" => Character,
    "acclaimed_knight" => Character,
};

static HOLY_ORDER_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "holy_order_patron" => Character,
    "leader" => Character,
    "title" => LandedTitle,
};

static MERCENARY_COMPANY_LINKS: phf::Map<&'static str, ScopeType> = phf_map! {
    "mercenary_company_leader" => Character,
};

fn table_for(scope: ScopeType) -> Option<&'static phf::Map<&'static str, ScopeType>> {
    match scope {
        Character => Some(&CHARACTER_LINKS),
        LandedTitle => Some(&LANDED_TITLE_LINKS),
        Province => Some(&PROVINCE_LINKS),
        Faith => Some(&FAITH_LINKS),
        Culture => Some(&CULTURE_LINKS),
        Dynasty => Some(&DYNASTY_LINKS),
        DynastyHouse => Some(&HOUSE_LINKS),
        Artifact => Some(&ARTIFACT_LINKS),
        Story => Some(&STORY_LINKS),
        Scheme => Some(&SCHEME_LINKS),
        Activity => Some(&ACTIVITY_LINKS),
        War => Some(&WAR_LINKS),
        Combat => Some(&COMBAT_LINKS),
        CombatSide => Some(&COMBAT_SIDE_LINKS),
        CasusBelli => Some(&CASUS_BELLI_LINKS),
        Army => Some(&ARMY_LINKS),
        Secret => Some(&SECRET_LINKS),
        GreatHolyWar => Some(&GREAT_HOLY_WAR_LINKS),
        Inspiration => Some(&INSPIRATION_LINKS),
        TravelPlan => Some(&TRAVEL_PLAN_LINKS),
        Accolade => Some(&ACCOLADE_LINKS),
        HolyOrder => Some(&HOLY_ORDER_LINKS),
        MercenaryCompany => Some(&MERCENARY_COMPANY_LINKS),
        _ => Option::None,
    }
}

/// Resolve a named link from a source scope.
///
/// Returns `Some(Unknown)` when the source scope itself is `Unknown` or `Any`
/// (navigation is permitted but the result cannot be typed), and `None` when
/// the source scope is known and carries no such link.
pub fn resolve_link(from: ScopeType, name: &str) -> Option<ScopeType> {
    match from {
        ScopeType::Unknown | ScopeType::Any => Some(ScopeType::Unknown),
        _ => table_for(from).and_then(|t| t.get(name)).copied(),
    }
}

/// All link names legal from a source scope, for completion.
pub fn link_names(from: ScopeType) -> Vec<(&'static str, ScopeType)> {
    let mut names: Vec<(&'static str, ScopeType)> = table_for(from)
        .map(|t| t.entries().map(|(k, v)| (*k, *v)).collect())
        .unwrap_or_default();
    names.sort_unstable_by_key(|(k, _)| *k);
    names
}

/// Whether `name` is a link from any scope type at all. Used where the
/// current scope is unresolved and a concrete table cannot be consulted.
pub fn is_link_from_any_scope(name: &str) -> bool {
    ALL_TABLES.iter().any(|t| t.contains_key(name))
}

static ALL_TABLES: [&phf::Map<&'static str, ScopeType>; 23] = [
    &CHARACTER_LINKS,
    &LANDED_TITLE_LINKS,
    &PROVINCE_LINKS,
    &FAITH_LINKS,
    &CULTURE_LINKS,
    &DYNASTY_LINKS,
    &HOUSE_LINKS,
    &ARTIFACT_LINKS,
    &STORY_LINKS,
    &SCHEME_LINKS,
    &ACTIVITY_LINKS,
    &WAR_LINKS,
    &COMBAT_LINKS,
    &COMBAT_SIDE_LINKS,
    &CASUS_BELLI_LINKS,
    &ARMY_LINKS,
    &SECRET_LINKS,
    &GREAT_HOLY_WAR_LINKS,
    &INSPIRATION_LINKS,
    &TRAVEL_PLAN_LINKS,
    &ACCOLADE_LINKS,
    &HOLY_ORDER_LINKS,
    &MERCENARY_COMPANY_LINKS,
];

/// Nearest known link within Levenshtein distance 2, for typo suggestions.
pub fn suggest_link(from: ScopeType, name: &str) -> Option<&'static str> {
    let table = table_for(from)?;
    table
        .keys()
        .map(|k| (*k, strsim::levenshtein(k, name)))
        .filter(|(_, d)| *d <= 2)
        .min_by_key(|(k, d)| (*d, *k))
        .map(|(k, _)| k)
}
