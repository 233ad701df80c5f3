//! Scope model for CK3 script analysis.
//!
//! Triggers and effects in CK3 script always evaluate against a typed scope
//! (a character, a landed title, a province, ...). This crate owns the closed
//! scope-type taxonomy, the static link and iterator tables that describe how
//! script navigates between scopes, and the validator for dot-separated link
//! chains like `liege.primary_title.holder`.
//!
//! The tables are static data compiled into the binary; nothing here takes a
//! lock or allocates beyond the returned results, so the scope model can be
//! consulted freely from any worker thread.

#![deny(unsafe_code)]

pub mod chain;
pub mod iterators;
pub mod links;

pub use chain::{ChainError, ChainOutcome, validate_chain};
pub use iterators::{IteratorPrefix, parse_iterator_key, resolve_iterator};
pub use links::{link_names, resolve_link, suggest_link};

use serde::{Deserialize, Serialize};

/// The closed set of scope types a CK3 script value can have.
///
/// `Unknown` is the poison value: it propagates through links the tables do
/// not know so that one unrecognized segment does not cascade into a wall of
/// follow-on diagnostics. `Any` matches every concrete type and `None` marks
/// positions where no scope is available at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeType {
    Character,
    LandedTitle,
    Province,
    Faith,
    Religion,
    Culture,
    CulturePillar,
    CultureTradition,
    Dynasty,
    DynastyHouse,
    Artifact,
    Story,
    Scheme,
    Activity,
    War,
    Combat,
    CombatSide,
    CasusBelli,
    Army,
    Secret,
    GreatHolyWar,
    Government,
    Inspiration,
    Struggle,
    TravelPlan,
    Accolade,
    HolyOrder,
    MercenaryCompany,
    Decision,
    TitleAndVassalChange,
    /// A plain script value (number, bool) rather than an object scope.
    Value,
    /// A variable flag value.
    Flag,
    /// Could not be resolved; propagates through unknown links.
    Unknown,
    /// Matches any concrete scope type.
    Any,
    /// No scope is available (e.g. top of an unscoped file).
    None,
}

impl ScopeType {
    /// Canonical lowercase name as it appears in documentation and hints.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeType::Character => "character",
            ScopeType::LandedTitle => "landed_title",
            ScopeType::Province => "province",
            ScopeType::Faith => "faith",
            ScopeType::Religion => "religion",
            ScopeType::Culture => "culture",
            ScopeType::CulturePillar => "culture_pillar",
            ScopeType::CultureTradition => "culture_tradition",
            ScopeType::Dynasty => "dynasty",
            ScopeType::DynastyHouse => "dynasty_house",
            ScopeType::Artifact => "artifact",
            ScopeType::Story => "story",
            ScopeType::Scheme => "scheme",
            ScopeType::Activity => "activity",
            ScopeType::War => "war",
            ScopeType::Combat => "combat",
            ScopeType::CombatSide => "combat_side",
            ScopeType::CasusBelli => "casus_belli",
            ScopeType::Army => "army",
            ScopeType::Secret => "secret",
            ScopeType::GreatHolyWar => "great_holy_war",
            ScopeType::Government => "government",
            ScopeType::Inspiration => "inspiration",
            ScopeType::Struggle => "struggle",
            ScopeType::TravelPlan => "travel_plan",
            ScopeType::Accolade => "accolade",
            ScopeType::HolyOrder => "holy_order",
            ScopeType::MercenaryCompany => "mercenary_company",
            ScopeType::Decision => "decision",
            ScopeType::TitleAndVassalChange => "title_and_vassal_change",
            ScopeType::Value => "value",
            ScopeType::Flag => "flag",
            ScopeType::Unknown => "unknown",
            ScopeType::Any => "any",
            ScopeType::None => "none",
        }
    }

    /// Parse a canonical scope-type name.
    pub fn parse(name: &str) -> Option<ScopeType> {
        Some(match name {
            "character" => ScopeType::Character,
            "landed_title" | "title" => ScopeType::LandedTitle,
            "province" => ScopeType::Province,
            "faith" => ScopeType::Faith,
            "religion" => ScopeType::Religion,
            "culture" => ScopeType::Culture,
            "culture_pillar" => ScopeType::CulturePillar,
            "culture_tradition" => ScopeType::CultureTradition,
            "dynasty" => ScopeType::Dynasty,
            "dynasty_house" | "house" => ScopeType::DynastyHouse,
            "artifact" => ScopeType::Artifact,
            "story" | "story_cycle" => ScopeType::Story,
            "scheme" => ScopeType::Scheme,
            "activity" => ScopeType::Activity,
            "war" => ScopeType::War,
            "combat" => ScopeType::Combat,
            "combat_side" => ScopeType::CombatSide,
            "casus_belli" => ScopeType::CasusBelli,
            "army" => ScopeType::Army,
            "secret" => ScopeType::Secret,
            "great_holy_war" => ScopeType::GreatHolyWar,
            "government" => ScopeType::Government,
            "inspiration" => ScopeType::Inspiration,
            "struggle" => ScopeType::Struggle,
            "travel_plan" => ScopeType::TravelPlan,
            "accolade" => ScopeType::Accolade,
            "holy_order" => ScopeType::HolyOrder,
            "mercenary_company" => ScopeType::MercenaryCompany,
            "decision" => ScopeType::Decision,
            "title_and_vassal_change" => ScopeType::TitleAndVassalChange,
            "value" => ScopeType::Value,
            "flag" => ScopeType::Flag,
            "unknown" => ScopeType::Unknown,
            "any" => ScopeType::Any,
            "none" => ScopeType::None,
            _ => return None,
        })
    }

    /// Whether this type stands in for an unresolved scope.
    #[inline]
    pub fn is_unknown(&self) -> bool {
        matches!(self, ScopeType::Unknown)
    }

    /// Whether a value of this type satisfies a position expecting `expected`.
    ///
    /// `Unknown` is permissive in both directions so unresolved chains do not
    /// produce secondary errors.
    pub fn satisfies(&self, expected: ScopeType) -> bool {
        matches!(self, ScopeType::Unknown | ScopeType::Any)
            || matches!(expected, ScopeType::Unknown | ScopeType::Any)
            || *self == expected
    }
}

impl std::fmt::Display for ScopeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
