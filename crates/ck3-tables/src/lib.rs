//! Built-in language tables.
//!
//! Static catalogs of the triggers, effects, and control-flow keywords the
//! game engine understands natively, used to classify tokens for semantic
//! coloring, to flag unknown names, and to back hover documentation for the
//! common built-ins. Scripted (mod-defined) effects and triggers are not in
//! these tables; those come from the workspace index.

#![deny(unsafe_code)]

use ck3_scope::ScopeType;
use phf::{phf_map, phf_set};

/// Control-flow keywords legal in both trigger and effect blocks.
pub static KEYWORDS: phf::Set<&'static str> = phf_set! {
    "if", "else", "else_if", "limit", "while", "switch", "trigger_switch",
    "break", "alternative_limit", "trigger_else", "trigger_else_if",
    "AND", "OR", "NOT", "NOR", "NAND", "custom_description",
    "custom_tooltip", "hidden_effect", "show_as_tooltip", "random",
    "random_list", "modifier", "count", "percent", "exists",
};

/// Boolean literal values.
pub static BOOLEANS: phf::Set<&'static str> = phf_set! { "yes", "no" };

/// Built-in trigger names (pure predicates).
pub static TRIGGERS: phf::Set<&'static str> = phf_set! {
    "age", "gold", "prestige", "piety", "dread", "stress", "tyranny",
    "diplomacy", "martial", "stewardship", "intrigue", "learning", "prowess",
    "has_trait", "has_trait_xp", "has_character_flag", "has_character_modifier",
    "has_opinion_modifier", "has_relation_lover", "has_relation_friend",
    "has_relation_rival", "has_relation_soulmate", "has_relation_best_friend",
    "has_relation_nemesis", "is_adult", "is_alive", "is_female", "is_male",
    "is_ruler", "is_landed", "is_lowborn", "is_married", "is_betrothed",
    "is_pregnant", "is_imprisoned", "is_at_war", "is_at_war_with",
    "is_independent_ruler", "is_courtier", "is_courtier_of", "is_councillor",
    "is_councillor_of", "is_knight", "is_commander", "is_clergy",
    "is_theocratic_lessee", "is_visibly_fertile", "is_in_an_activity",
    "is_incapable", "is_immortal", "is_ai", "is_local_player",
    "has_council_position", "has_government", "has_realm_law", "has_title",
    "has_claim_on", "has_any_unborn_children", "has_free_council_slot",
    "has_faith", "has_religion", "has_culture", "has_culture_pillar",
    "has_culture_tradition", "has_focus", "has_lifestyle", "has_perk",
    "has_nickname", "has_dynasty", "has_primary_title", "has_royal_court",
    "has_hook", "has_strong_hook", "has_weak_hook", "has_dread_level_towards",
    "has_truce", "has_imprisonment_reason", "has_banish_reason",
    "has_execute_reason", "has_divorce_reason", "has_revoke_title_reason",
    "completely_controls", "target_is_liege_or_above", "target_is_vassal_or_below",
    "opinion", "reverse_opinion", "faith_hostility_level", "highest_held_title_tier",
    "number_of_knights", "number_of_vassals", "number_of_powerful_vassals",
    "realm_size", "domain_size", "short_term_gold", "yearly_character_income",
    "monthly_character_income", "num_sinful_traits", "num_virtuous_traits",
    "can_be_employed_by", "can_marry", "can_divorce", "can_go_to_war",
    "can_start_scheme", "can_declare_war", "can_create_faction",
    "terrain", "geographical_region", "county_opinion", "development_level",
    "building_levies", "building_max_garrison", "county_control",
    "is_county_capital", "is_coastal_county", "is_riverside_province",
    "has_building", "has_building_or_higher", "has_holding_type",
    "has_county_modifier", "has_province_modifier", "is_holy_site_of",
    "tier", "is_titular", "is_mercenary_company_title", "is_holy_order_title",
    "is_head_of_faith", "is_capital_barony", "exists", "always",
    "scripted_trigger", "days_since_death", "year", "current_month",
    "is_target_in_global_variable_list", "has_global_variable", "has_variable",
    "has_local_variable", "is_scheming_against", "scheme_power", "scheme_secrecy",
    "war_days", "is_war_leader", "is_attacker", "is_defender",
    "faith_dominant_in_county", "has_doctrine", "has_doctrine_parameter",
    "has_graphical_faith", "fervor", "num_character_followers",
};

/// Built-in effect names (side-effecting operators).
pub static EFFECTS: phf::Set<&'static str> = phf_set! {
    "add_gold", "remove_short_term_gold", "add_prestige", "add_piety",
    "add_dread", "add_stress", "add_tyranny", "change_age", "add_trait",
    "remove_trait", "add_trait_xp", "add_character_flag", "remove_character_flag",
    "add_character_modifier", "remove_character_modifier", "add_opinion",
    "reverse_add_opinion", "remove_opinion", "add_prowess_skill",
    "add_diplomacy_skill", "add_martial_skill", "add_stewardship_skill",
    "add_intrigue_skill", "add_learning_skill", "set_sexuality",
    "set_immortal_age", "add_pressed_claim", "add_unpressed_claim",
    "remove_claim", "give_nickname", "remove_nickname", "set_culture",
    "set_faith", "set_character_faith", "set_character_faith_with_conversion",
    "imprison", "release_from_prison", "banish", "execute", "death",
    "add_secret", "reveal_to", "expose_secret", "remove_secret",
    "add_hook", "remove_hook", "use_hook", "trigger_event", "trigger_event_on_action",
    "start_scheme", "end_scheme", "add_scheme_progress", "add_scheme_modifier",
    "start_war", "end_war", "add_war_war_score", "create_title_and_vassal_change",
    "add_to_temporary_list", "add_to_list", "remove_from_list",
    "add_to_global_variable_list", "remove_list_global_variable",
    "set_variable", "remove_variable", "change_variable", "set_local_variable",
    "set_global_variable", "remove_global_variable", "change_global_variable",
    "save_scope_as", "save_temporary_scope_as", "save_scope_value_as",
    "clear_saved_scope", "marry", "divorce", "set_betrothal", "break_betrothal",
    "make_pregnant", "set_employer", "remove_courtier_or_guest",
    "add_courtier", "recruit_courtier", "create_character", "create_artifact",
    "destroy_artifact", "set_artifact_owner", "add_artifact_history",
    "change_title_holder", "create_claimant_faction", "destroy_faction",
    "vassalize", "grant_independence", "change_development_level",
    "add_county_modifier", "remove_county_modifier", "add_province_modifier",
    "remove_province_modifier", "set_county_culture", "set_county_faith",
    "start_struggle_phase", "activate_struggle_catalyst", "set_title_name",
    "reset_title_name", "set_capital_county", "add_activity_log_entry",
    "open_view", "close_view", "play_music_cue", "play_sound_effect",
    "show_portrait_editor", "add_achievement_global_variable",
    "send_interface_message", "send_interface_toast", "custom_label",
    "set_relation_lover", "set_relation_friend", "set_relation_rival",
    "set_relation_soulmate", "set_relation_nemesis", "remove_relation_lover",
    "remove_relation_friend", "remove_relation_rival", "add_troops",
    "spawn_army", "disband_army", "change_county_control",
};

/// Hover documentation for the most common built-in triggers.
static TRIGGER_DOCS: phf::Map<&'static str, &'static str> = phf_map! {
    "has_trait" => "True if the character has the named trait.",
    "has_character_flag" => "True if the named flag is set on the character.",
    "is_adult" => "True if the character is at or above adulthood age.",
    "is_alive" => "True if the character is alive.",
    "is_ruler" => "True if the character holds at least one landed title.",
    "is_at_war" => "True if the character is a participant in any war.",
    "is_landed" => "True if the character holds a barony-tier or higher title.",
    "age" => "Compares the character's age in years.",
    "gold" => "Compares the character's current gold reserve.",
    "prestige" => "Compares the character's current prestige.",
    "piety" => "Compares the character's current piety.",
    "opinion" => "Compares this character's opinion of a target character.",
    "exists" => "True if the given scope or saved scope exists.",
    "always" => "Constant trigger; `always = yes` or `always = no`.",
    "tier" => "Compares a title's tier (barony up to empire).",
    "has_claim_on" => "True if the character holds a claim on the target title.",
    "development_level" => "Compares the county's development level.",
    "county_control" => "Compares the county's control value.",
    "has_variable" => "True if the named script variable is set on this scope.",
};

/// Hover documentation for the most common built-in effects.
static EFFECT_DOCS: phf::Map<&'static str, &'static str> = phf_map! {
    "add_gold" => "Adds (or with a negative value removes) gold.",
    "add_prestige" => "Adds prestige; negative values remove prestige.",
    "add_piety" => "Adds piety; negative values remove piety.",
    "add_stress" => "Adds stress; negative values reduce stress.",
    "add_trait" => "Adds the named trait to the character.",
    "remove_trait" => "Removes the named trait from the character.",
    "add_opinion" => "Adds an opinion modifier toward the target.",
    "trigger_event" => "Fires the named event for this scope, optionally delayed.",
    "save_scope_as" => "Saves the current scope under a name for later `scope:` reference.",
    "save_temporary_scope_as" => "Saves the current scope for the rest of this effect only.",
    "set_variable" => "Sets a script variable on the current scope.",
    "imprison" => "Imprisons the target character in this character's dungeon.",
    "start_scheme" => "Starts a scheme of the given type against a target.",
    "start_war" => "Starts a war using the given casus belli.",
    "death" => "Kills the character; `death = natural` or a block with a reason.",
    "marry" => "Marries this character to the target.",
    "set_culture" => "Changes the character's culture.",
    "set_faith" => "Changes the scope's faith.",
};

/// Classification of an identifier against the built-in tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    Trigger,
    Effect,
    /// Known as both; comparison triggers like `gold` shadow effects rarely,
    /// but control keywords such as `exists` live on both sides.
    TriggerAndEffect,
    Keyword,
    Boolean,
}

/// Look up an identifier in all built-in tables.
pub fn classify(name: &str) -> Option<BuiltinKind> {
    let trigger = TRIGGERS.contains(name);
    let effect = EFFECTS.contains(name);
    match (trigger, effect) {
        (true, true) => Some(BuiltinKind::TriggerAndEffect),
        (true, false) => Some(BuiltinKind::Trigger),
        (false, true) => Some(BuiltinKind::Effect),
        (false, false) if KEYWORDS.contains(name) => Some(BuiltinKind::Keyword),
        (false, false) if BOOLEANS.contains(name) => Some(BuiltinKind::Boolean),
        _ => None,
    }
}

/// Whether `name` is a known built-in trigger.
#[inline]
pub fn is_trigger(name: &str) -> bool {
    TRIGGERS.contains(name)
}

/// Whether `name` is a known built-in effect.
#[inline]
pub fn is_effect(name: &str) -> bool {
    EFFECTS.contains(name)
}

/// Whether `name` is a control-flow keyword.
#[inline]
pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(name)
}

/// Hover documentation for a built-in trigger.
pub fn trigger_doc(name: &str) -> Option<&'static str> {
    TRIGGER_DOCS.get(name).copied()
}

/// Hover documentation for a built-in effect.
pub fn effect_doc(name: &str) -> Option<&'static str> {
    EFFECT_DOCS.get(name).copied()
}

/// Nearest built-in trigger within Levenshtein distance 2.
pub fn suggest_trigger(name: &str) -> Option<&'static str> {
    suggest_from(TRIGGERS.iter(), name)
}

/// Nearest built-in effect within Levenshtein distance 2.
pub fn suggest_effect(name: &str) -> Option<&'static str> {
    suggest_from(EFFECTS.iter(), name)
}

fn suggest_from<'a>(
    candidates: impl Iterator<Item = &'a &'static str>,
    name: &str,
) -> Option<&'static str> {
    candidates
        .map(|k| (*k, strsim::levenshtein(k, name)))
        .filter(|(_, d)| *d <= 2)
        .min_by_key(|(k, d)| (*d, *k))
        .map(|(k, _)| k)
}

/// Default scope a trigger compares in when no explicit scope change applies.
/// Only the handful of non-character triggers need entries.
static TRIGGER_SCOPES: phf::Map<&'static str, ScopeType> = phf_map! {
    "terrain" => ScopeType::Province,
    "development_level" => ScopeType::LandedTitle,
    "county_control" => ScopeType::LandedTitle,
    "county_opinion" => ScopeType::LandedTitle,
    "is_county_capital" => ScopeType::LandedTitle,
    "tier" => ScopeType::LandedTitle,
    "is_titular" => ScopeType::LandedTitle,
    "fervor" => ScopeType::Faith,
    "has_doctrine" => ScopeType::Faith,
    "scheme_power" => ScopeType::Scheme,
    "scheme_secrecy" => ScopeType::Scheme,
    "war_days" => ScopeType::War,
};

/// Scope a built-in trigger expects, defaulting to `character`.
pub fn trigger_scope(name: &str) -> ScopeType {
    TRIGGER_SCOPES.get(name).copied().unwrap_or(ScopeType::Character)
}
