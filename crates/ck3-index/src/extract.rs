//! Per-category symbol extraction from parsed files.
//!
//! Which categories a file feeds is decided by its workspace path: files
//! under `events/` define namespaces and events, files under
//! `common/scripted_effects/` define scripted effects, and so on. Saved
//! scopes are extracted from `save_scope_as` occurrences and are file-scoped:
//! each carries its enclosing event id (or block name) as an attribute so
//! completion can filter to the enclosing body.

use crate::{Contribution, SymbolCategory};
use ck3_ast::{NodeId, NodeType, ScriptAst};
use ck3_parser::annotate::looks_like_event_id;

/// Workspace role of a file, derived from its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Events,
    ScriptedEffects,
    ScriptedTriggers,
    ScriptedLists,
    ScriptValues,
    OnActions,
    CharacterInteractions,
    Modifiers,
    OpinionModifiers,
    ScriptedGuis,
    Traits,
    Localization,
    Other,
}

impl FileKind {
    /// The category this kind's top-level blocks define, if any.
    pub fn definition_category(&self) -> Option<SymbolCategory> {
        match self {
            FileKind::ScriptedEffects => Some(SymbolCategory::ScriptedEffects),
            FileKind::ScriptedTriggers => Some(SymbolCategory::ScriptedTriggers),
            FileKind::ScriptedLists => Some(SymbolCategory::ScriptedLists),
            FileKind::ScriptValues => Some(SymbolCategory::ScriptValues),
            FileKind::OnActions => Some(SymbolCategory::OnActions),
            FileKind::CharacterInteractions => Some(SymbolCategory::CharacterInteractions),
            FileKind::Modifiers => Some(SymbolCategory::Modifiers),
            FileKind::OpinionModifiers => Some(SymbolCategory::OpinionModifiers),
            FileKind::ScriptedGuis => Some(SymbolCategory::ScriptedGuis),
            FileKind::Traits => Some(SymbolCategory::Traits),
            _ => None,
        }
    }

    /// Whether top-level blocks in this kind contain effect bodies whose
    /// saved scopes should be indexed.
    fn indexes_saved_scopes(&self) -> bool {
        matches!(
            self,
            FileKind::Events
                | FileKind::ScriptedEffects
                | FileKind::OnActions
                | FileKind::CharacterInteractions
        )
    }
}

/// Classify a file path (URI path or filesystem path, either separator).
pub fn file_kind_for_path(path: &str) -> FileKind {
    let normalized = path.replace('\\', "/").to_ascii_lowercase();
    if normalized.ends_with(".yml") {
        if normalized.contains("/localization/") || normalized.starts_with("localization/") {
            return FileKind::Localization;
        }
        return FileKind::Other;
    }
    if !normalized.ends_with(".txt") {
        return FileKind::Other;
    }
    if normalized.contains("/events/") || normalized.starts_with("events/") {
        return FileKind::Events;
    }
    for (needle, kind) in [
        ("common/scripted_effects/", FileKind::ScriptedEffects),
        ("common/scripted_triggers/", FileKind::ScriptedTriggers),
        ("common/scripted_lists/", FileKind::ScriptedLists),
        ("common/script_values/", FileKind::ScriptValues),
        ("common/on_action/", FileKind::OnActions),
        ("common/character_interactions/", FileKind::CharacterInteractions),
        ("common/modifiers/", FileKind::Modifiers),
        ("common/opinion_modifiers/", FileKind::OpinionModifiers),
        ("common/scripted_guis/", FileKind::ScriptedGuis),
        ("common/traits/", FileKind::Traits),
    ] {
        if normalized.contains(needle) {
            return kind;
        }
    }
    FileKind::Other
}

/// Extract every contribution a parsed file makes to the index.
pub fn extract_contributions(ast: &ScriptAst, kind: FileKind) -> Vec<Contribution> {
    let mut out = Vec::new();
    let root = ast.root();

    for &top in ast.children(root) {
        let node = ast.node(top);
        if node.node_type != NodeType::Assignment {
            continue;
        }

        if node.key == "namespace" {
            if let Some(scalar) = node.scalar() {
                out.push(Contribution {
                    category: SymbolCategory::Namespaces,
                    name: scalar.text.clone(),
                    range: scalar.range,
                    attributes: Vec::new(),
                });
            }
            continue;
        }

        if (kind == FileKind::Events || kind == FileKind::Other)
            && node.is_block()
            && looks_like_event_id(&node.key)
        {
            let mut attributes = Vec::new();
            for doc_key in ["type", "title", "desc"] {
                if let Some(value) = ast.scalar_of(top, doc_key) {
                    attributes.push((doc_key.to_string(), value.to_string()));
                }
            }
            out.push(Contribution {
                category: SymbolCategory::Events,
                name: node.key.clone(),
                range: node.key_range,
                attributes,
            });
            extract_block_symbols(ast, top, &node.key.clone(), &mut out);
            continue;
        }

        if let Some(category) = kind.definition_category() {
            out.push(Contribution {
                category,
                name: node.key.clone(),
                range: node.key_range,
                attributes: Vec::new(),
            });
            if kind.indexes_saved_scopes() && node.is_block() {
                extract_block_symbols(ast, top, &node.key.clone(), &mut out);
            }
        }
    }

    out
}

/// Walk one top-level body for saved scopes and character flags.
fn extract_block_symbols(ast: &ScriptAst, top: NodeId, owner: &str, out: &mut Vec<Contribution>) {
    let mut stack = vec![top];
    while let Some(id) = stack.pop() {
        for &child in ast.children(id) {
            let node = ast.node(child);
            if node.is_block() {
                stack.push(child);
                continue;
            }
            let Some(scalar) = node.scalar() else { continue };
            match node.key.as_str() {
                "save_scope_as" | "save_temporary_scope_as" => {
                    out.push(Contribution {
                        category: SymbolCategory::SavedScopes,
                        name: scalar.text.clone(),
                        range: scalar.range,
                        attributes: vec![("event".to_string(), owner.to_string())],
                    });
                }
                "add_character_flag" | "has_character_flag" | "remove_character_flag" => {
                    // Only definitions (add_) index; has_/remove_ are lookups.
                    if node.key.as_str() == "add_character_flag" {
                        out.push(Contribution {
                            category: SymbolCategory::CharacterFlags,
                            name: scalar.text.clone(),
                            range: scalar.range,
                            attributes: Vec::new(),
                        });
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ck3_parser::parse;
    use pretty_assertions::assert_eq;

    #[test]
    fn path_routing() {
        assert_eq!(file_kind_for_path("mod/events/war_events.txt"), FileKind::Events);
        assert_eq!(
            file_kind_for_path("mod/common/scripted_effects/my_effects.txt"),
            FileKind::ScriptedEffects
        );
        assert_eq!(
            file_kind_for_path("mod\\common\\on_action\\yearly.txt"),
            FileKind::OnActions
        );
        assert_eq!(
            file_kind_for_path("mod/localization/english/my_l_english.yml"),
            FileKind::Localization
        );
        assert_eq!(file_kind_for_path("mod/gfx/icon.dds"), FileKind::Other);
    }

    #[test]
    fn events_file_contributes_namespace_events_and_saved_scopes() {
        let source = "namespace = my_mod\n\
                      my_mod.0001 = {\n\
                      \ttype = character_event\n\
                      \ttitle = my_mod.0001.t\n\
                      \timmediate = { save_scope_as = victim }\n\
                      }\n";
        let outcome = parse(source);
        let contributions = extract_contributions(&outcome.ast, FileKind::Events);

        let namespaces: Vec<_> = contributions
            .iter()
            .filter(|c| c.category == SymbolCategory::Namespaces)
            .collect();
        assert_eq!(namespaces.len(), 1);
        assert_eq!(namespaces[0].name, "my_mod");

        let events: Vec<_> =
            contributions.iter().filter(|c| c.category == SymbolCategory::Events).collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "my_mod.0001");
        assert!(events[0].attributes.iter().any(|(k, v)| k == "title" && v == "my_mod.0001.t"));

        let scopes: Vec<_> =
            contributions.iter().filter(|c| c.category == SymbolCategory::SavedScopes).collect();
        assert_eq!(scopes.len(), 1);
        assert_eq!(scopes[0].name, "victim");
        assert_eq!(scopes[0].attributes, vec![("event".to_string(), "my_mod.0001".to_string())]);
    }

    #[test]
    fn scripted_effects_file_contributes_top_level_keys() {
        let outcome = parse("grant_boon = { add_gold = 50 }\npunish = { add_stress = 10 }");
        let contributions = extract_contributions(&outcome.ast, FileKind::ScriptedEffects);
        let names: Vec<_> = contributions
            .iter()
            .filter(|c| c.category == SymbolCategory::ScriptedEffects)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["grant_boon", "punish"]);
    }

    #[test]
    fn script_values_may_be_scalars() {
        let outcome = parse("base_cost = 25\nscaling_cost = { value = 10 multiply = 3 }");
        let contributions = extract_contributions(&outcome.ast, FileKind::ScriptValues);
        let names: Vec<_> = contributions
            .iter()
            .filter(|c| c.category == SymbolCategory::ScriptValues)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["base_cost", "scaling_cost"]);
    }

    #[test]
    fn flags_index_only_definitions() {
        let source = "x.1 = { immediate = { add_character_flag = marked } trigger = { has_character_flag = marked } }";
        let outcome = parse(source);
        let contributions = extract_contributions(&outcome.ast, FileKind::Events);
        let flags: Vec<_> = contributions
            .iter()
            .filter(|c| c.category == SymbolCategory::CharacterFlags)
            .collect();
        assert_eq!(flags.len(), 1);
    }
}
