//! Validation context and block-context classification.

use ck3_ast::{NodeId, ScriptAst};
use ck3_index::{DocumentIndex, FileKind};
use ck3_schema::SchemaSet;
use ck3_scope::iterators::IteratorPrefix;

/// Read-only context handed to every validator.
pub struct ValidationContext<'a> {
    /// Document URI.
    pub uri: &'a str,
    /// Workspace-relative (or absolute) path used for schema matching.
    pub path: &'a str,
    /// Path-derived file role.
    pub file_kind: FileKind,
    /// The cross-file index snapshot.
    pub index: &'a DocumentIndex,
    /// Loaded schema registry.
    pub schemas: &'a SchemaSet,
    /// Raw source, for line-based style checks.
    pub source: &'a str,
}

/// What kind of content a position sits in, decided by the nearest
/// classifying ancestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockContext {
    /// Only triggers are legal (trigger/limit blocks).
    Trigger,
    /// Only effects are legal (immediate/effect/option bodies).
    Effect,
    /// No classifying ancestor found.
    Unknown,
}

/// Keys that start a trigger context.
fn is_trigger_key(key: &str) -> bool {
    matches!(
        key,
        "trigger" | "limit" | "alternative_limit" | "is_valid" | "is_shown" | "can_pick"
            | "is_valid_showing_failures_only" | "ai_potential" | "ai_will_do" | "potential"
            | "trigger_if" | "trigger_else_if" | "trigger_else" | "modifier" | "weight_multiplier"
    )
}

/// Keys that start an effect context.
fn is_effect_key(key: &str) -> bool {
    matches!(
        key,
        "immediate" | "effect" | "after" | "option" | "on_accept" | "on_decline" | "on_send"
            | "on_start" | "on_end" | "fallback" | "hidden_effect" | "if" | "else_if" | "else"
            | "while" | "random" | "random_list" | "on_success" | "on_failure" | "on_death"
    )
}

/// Classify the position of `node` by walking its ancestor spine, starting
/// at its parent (the node's own key never classifies itself).
///
/// Innermost classification wins: a `trigger` block inside an `option` is a
/// trigger context. Iterator blocks re-assert their prefix's nature (`any_`
/// is a trigger form, the rest are effects). Top-level blocks in scripted
/// effect/trigger files classify the whole body.
pub fn context_of(ast: &ScriptAst, node: NodeId, file_kind: FileKind) -> BlockContext {
    let mut current = ast.node(node).parent;
    while let Some(id) = current {
        let n = ast.node(id);
        let key = n.key.as_str();
        if is_trigger_key(key) {
            return BlockContext::Trigger;
        }
        // `if`/`else_if` blocks host effects, but their own condition lives
        // in a nested `limit`, which classifies first on the way up.
        if is_effect_key(key) {
            return BlockContext::Effect;
        }
        if let Some((prefix, _)) = IteratorPrefix::strip(key) {
            // Only classify when it really is a block; scalar keys with an
            // iterator-looking prefix (e.g. `random_chance = 50`) do not.
            if ast.node(id).is_block() {
                return if prefix.is_effect() {
                    BlockContext::Effect
                } else {
                    BlockContext::Trigger
                };
            }
        }
        // Top-level block of a dedicated file kind.
        if n.parent == Some(ast.root()) {
            return match file_kind {
                FileKind::ScriptedEffects => BlockContext::Effect,
                FileKind::ScriptedTriggers => BlockContext::Trigger,
                _ => BlockContext::Unknown,
            };
        }
        current = n.parent;
    }
    BlockContext::Unknown
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use ck3_parser::parse;

    fn context_at_key(source: &str, key: &str, kind: FileKind) -> BlockContext {
        let outcome = parse(source);
        let ast = &outcome.ast;
        let id = ast.walk().find(|&id| ast.node(id).key == key).unwrap();
        context_of(ast, id, kind)
    }

    #[test]
    fn trigger_and_immediate_classify() {
        let source = "x.1 = { trigger = { is_adult = yes } immediate = { add_gold = 5 } }";
        assert_eq!(context_at_key(source, "is_adult", FileKind::Events), BlockContext::Trigger);
        assert_eq!(context_at_key(source, "add_gold", FileKind::Events), BlockContext::Effect);
    }

    #[test]
    fn limit_inside_effect_is_trigger_context() {
        let source = "x.1 = { immediate = { if = { limit = { is_adult = yes } add_gold = 5 } } }";
        assert_eq!(context_at_key(source, "is_adult", FileKind::Events), BlockContext::Trigger);
        assert_eq!(context_at_key(source, "add_gold", FileKind::Events), BlockContext::Effect);
    }

    #[test]
    fn option_bodies_are_effects_but_nested_triggers_classify() {
        let source = "x.1 = { option = { name = a trigger = { is_ruler = yes } add_piety = 1 } }";
        assert_eq!(context_at_key(source, "is_ruler", FileKind::Events), BlockContext::Trigger);
        assert_eq!(context_at_key(source, "add_piety", FileKind::Events), BlockContext::Effect);
    }

    #[test]
    fn iterator_prefix_decides_context() {
        let source = "x.1 = { immediate = { every_child = { add_gold = 1 } } trigger = { any_child = { is_adult = yes } } }";
        assert_eq!(context_at_key(source, "add_gold", FileKind::Events), BlockContext::Effect);
        assert_eq!(context_at_key(source, "is_adult", FileKind::Events), BlockContext::Trigger);
    }

    #[test]
    fn file_kind_classifies_top_level_bodies() {
        assert_eq!(
            context_at_key("my_fx = { add_gold = 1 }", "add_gold", FileKind::ScriptedEffects),
            BlockContext::Effect
        );
        assert_eq!(
            context_at_key("my_tr = { is_adult = yes }", "is_adult", FileKind::ScriptedTriggers),
            BlockContext::Trigger
        );
        assert_eq!(
            context_at_key("top = { a = b }", "a", FileKind::Other),
            BlockContext::Unknown
        );
    }
}
