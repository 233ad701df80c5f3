//! Scope annotation walk.
//!
//! One post-parse pass resolves the scope type every node's value evaluates
//! in. The walk maintains the enclosing scope stack so `prev` and `root`
//! resolve, and consults the link and iterator tables for keys that switch
//! scope. Unresolvable switches produce `Unknown`, never an error here - the
//! scope validator reports them with positions and suggestions.

use ck3_ast::{NodeId, NodeType, NodeValue, ScriptAst};
use ck3_scope::{ScopeType, iterators, links, validate_chain};

/// Annotate every node's `scope_type` in place. Idempotent; runs after every
/// parse so stale annotations never survive an edit.
pub fn annotate_scopes(ast: &mut ScriptAst) {
    let root = ast.root();
    let top_level: Vec<NodeId> = ast.children(root).to_vec();
    for id in top_level {
        let node = ast.node(id);
        if node.node_type != NodeType::Assignment {
            continue;
        }
        let scope = top_level_scope(ast, id);
        ast.node_mut(id).scope_type = scope;
        if ast.node(id).is_block() {
            let mut stack = Vec::new();
            visit_block(ast, id, scope, &mut stack);
        }
    }
}

/// Scope of a top-level block. Event bodies evaluate in `character` scope;
/// anything else starts `Unknown` until a file-kind-aware caller narrows it.
fn top_level_scope(ast: &ScriptAst, id: NodeId) -> ScopeType {
    let node = ast.node(id);
    if !node.is_block() {
        return ScopeType::None;
    }
    if let Some(event_type) = ast.scalar_of(id, "type") {
        if event_type.ends_with("_event") {
            return ScopeType::Character;
        }
    }
    // `namespace.NNNN` event ids default to character scope even when the
    // `type` field is missing (it defaults to character_event in the engine).
    if looks_like_event_id(&node.key) {
        return ScopeType::Character;
    }
    ScopeType::Unknown
}

/// `namespace.NNNN` - an identifier with a dot followed by digits.
pub fn looks_like_event_id(key: &str) -> bool {
    match key.rsplit_once('.') {
        Some((ns, num)) => {
            !ns.is_empty()
                && !num.is_empty()
                && num.bytes().all(|b| b.is_ascii_digit())
                && ns.bytes().next().is_some_and(|b| b.is_ascii_alphabetic() || b == b'_')
        }
        None => false,
    }
}

fn visit_block(ast: &mut ScriptAst, block: NodeId, current: ScopeType, stack: &mut Vec<ScopeType>) {
    let children: Vec<NodeId> = ast.children(block).to_vec();
    for child in children {
        match ast.node(child).node_type {
            NodeType::Comment => continue,
            NodeType::ListItem => {
                ast.node_mut(child).scope_type = current;
                continue;
            }
            NodeType::Root | NodeType::Assignment => {}
        }

        let key = ast.node(child).key.clone();
        let is_block = ast.node(child).is_block();

        if !is_block {
            // Leaves evaluate in the enclosing scope; chain resolution of the
            // key itself is the validator's business.
            ast.node_mut(child).scope_type = current;
            continue;
        }

        let (inner, switched) = block_scope(&key, current, stack);
        ast.node_mut(child).scope_type = inner;

        if switched {
            stack.push(current);
            visit_block(ast, child, inner, stack);
            stack.pop();
        } else {
            visit_block(ast, child, inner, stack);
        }
    }
}

/// Resolve the scope a block key switches into, and whether it pushes the
/// enclosing scope onto the `prev` stack.
fn block_scope(key: &str, current: ScopeType, stack: &[ScopeType]) -> (ScopeType, bool) {
    if key.starts_with("scope:") {
        // Saved-scope types are not tracked statically.
        return (ScopeType::Unknown, true);
    }
    if key == "this" {
        return (current, true);
    }
    if key == "prev" {
        return (stack.last().copied().unwrap_or(ScopeType::Unknown), true);
    }
    if key == "root" {
        return (stack.first().copied().unwrap_or(current), true);
    }
    if let Some((_, base)) = iterators::parse_iterator_key(key) {
        if let Some(target) = iterators::resolve_iterator(base, current) {
            return (target, true);
        }
        // Keys like `random_list` parse as iterators but are control flow.
        if ck3_tables::is_keyword(key) {
            return (current, false);
        }
        return (ScopeType::Unknown, true);
    }
    if key.contains('.') {
        let outcome = validate_chain(key, current, stack);
        return (outcome.result, true);
    }
    if !matches!(current, ScopeType::Unknown | ScopeType::Any) {
        if let Some(target) = links::resolve_link(current, key) {
            return (target, true);
        }
    }
    // Control keywords, trigger/effect/option blocks, unknown keys: the
    // enclosing scope flows through.
    (current, false)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::parse;
    use ck3_ast::NodeId;

    fn find_key(ast: &ScriptAst, key: &str) -> Option<NodeId> {
        ast.walk().find(|&id| ast.node(id).key == key)
    }

    #[test]
    fn event_blocks_are_character_scoped() {
        let outcome = parse("my_mod.0001 = { type = character_event\n trigger = { is_adult = yes } }");
        let ast = &outcome.ast;
        let event = find_key(ast, "my_mod.0001").unwrap();
        assert_eq!(ast.node(event).scope_type, ScopeType::Character);
        let trigger = find_key(ast, "trigger").unwrap();
        assert_eq!(ast.node(trigger).scope_type, ScopeType::Character);
        let leaf = find_key(ast, "is_adult").unwrap();
        assert_eq!(ast.node(leaf).scope_type, ScopeType::Character);
    }

    #[test]
    fn link_blocks_switch_scope() {
        let outcome = parse("x.1 = { immediate = { primary_title = { set_title_name = foo } } }");
        let ast = &outcome.ast;
        let title_block = find_key(ast, "primary_title").unwrap();
        assert_eq!(ast.node(title_block).scope_type, ScopeType::LandedTitle);
        let leaf = find_key(ast, "set_title_name").unwrap();
        assert_eq!(ast.node(leaf).scope_type, ScopeType::LandedTitle);
    }

    #[test]
    fn iterator_blocks_switch_to_element_scope() {
        let outcome = parse("x.1 = { immediate = { every_held_title = { set_title_name = a } } }");
        let ast = &outcome.ast;
        let iter_block = find_key(ast, "every_held_title").unwrap();
        assert_eq!(ast.node(iter_block).scope_type, ScopeType::LandedTitle);
    }

    #[test]
    fn prev_restores_the_enclosing_scope() {
        let outcome =
            parse("x.1 = { immediate = { primary_title = { prev = { add_gold = 5 } } } }");
        let ast = &outcome.ast;
        let prev_block = find_key(ast, "prev").unwrap();
        assert_eq!(ast.node(prev_block).scope_type, ScopeType::Character);
    }

    #[test]
    fn root_reads_the_event_scope() {
        let outcome = parse(
            "x.1 = { immediate = { primary_title = { root = { add_prestige = 10 } } } }",
        );
        let ast = &outcome.ast;
        let root_block = find_key(ast, "root").unwrap();
        assert_eq!(ast.node(root_block).scope_type, ScopeType::Character);
    }

    #[test]
    fn event_id_heuristic() {
        assert!(looks_like_event_id("my_mod.0001"));
        assert!(looks_like_event_id("ab.1"));
        assert!(!looks_like_event_id("liege.primary_title"));
        assert!(!looks_like_event_id("0001"));
        assert!(!looks_like_event_id("my_mod."));
    }

    #[test]
    fn non_event_top_level_is_unknown() {
        let outcome = parse("my_scripted_effect = { add_gold = 5 }");
        let ast = &outcome.ast;
        let top = find_key(ast, "my_scripted_effect").unwrap();
        assert_eq!(ast.node(top).scope_type, ScopeType::Unknown);
    }
}
