//! Inlay hints provider.
//!
//! Three hint families: the scope type an iterator iterates in, the result
//! type of a dotted chain key, and the (untracked) type after a
//! `scope:` block key. Hints land at the end of the key token.

use crate::features::DocSnapshot;
use ck3_ast::{NodeType, Position, Range};
use ck3_scope::{ScopeType, iterators, validate_chain};
use serde_json::{Value, json};

/// Hints for the nodes intersecting `range`.
pub fn inlay_hints(snapshot: &DocSnapshot, range: Range) -> Vec<Value> {
    let ast = &snapshot.parse.ast;
    let mut out = Vec::new();

    for id in ast.walk() {
        let node = ast.node(id);
        if node.node_type != NodeType::Assignment || node.parent == Some(ast.root()) {
            continue;
        }
        if node.key_range.start > range.end || node.key_range.end < range.start {
            continue;
        }
        let enclosing = node
            .parent
            .map(|p| ast.node(p).scope_type)
            .unwrap_or(ScopeType::Unknown);

        let hint = if let Some((_, base)) = iterators::parse_iterator_key(&node.key) {
            if ck3_tables::is_keyword(&node.key) {
                None
            } else {
                iterators::resolve_iterator(base, enclosing)
                    .filter(|t| !t.is_unknown())
                    .map(|t| t.to_string())
            }
        } else if node.key.starts_with("scope:") && node.is_block() {
            // Saved-scope types are dynamic; annotate them as such.
            Some(node.scope_type.to_string())
        } else if node.key.contains('.') && !enclosing.is_unknown() {
            let outcome = validate_chain(&node.key, enclosing, &[]);
            (outcome.error.is_none() && !outcome.result.is_unknown())
                .then(|| outcome.result.to_string())
        } else {
            None
        };

        if let Some(label) = hint {
            out.push(hint_at(node.key_range.end, &label));
        }
    }
    out
}

fn hint_at(position: Position, label: &str) -> Value {
    json!({
        "position": position,
        "label": format!(": {label}"),
        "kind": 1,
        "paddingLeft": false,
        "paddingRight": true,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::Arc;

    fn snapshot(text: &str) -> DocSnapshot {
        DocSnapshot {
            uri: "file:///mod/events/test.txt".into(),
            path: "mod/events/test.txt".into(),
            kind: ck3_index::FileKind::Events,
            version: 1,
            text: text.to_string(),
            parse: Arc::new(ck3_parser::parse(text)),
        }
    }

    fn full_range() -> Range {
        Range::new(Position::new(0, 0), Position::new(1000, 0))
    }

    #[test]
    fn iterator_targets_are_hinted() {
        let text = "m.0001 = { immediate = { every_held_title = { set_title_name = a } } }";
        let hints = inlay_hints(&snapshot(text), full_range());
        assert!(hints.iter().any(|h| h["label"] == ": landed_title"));
    }

    #[test]
    fn chain_results_are_hinted() {
        let text = "m.0001 = { immediate = { liege.primary_title = { set_title_name = a } } }";
        let hints = inlay_hints(&snapshot(text), full_range());
        assert!(hints.iter().any(|h| h["label"] == ": landed_title"));
    }

    #[test]
    fn broken_chains_are_not_hinted() {
        let text = "m.0001 = { immediate = { liege.primry_title = { x = a } } }";
        let hints = inlay_hints(&snapshot(text), full_range());
        assert!(hints.is_empty(), "{hints:?}");
    }

    #[test]
    fn range_filters_hints() {
        let text = "m.0001 = { immediate = { every_child = { add_gold = 1 } } }\nm.0002 = { immediate = { every_vassal = { add_gold = 1 } } }";
        let first_line_only = Range::new(Position::new(0, 0), Position::new(0, 100));
        let hints = inlay_hints(&snapshot(text), first_line_only);
        assert_eq!(hints.len(), 1);
    }
}
