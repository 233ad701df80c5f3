//! Quick-fix code actions.
//!
//! Two families: replace-token fixes driven by the `replacement` payload
//! that validators attach to typo diagnostics (unknown trigger/effect, bad
//! chain segment, bad iterator), and insert-missing-field fixes for schema
//! "missing required field" diagnostics.

use crate::features::DocSnapshot;
use ck3_ast::{Position, Range};
use serde_json::{Value, json};

/// Build quick fixes for the diagnostics the client sent back.
pub fn code_actions(snapshot: &DocSnapshot, diagnostics: &[Value]) -> Vec<Value> {
    let mut out = Vec::new();
    for diagnostic in diagnostics {
        if let Some(action) = replacement_fix(snapshot, diagnostic) {
            out.push(action);
        }
        if let Some(action) = missing_field_fix(snapshot, diagnostic) {
            out.push(action);
        }
    }
    out
}

/// `data.replacement` → "Replace with '<x>'".
fn replacement_fix(snapshot: &DocSnapshot, diagnostic: &Value) -> Option<Value> {
    let replacement = diagnostic.get("data")?.get("replacement")?.as_str()?;
    let range = diagnostic.get("range")?.clone();
    Some(json!({
        "title": format!("Replace with '{replacement}'"),
        "kind": "quickfix",
        "diagnostics": [diagnostic],
        "edit": single_file_edit(&snapshot.uri, json!({ "range": range, "newText": replacement })),
    }))
}

/// `{ changes: { <uri>: [edit] } }` - the key is dynamic, so the map is
/// built by hand.
fn single_file_edit(uri: &str, edit: Value) -> Value {
    let mut changes = serde_json::Map::new();
    changes.insert(uri.to_string(), Value::Array(vec![edit]));
    json!({ "changes": changes })
}

/// "missing required field 'x'" → insert `x = ` as the block's first entry.
fn missing_field_fix(snapshot: &DocSnapshot, diagnostic: &Value) -> Option<Value> {
    let message = diagnostic.get("message")?.as_str()?;
    let field = message.strip_prefix("missing required field '")?.strip_suffix('\'')?;

    // The diagnostic anchors on the block's key; insert after its `{` line.
    let start_line = diagnostic["range"]["start"]["line"].as_u64()? as u32;
    let ast = &snapshot.parse.ast;
    let anchor = ast.node_at_position(Position::new(
        start_line,
        diagnostic["range"]["start"]["character"].as_u64()? as u32,
    ))?;
    let block = if ast.node(anchor).is_block() {
        anchor
    } else {
        ast.ancestors(anchor).find(|&a| ast.node(a).is_block())?
    };
    let node = ast.node(block);
    let depth = std::iter::once(block).chain(ast.ancestors(block)).count().saturating_sub(2);
    let indent = "\t".repeat(depth + 1);
    let insert_at = Position::new(node.range.start.line + 1, 0);
    let new_text = format!("{indent}{field} = \n");

    Some(json!({
        "title": format!("Insert '{field}'"),
        "kind": "quickfix",
        "diagnostics": [diagnostic],
        "edit": single_file_edit(
            &snapshot.uri,
            json!({ "range": Range::new(insert_at, insert_at), "newText": new_text }),
        ),
    }))
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

    #[test]
    fn replacement_diagnostic_yields_a_fix() {
        let snap = snapshot("m.0001 = { trigger = { has_trate = yes } }");
        let diagnostic = json!({
            "range": { "start": { "line": 0, "character": 23 }, "end": { "line": 0, "character": 32 } },
            "message": "unknown trigger 'has_trate'; did you mean 'has_trait'?",
            "code": "CK3101",
            "data": { "replacement": "has_trait" }
        });
        let actions = code_actions(&snap, &[diagnostic]);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0]["title"], "Replace with 'has_trait'");
        let edit = &actions[0]["edit"]["changes"]["file:///mod/events/test.txt"][0];
        assert_eq!(edit["newText"], "has_trait");
    }

    #[test]
    fn missing_field_diagnostic_yields_an_insert() {
        let snap = snapshot("m.0001 = {\n\toption = {\n\t\tadd_gold = 5\n\t}\n}\n");
        let diagnostic = json!({
            "range": { "start": { "line": 1, "character": 1 }, "end": { "line": 1, "character": 7 } },
            "message": "missing required field 'name'",
            "code": "CK3404",
        });
        let actions = code_actions(&snap, &[diagnostic]);
        assert_eq!(actions.len(), 1);
        let edit = &actions[0]["edit"]["changes"]["file:///mod/events/test.txt"][0];
        assert_eq!(edit["range"]["start"]["line"], 2);
        assert!(edit["newText"].as_str().unwrap().contains("name = "));
    }

    #[test]
    fn unrelated_diagnostics_yield_nothing() {
        let snap = snapshot("m.0001 = { }");
        let diagnostic = json!({
            "range": { "start": { "line": 0, "character": 0 }, "end": { "line": 0, "character": 6 } },
            "message": "something else entirely",
            "code": "CK3501",
        });
        assert!(code_actions(&snap, &[diagnostic]).is_empty());
    }
}
