//! Document symbols (outline) provider.
//!
//! Schema-governed blocks follow their schema's symbols recipe; everything
//! else falls back to one symbol per top-level block.

use crate::features::DocSnapshot;
use ck3_ast::NodeType;
use ck3_schema::{OutlineItem, SchemaSet};
use lsp_types::SymbolKind;
use serde_json::{Value, json};

/// Map a recipe kind name to the LSP `SymbolKind`.
fn symbol_kind(name: &str) -> SymbolKind {
    match name {
        "file" => SymbolKind::FILE,
        "module" => SymbolKind::MODULE,
        "namespace" => SymbolKind::NAMESPACE,
        "class" => SymbolKind::CLASS,
        "method" => SymbolKind::METHOD,
        "property" => SymbolKind::PROPERTY,
        "field" => SymbolKind::FIELD,
        "enum" => SymbolKind::ENUM,
        "function" => SymbolKind::FUNCTION,
        "variable" => SymbolKind::VARIABLE,
        "constant" => SymbolKind::CONSTANT,
        "string" => SymbolKind::STRING,
        "number" => SymbolKind::NUMBER,
        "boolean" => SymbolKind::BOOLEAN,
        "key" => SymbolKind::KEY,
        "enum_member" => SymbolKind::ENUM_MEMBER,
        "event" => SymbolKind::EVENT,
        _ => SymbolKind::OBJECT,
    }
}

/// Produce the `DocumentSymbol[]` tree.
pub fn document_symbols(snapshot: &DocSnapshot, schemas: &SchemaSet) -> Vec<Value> {
    let ast = &snapshot.parse.ast;
    let mut out = Vec::new();

    for &top in ast.children(ast.root()) {
        let node = ast.node(top);
        if node.node_type != NodeType::Assignment || node.key.is_empty() {
            continue;
        }
        if let Some(schema) = schemas.schema_for_block(&snapshot.path, &node.key) {
            if let Some(outline) = schema.outline(ast, top) {
                out.push(render(&outline));
                continue;
            }
        }
        if node.is_block() {
            out.push(json!({
                "name": node.key,
                "kind": symbol_kind("object"),
                "range": node.range,
                "selectionRange": node.key_range,
                "children": [],
            }));
        }
    }
    out
}

fn render(item: &OutlineItem) -> Value {
    json!({
        "name": item.name,
        "detail": item.detail,
        "kind": symbol_kind(&item.kind),
        "range": item.range,
        "selectionRange": item.selection_range,
        "children": item.children.iter().map(render).collect::<Vec<_>>(),
    })
}

/// Workspace-symbol search over the index.
pub fn workspace_symbols(
    index: &ck3_index::DocumentIndex,
    query: &str,
    limit: usize,
) -> Vec<Value> {
    use ck3_index::SymbolCategory;
    let categories = [
        (SymbolCategory::Events, "event"),
        (SymbolCategory::ScriptedEffects, "function"),
        (SymbolCategory::ScriptedTriggers, "boolean"),
        (SymbolCategory::ScriptValues, "number"),
        (SymbolCategory::OnActions, "module"),
        (SymbolCategory::Modifiers, "property"),
        (SymbolCategory::Traits, "enum_member"),
    ];
    let mut out = Vec::new();
    for (category, kind) in categories {
        for (name, entry) in index.search(category, query) {
            out.push(json!({
                "name": name,
                "kind": symbol_kind(kind),
                "location": { "uri": entry.uri, "range": entry.range },
                "containerName": category.as_str(),
            }));
            if out.len() >= limit {
                return out;
            }
        }
    }
    out
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
    fn events_outline_with_options() {
        let text = "m.0001 = {\n\ttype = character_event\n\toption = { name = m.0001.a }\n\toption = { name = m.0001.b }\n}\n";
        let symbols = document_symbols(&snapshot(text), &SchemaSet::load_bundled());
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0]["name"], "m.0001");
        assert_eq!(symbols[0]["kind"], 24);
        assert_eq!(symbols[0]["children"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn unmatched_blocks_fall_back_to_plain_symbols() {
        let snap = DocSnapshot {
            path: "mod/common/landed_titles/t.txt".into(),
            ..snapshot("k_mykingdom = { color = { 1 2 3 } }")
        };
        let symbols = document_symbols(&snap, &SchemaSet::load_bundled());
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0]["name"], "k_mykingdom");
    }

    #[test]
    fn workspace_symbol_search_queries_the_index() {
        let index = ck3_index::DocumentIndex::new();
        index.replace(
            "file:///a.txt",
            vec![ck3_index::Contribution {
                category: ck3_index::SymbolCategory::Events,
                name: "war.0001".into(),
                range: ck3_ast::Range::on_line(0, 0, 8),
                attributes: Vec::new(),
            }],
        );
        let found = workspace_symbols(&index, "war", 50);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["name"], "war.0001");
    }
}
