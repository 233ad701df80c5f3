//! Code-lens provider with resolve support.
//!
//! Definitions governed by a schema whose recipe asks for reference counts
//! get an unresolved lens carrying `{symbol, category}` data; resolve fills
//! in the "N references" title so the count is only computed when the lens
//! scrolls into view. Events additionally get a missing-localization lens
//! per the recipe.

use crate::features::DocSnapshot;
use crate::features::references::find_references;
use ck3_ast::NodeType;
use ck3_index::{DocumentIndex, SymbolCategory};
use ck3_schema::SchemaSet;
use serde_json::{Value, json};
use std::path::PathBuf;

/// Unresolved lenses for a document.
pub fn code_lenses(snapshot: &DocSnapshot, index: &DocumentIndex, schemas: &SchemaSet) -> Vec<Value> {
    let ast = &snapshot.parse.ast;
    let mut out = Vec::new();

    for &top in ast.children(ast.root()) {
        let node = ast.node(top);
        if node.node_type != NodeType::Assignment || !node.is_block() {
            continue;
        }
        let Some(schema) = schemas.schema_for_block(&snapshot.path, &node.key) else { continue };

        if schema.code_lens.reference_counts {
            out.push(json!({
                "range": node.key_range,
                "data": { "symbol": node.key, "uri": snapshot.uri },
            }));
        }

        if !schema.code_lens.missing_localization.is_empty()
            && index.stats().get("localization").copied().unwrap_or(0) > 0
        {
            let mut missing = Vec::new();
            for field in &schema.code_lens.missing_localization {
                for occurrence in ast.child_assignments(top, field) {
                    if let Some(scalar) = ast.node(occurrence).scalar() {
                        if scalar.kind == ck3_ast::ScalarKind::Identifier
                            && index.lookup(SymbolCategory::Localization, &scalar.text).is_empty()
                        {
                            missing.push(scalar.text.clone());
                        }
                    }
                }
            }
            if !missing.is_empty() {
                out.push(json!({
                    "range": node.key_range,
                    "command": {
                        "title": format!("⚠ {} missing localization key(s)", missing.len()),
                        "command": "ck3.generateLocalizationStubs",
                        "arguments": [node.key],
                    },
                }));
            }
        }
    }
    out
}

/// Resolve a reference-count lens.
pub fn resolve_code_lens(
    lens: &Value,
    open_docs: &[(String, String)],
    roots: &[PathBuf],
) -> Value {
    let mut resolved = lens.clone();
    let Some(symbol) = lens["data"]["symbol"].as_str() else { return resolved };

    let sites = find_references(symbol, open_docs, roots);
    // The definition itself is one of the occurrences.
    let count = sites.len().saturating_sub(1);
    let title = match count {
        1 => "1 reference".to_string(),
        n => format!("{n} references"),
    };
    resolved["command"] = json!({
        "title": title,
        "command": "ck3.showReferences",
        "arguments": [lens["data"]["uri"], lens["range"]["start"], symbol],
    });
    resolved
}
