//! Hover provider.
//!
//! Resolution order: schema field documentation, then built-in trigger and
//! effect docs, then index entries (event titles, scripted block origins),
//! then the scope-type annotation as a last resort.

use crate::features::DocSnapshot;
use crate::util::word_at;
use ck3_ast::{NodeId, Position, Range};
use ck3_index::{DocumentIndex, SymbolCategory};
use ck3_parser::annotate::looks_like_event_id;
use ck3_schema::SchemaSet;
use ck3_scope::{ScopeType, links};
use serde_json::{Value, json};

/// Produce a hover reply (`null` when nothing resolves).
pub fn hover(
    snapshot: &DocSnapshot,
    index: &DocumentIndex,
    schemas: &SchemaSet,
    position: Position,
) -> Option<Value> {
    let line = snapshot.line_text(position.line)?;
    let (word, range) = word_at(line, position.line, position.character)?;

    let markdown = schema_doc(snapshot, schemas, position, &word)
        .or_else(|| builtin_doc(&word))
        .or_else(|| index_doc(index, &word))
        .or_else(|| scope_annotation(snapshot, position, &word))?;

    Some(json!({
        "contents": { "kind": "markdown", "value": markdown },
        "range": range,
    }))
}

fn schema_doc(
    snapshot: &DocSnapshot,
    schemas: &SchemaSet,
    position: Position,
    word: &str,
) -> Option<String> {
    let ast = &snapshot.parse.ast;
    let node = ast.node_at_position(position)?;
    // Only the key of an assignment gets field docs.
    if ast.node(node).key != *word {
        return None;
    }
    let mut spine: Vec<NodeId> =
        std::iter::once(node).chain(ast.ancestors(node)).filter(|&id| id != ast.root()).collect();
    spine.reverse();
    let top = *spine.first()?;
    let schema = schemas.schema_for_block(&snapshot.path, &ast.node(top).key)?;
    let path: Vec<&str> = spine[1..].iter().map(|&id| ast.node(id).key.as_str()).collect();
    if path.is_empty() {
        return None;
    }
    let field = schema.doc_for_path(&path)?;
    let doc = field.record.doc.as_ref()?;
    let mut text = format!("**{word}**\n\n{}", doc.description);
    if let Some(detail) = &doc.detail {
        text.push_str("\n\n");
        text.push_str(detail);
    }
    if !field.enum_values.is_empty() {
        text.push_str("\n\nValues: ");
        text.push_str(&field.enum_values.join(", "));
    }
    Some(text)
}

fn builtin_doc(word: &str) -> Option<String> {
    if let Some(doc) = ck3_tables::trigger_doc(word) {
        return Some(format!("**{word}** *(trigger)*\n\n{doc}"));
    }
    if let Some(doc) = ck3_tables::effect_doc(word) {
        return Some(format!("**{word}** *(effect)*\n\n{doc}"));
    }
    // Known name without prose: still label what it is.
    match ck3_tables::classify(word) {
        Some(ck3_tables::BuiltinKind::Trigger) => Some(format!("**{word}** *(trigger)*")),
        Some(ck3_tables::BuiltinKind::Effect) => Some(format!("**{word}** *(effect)*")),
        Some(ck3_tables::BuiltinKind::TriggerAndEffect) => {
            Some(format!("**{word}** *(trigger / effect)*"))
        }
        _ => None,
    }
}

fn index_doc(index: &DocumentIndex, word: &str) -> Option<String> {
    if looks_like_event_id(word) {
        let entries = index.lookup(SymbolCategory::Events, word);
        let entry = entries.first()?;
        let mut text = format!("**{word}** *(event)*");
        if let Some(title) = entry.attribute("title") {
            text.push_str(&format!("\n\ntitle: `{title}`"));
        }
        if let Some(desc) = entry.attribute("desc") {
            text.push_str(&format!("\n\ndesc: `{desc}`"));
        }
        return Some(text);
    }
    for (category, label) in [
        (SymbolCategory::ScriptedEffects, "scripted effect"),
        (SymbolCategory::ScriptedTriggers, "scripted trigger"),
        (SymbolCategory::ScriptValues, "script value"),
        (SymbolCategory::OnActions, "on-action"),
        (SymbolCategory::Localization, "localization key"),
    ] {
        let entries = index.lookup(category, word);
        if let Some(entry) = entries.first() {
            let mut text = format!("**{word}** *({label})*");
            if let Some(preview) = entry.attribute("text") {
                text.push_str(&format!("\n\n\"{preview}\""));
            }
            return Some(text);
        }
    }
    None
}

fn scope_annotation(snapshot: &DocSnapshot, position: Position, word: &str) -> Option<String> {
    let ast = &snapshot.parse.ast;
    let node = ast.node_at_position(position)?;
    let scope = ast.node(node).scope_type;

    // Link keys show their navigation.
    let from = ast
        .node(node)
        .parent
        .map(|p| ast.node(p).scope_type)
        .unwrap_or(ScopeType::Unknown);
    if let Some(target) = links::resolve_link(from, word) {
        if !matches!(from, ScopeType::Unknown | ScopeType::Any) {
            return Some(format!("**{word}** *(scope link)*\n\n{from} → {target}"));
        }
    }
    if scope == ScopeType::None {
        return None;
    }
    Some(format!("scope: `{scope}`"))
}

/// Range of the hovered word (exposed for document-highlight reuse).
pub fn word_range_at(snapshot: &DocSnapshot, position: Position) -> Option<(String, Range)> {
    let line = snapshot.line_text(position.line)?;
    word_at(line, position.line, position.character)
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

    fn hover_text(text: &str, position: Position) -> Option<String> {
        let snap = snapshot(text);
        hover(&snap, &DocumentIndex::new(), &SchemaSet::load_bundled(), position)
            .and_then(|v| v["contents"]["value"].as_str().map(str::to_string))
    }

    #[test]
    fn schema_field_doc_wins() {
        // Cursor on `type` inside an event.
        let text = "m.0001 = { type = character_event }";
        let hover = hover_text(text, Position::new(0, 12)).unwrap();
        assert!(hover.contains("Kind of event window"));
        assert!(hover.contains("character_event"));
    }

    #[test]
    fn builtin_trigger_doc() {
        let text = "m.0001 = { trigger = { has_trait = brave } }";
        let hover = hover_text(text, Position::new(0, 24)).unwrap();
        assert!(hover.contains("(trigger)"));
        assert!(hover.contains("named trait"));
    }

    #[test]
    fn event_hover_reads_the_index() {
        let snap = snapshot("m.0001 = { title = m.0001.t }\ny = { trigger_event = m.0001 }");
        let index = DocumentIndex::new();
        index.replace(
            &snap.uri,
            ck3_index::extract_contributions(&snap.parse.ast, ck3_index::FileKind::Events),
        );
        let hover =
            hover(&snap, &index, &SchemaSet::load_bundled(), Position::new(1, 24)).unwrap();
        let text = hover["contents"]["value"].as_str().unwrap();
        assert!(text.contains("(event)"));
        assert!(text.contains("m.0001.t"));
    }

    #[test]
    fn scope_link_annotation_falls_through() {
        let text = "m.0001 = { immediate = { liege = { add_gold = 5 } } }";
        let hover = hover_text(text, Position::new(0, 26)).unwrap();
        assert!(hover.contains("character → character"));
    }

    #[test]
    fn nothing_resolves_to_null() {
        assert!(hover_text("m.0001 = { }", Position::new(0, 9)).is_none());
    }
}
