//! Semantic tokens provider (full document, delta-encoded).
//!
//! Classification is lexer-driven with AST and index refinement: keywords,
//! built-in trigger/effect names, event ids, saved-scope references, scope
//! links, enum-ish literals, strings, numbers, comments, namespaces.

use crate::features::DocSnapshot;
use ck3_index::{DocumentIndex, SymbolCategory};
use ck3_lexer::{Lexer, TokenKind};
use ck3_lsp_protocol::semantic_token_index;
use ck3_parser::annotate::looks_like_event_id;

/// Modifier bit for declarations (legend index 0).
const MOD_DECLARATION: u32 = 1;

/// One classified token before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RawToken {
    line: u32,
    start: u32,
    length: u32,
    token_type: u32,
    modifiers: u32,
}

/// Produce the delta-encoded `data` array for `textDocument/semanticTokens/full`.
pub fn semantic_tokens(snapshot: &DocSnapshot, index: &DocumentIndex) -> Vec<u32> {
    let mut raw = Vec::new();

    for token in Lexer::tokenize(&snapshot.text) {
        let classification = match token.kind {
            TokenKind::Comment => Some(("comment", 0)),
            TokenKind::String => Some(("string", 0)),
            TokenKind::Number => Some(("number", 0)),
            TokenKind::Identifier => classify_identifier(&token.text, snapshot, index),
            _ => None,
        };
        let Some((type_name, modifiers)) = classification else { continue };
        let Some(token_type) = semantic_token_index(type_name) else { continue };
        // Multi-line tokens cannot be encoded; clamp to the first line.
        let length = if token.range.end.line == token.range.start.line {
            token.range.end.character - token.range.start.character
        } else {
            ck3_ast::utf16_len(&token.text)
        };
        raw.push(RawToken {
            line: token.range.start.line,
            start: token.range.start.character,
            length,
            token_type,
            modifiers,
        });
    }

    encode(raw)
}

fn classify_identifier(
    text: &str,
    snapshot: &DocSnapshot,
    index: &DocumentIndex,
) -> Option<(&'static str, u32)> {
    if text == "namespace" {
        return Some(("keyword", 0));
    }
    if looks_like_event_id(text) {
        let declared = index
            .lookup(SymbolCategory::Events, text)
            .iter()
            .any(|e| e.uri == snapshot.uri);
        return Some(("event", if declared { MOD_DECLARATION } else { 0 }));
    }
    if text.starts_with("scope:") {
        return Some(("macro", 0));
    }
    if text.starts_with("var:") || text.starts_with("local_var:") || text.starts_with("global_var:")
    {
        return Some(("variable", 0));
    }
    if ck3_tables::is_keyword(text) {
        return Some(("keyword", 0));
    }
    if ck3_tables::BOOLEANS.contains(text) {
        return Some(("enumMember", 0));
    }
    if ck3_tables::is_trigger(text) || ck3_tables::is_effect(text) {
        return Some(("function", 0));
    }
    if !index.lookup(SymbolCategory::ScriptedEffects, text).is_empty()
        || !index.lookup(SymbolCategory::ScriptedTriggers, text).is_empty()
    {
        return Some(("function", 0));
    }
    if !index.lookup(SymbolCategory::ScriptValues, text).is_empty() {
        return Some(("variable", 0));
    }
    // Chains and plain links read as property accesses.
    if text.contains('.') {
        return Some(("property", 0));
    }
    None
}

/// Delta-encode per the LSP spec: each token is five integers
/// `(lineΔ, startΔ, length, type, modifiers)`.
fn encode(mut raw: Vec<RawToken>) -> Vec<u32> {
    raw.sort_by_key(|t| (t.line, t.start));
    let mut data = Vec::with_capacity(raw.len() * 5);
    let mut prev_line = 0u32;
    let mut prev_start = 0u32;
    for token in raw {
        let delta_line = token.line - prev_line;
        let delta_start =
            if delta_line == 0 { token.start - prev_start } else { token.start };
        data.extend_from_slice(&[
            delta_line,
            delta_start,
            token.length,
            token.token_type,
            token.modifiers,
        ]);
        prev_line = token.line;
        prev_start = token.start;
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
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
    fn empty_document_encodes_empty() {
        assert_eq!(semantic_tokens(&snapshot(""), &DocumentIndex::new()), Vec::<u32>::new());
    }

    #[test]
    fn encoding_is_monotonic_and_delta() {
        let text = "# header\nnamespace = my_mod\nmy_mod.0001 = { add_gold = 10 }";
        let data = semantic_tokens(&snapshot(text), &DocumentIndex::new());
        assert_eq!(data.len() % 5, 0);

        // Decode and verify monotonic (line, start).
        let mut line = 0u32;
        let mut start = 0u32;
        let mut positions = Vec::new();
        for chunk in data.chunks(5) {
            if chunk[0] > 0 {
                line += chunk[0];
                start = chunk[1];
            } else {
                start += chunk[1];
            }
            positions.push((line, start));
        }
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn classifications_cover_the_legend_families() {
        let text = "namespace = m\nm.0001 = { trigger = { has_trait = brave } desc = \"hi\" scope:foo = { } }";
        let snap = snapshot(text);
        let data = semantic_tokens(&snap, &DocumentIndex::new());
        let types: Vec<u32> = data.chunks(5).map(|c| c[3]).collect();
        let keyword = semantic_token_index("keyword").unwrap_or_default();
        let function = semantic_token_index("function").unwrap_or_default();
        let event = semantic_token_index("event").unwrap_or_default();
        let string = semantic_token_index("string").unwrap_or_default();
        let macro_kind = semantic_token_index("macro").unwrap_or_default();
        assert!(types.contains(&keyword));
        assert!(types.contains(&function));
        assert!(types.contains(&event));
        assert!(types.contains(&string));
        assert!(types.contains(&macro_kind));
    }

    #[test]
    fn declared_events_carry_the_declaration_modifier() {
        let text = "m.0001 = { }";
        let snap = snapshot(text);
        let index = DocumentIndex::new();
        index.replace(
            &snap.uri,
            ck3_index::extract_contributions(&snap.parse.ast, ck3_index::FileKind::Events),
        );
        let data = semantic_tokens(&snap, &index);
        let first = data.chunks(5).next().map(|c| (c[3], c[4]));
        let event = semantic_token_index("event").unwrap_or_default();
        assert_eq!(first, Some((event, MOD_DECLARATION)));
    }
}
