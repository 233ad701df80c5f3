//! Go-to-definition provider.
//!
//! Resolves event ids, scripted effects/triggers, script values, on-actions,
//! saved scopes, localization keys, character flags, and modifiers through
//! the index. Saved scopes resolve file-locally.

use crate::features::DocSnapshot;
use crate::util::word_at;
use ck3_ast::{Position, Range};
use ck3_index::{DocumentIndex, IndexEntry, SymbolCategory};
use ck3_parser::annotate::looks_like_event_id;
use serde_json::{Value, json};

/// Categories consulted for a bare identifier, in resolution order.
const BARE_CATEGORIES: [SymbolCategory; 9] = [
    SymbolCategory::ScriptedEffects,
    SymbolCategory::ScriptedTriggers,
    SymbolCategory::ScriptValues,
    SymbolCategory::OnActions,
    SymbolCategory::Localization,
    SymbolCategory::CharacterFlags,
    SymbolCategory::Modifiers,
    SymbolCategory::OpinionModifiers,
    SymbolCategory::Traits,
];

/// Resolve the definition(s) for the symbol at `position`.
pub fn definition(
    snapshot: &DocSnapshot,
    index: &DocumentIndex,
    position: Position,
) -> Vec<Value> {
    let Some(line) = snapshot.line_text(position.line) else { return Vec::new() };
    let Some((word, _)) = word_at(line, position.line, position.character) else {
        return Vec::new();
    };

    let entries = resolve(snapshot, index, position, &word);
    entries.into_iter().map(|e| location(&e.uri, e.range)).collect()
}

/// Shared resolution used by definition and (for renameability checks) the
/// rename provider.
pub fn resolve(
    snapshot: &DocSnapshot,
    index: &DocumentIndex,
    position: Position,
    word: &str,
) -> Vec<IndexEntry> {
    if let Some(name) = word.strip_prefix("scope:") {
        let name = name.split('.').next().unwrap_or(name);
        let enclosing = snapshot.top_level_key_at(position);
        return index
            .lookup(SymbolCategory::SavedScopes, name)
            .into_iter()
            .filter(|e| match (&enclosing, e.attribute("event")) {
                (Some(event), Some(owner)) => owner == event && e.uri == snapshot.uri,
                _ => e.uri == snapshot.uri,
            })
            .collect();
    }

    if looks_like_event_id(word) {
        let events = index.lookup(SymbolCategory::Events, word);
        if !events.is_empty() {
            return events;
        }
        // Event ids double as localization key prefixes (`m.0001.t`).
        return index.lookup(SymbolCategory::Localization, word);
    }

    for category in BARE_CATEGORIES {
        let entries = index.lookup(category, word);
        if !entries.is_empty() {
            return entries;
        }
    }
    Vec::new()
}

fn location(uri: &str, range: Range) -> Value {
    json!({ "uri": uri, "range": range })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::Arc;

    fn snapshot(uri: &str, text: &str) -> DocSnapshot {
        DocSnapshot {
            uri: uri.into(),
            path: uri.trim_start_matches("file://").into(),
            kind: ck3_index::FileKind::Events,
            version: 1,
            text: text.to_string(),
            parse: Arc::new(ck3_parser::parse(text)),
        }
    }

    fn seed(index: &DocumentIndex, snap: &DocSnapshot) {
        index.replace(
            &snap.uri,
            ck3_index::extract_contributions(&snap.parse.ast, ck3_index::FileKind::Events),
        );
    }

    #[test]
    fn event_reference_resolves_to_definition() {
        let definitions = snapshot(
            "file:///mod/events/a.txt",
            "namespace = m\nm.0001 = { option = { name = x } }",
        );
        let referencing = snapshot(
            "file:///mod/events/b.txt",
            "n.0001 = { immediate = { trigger_event = m.0001 } }",
        );
        let index = DocumentIndex::new();
        seed(&index, &definitions);
        seed(&index, &referencing);

        // Cursor on `m.0001` in the reference.
        let found = definition(&referencing, &index, Position::new(0, 43));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["uri"], "file:///mod/events/a.txt");
    }

    #[test]
    fn saved_scope_resolves_within_the_event() {
        let snap = snapshot(
            "file:///mod/events/a.txt",
            "m.0001 = { immediate = { save_scope_as = victim } option = { name = a scope:victim = { death = natural } } }",
        );
        let index = DocumentIndex::new();
        seed(&index, &snap);
        let found = definition(&snap, &index, Position::new(0, 78));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["range"]["start"]["character"], 41);
    }

    #[test]
    fn unknown_word_yields_nothing() {
        let snap = snapshot("file:///mod/events/a.txt", "m.0001 = { }");
        let found = definition(&snap, &DocumentIndex::new(), Position::new(0, 2));
        assert!(found.is_empty());
    }
}
