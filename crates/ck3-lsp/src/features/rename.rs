//! Rename provider with prepare support.
//!
//! Rename is symbol-category driven: the position must resolve to an entry
//! the index knows (event, scripted effect/trigger, script value, saved
//! scope, flag, modifier, localization key). The edit touches every
//! whole-token occurrence across the workspace.

use crate::features::DocSnapshot;
use crate::features::definition;
use crate::features::references::{ReferenceSite, find_references};
use crate::util::word_at;
use ck3_ast::{Position, Range};
use ck3_index::DocumentIndex;
use serde_json::{Map, Value, json};
use std::path::PathBuf;

/// `prepareRename`: the renameable range and placeholder, or `None` to
/// reject the position.
pub fn prepare_rename(
    snapshot: &DocSnapshot,
    index: &DocumentIndex,
    position: Position,
) -> Option<Value> {
    let (word, range) = renameable_at(snapshot, index, position)?;
    Some(json!({ "range": range, "placeholder": word }))
}

/// `rename`: a WorkspaceEdit touching every occurrence, or `None` when the
/// position does not resolve to a renameable symbol.
pub fn rename(
    snapshot: &DocSnapshot,
    index: &DocumentIndex,
    open_docs: &[(String, String)],
    roots: &[PathBuf],
    position: Position,
    new_name: &str,
) -> Option<Value> {
    let (word, _) = renameable_at(snapshot, index, position)?;
    if new_name.is_empty() || new_name == word {
        return None;
    }

    let sites = find_references(&word, open_docs, roots);
    if sites.is_empty() {
        return None;
    }
    Some(workspace_edit(&sites, new_name))
}

/// A position is renameable when its token resolves through the index.
fn renameable_at(
    snapshot: &DocSnapshot,
    index: &DocumentIndex,
    position: Position,
) -> Option<(String, Range)> {
    let line = snapshot.line_text(position.line)?;
    let (word, range) = word_at(line, position.line, position.character)?;
    // `scope:foo` renames the saved-scope name, not the prefix.
    let (symbol, range) = match word.strip_prefix("scope:") {
        Some(name) => {
            let name = name.split('.').next().unwrap_or(name).to_string();
            let start = ck3_ast::Position::new(
                range.start.line,
                range.start.character + "scope:".len() as u32,
            );
            let end = ck3_ast::Position::new(
                start.line,
                start.character + ck3_ast::utf16_len(&name),
            );
            (name, Range::new(start, end))
        }
        None => (word.clone(), range),
    };
    let resolved = definition::resolve(snapshot, index, position, &word);
    (!resolved.is_empty()).then_some((symbol, range))
}

fn workspace_edit(sites: &[ReferenceSite], new_name: &str) -> Value {
    let mut changes: Map<String, Value> = Map::new();
    for site in sites {
        let edits = changes
            .entry(site.uri.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(edits) = edits {
            edits.push(json!({ "range": site.range, "newText": new_name }));
        }
    }
    json!({ "changes": changes })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::Arc;

    fn snapshot(uri: &str, text: &str) -> DocSnapshot {
        DocSnapshot {
            uri: uri.into(),
            path: "mod/events/a.txt".into(),
            kind: ck3_index::FileKind::Events,
            version: 1,
            text: text.to_string(),
            parse: Arc::new(ck3_parser::parse(text)),
        }
    }

    #[test]
    fn rename_touches_every_file() {
        let def_text = "namespace = m\nm.0001 = { option = { name = a } }";
        let ref_text = "n.0001 = { immediate = { trigger_event = m.0001 } }";
        let def = snapshot("file:///mod/events/a.txt", def_text);
        let index = DocumentIndex::new();
        index.replace(
            &def.uri,
            ck3_index::extract_contributions(&def.parse.ast, ck3_index::FileKind::Events),
        );

        let open_docs = vec![
            (def.uri.clone(), def_text.to_string()),
            ("file:///mod/events/b.txt".to_string(), ref_text.to_string()),
        ];
        // Cursor on the definition.
        let edit =
            rename(&def, &index, &open_docs, &[], Position::new(1, 2), "m.0100").unwrap();
        let changes = edit["changes"].as_object().unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes["file:///mod/events/a.txt"].as_array().unwrap().len(), 1);
        assert_eq!(changes["file:///mod/events/b.txt"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn unresolvable_positions_reject_rename() {
        let snap = snapshot("file:///mod/events/a.txt", "m.0001 = { unknowable = yes }");
        let rejected = prepare_rename(&snap, &DocumentIndex::new(), Position::new(0, 14));
        assert!(rejected.is_none());
    }

    #[test]
    fn prepare_returns_placeholder() {
        let snap = snapshot("file:///mod/events/a.txt", "namespace = m\nm.0001 = { }");
        let index = DocumentIndex::new();
        index.replace(
            &snap.uri,
            ck3_index::extract_contributions(&snap.parse.ast, ck3_index::FileKind::Events),
        );
        let prepared = prepare_rename(&snap, &index, Position::new(1, 3)).unwrap();
        assert_eq!(prepared["placeholder"], "m.0001");
    }
}
