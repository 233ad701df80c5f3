//! Find-references provider.
//!
//! Whole-token, case-sensitive search across the workspace: open documents
//! are searched in memory, everything else is read from disk under the
//! workspace roots. The index answers "is this a symbol at all"; the text
//! scan finds every occurrence including ones in files the index does not
//! track (e.g. references inside localization values).

use crate::util::{path_to_uri, whole_token_occurrences};
use ck3_ast::Range;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::path::PathBuf;
use walkdir::WalkDir;

/// One reference site.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSite {
    pub uri: String,
    pub range: Range,
}

/// Find every whole-token occurrence of `word`.
///
/// `open_docs` are `(uri, text)` snapshots taken under the documents lock;
/// `roots` are the workspace folders scanned for script and locale files.
pub fn find_references(
    word: &str,
    open_docs: &[(String, String)],
    roots: &[PathBuf],
) -> Vec<ReferenceSite> {
    let mut out = Vec::new();
    let mut seen_uris: HashSet<String> = HashSet::new();

    for (uri, text) in open_docs {
        seen_uris.insert(uri.clone());
        for range in whole_token_occurrences(text, word) {
            out.push(ReferenceSite { uri: uri.clone(), range });
        }
    }

    for root in roots {
        for entry in WalkDir::new(root).follow_links(false).into_iter().flatten() {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relevant = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == "txt" || e == "yml");
            if !relevant {
                continue;
            }
            let Some(uri) = path_to_uri(path) else { continue };
            if seen_uris.contains(&uri) {
                continue;
            }
            let Ok(text) = std::fs::read_to_string(path) else { continue };
            for range in whole_token_occurrences(&text, word) {
                out.push(ReferenceSite { uri: uri.clone(), range });
            }
        }
    }

    out.sort_by(|a, b| {
        (a.uri.as_str(), a.range.start.line, a.range.start.character).cmp(&(
            b.uri.as_str(),
            b.range.start.line,
            b.range.start.character,
        ))
    });
    out
}

/// Render reference sites as LSP Locations.
pub fn to_locations(sites: &[ReferenceSite]) -> Vec<Value> {
    sites.iter().map(|s| json!({ "uri": s.uri, "range": s.range })).collect()
}
