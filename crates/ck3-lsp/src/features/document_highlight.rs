//! Document-highlight provider: token-equal occurrences in the current
//! document.

use crate::features::DocSnapshot;
use crate::util::{whole_token_occurrences, word_at};
use ck3_ast::Position;
use serde_json::{Value, json};

/// Highlight kind: 1 = text.
const KIND_TEXT: u32 = 1;

/// Occurrences of the token under the cursor.
pub fn document_highlights(snapshot: &DocSnapshot, position: Position) -> Vec<Value> {
    let Some(line) = snapshot.line_text(position.line) else { return Vec::new() };
    let Some((word, _)) = word_at(line, position.line, position.character) else {
        return Vec::new();
    };
    whole_token_occurrences(&snapshot.text, &word)
        .into_iter()
        .map(|range| json!({ "range": range, "kind": KIND_TEXT }))
        .collect()
}
