//! URI handling and small text utilities shared by the feature providers.

use ck3_ast::{Position, Range, utf16_len};
use std::path::{Path, PathBuf};
use url::Url;

/// Filesystem path for a `file://` URI, `None` for other schemes.
pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    Url::parse(uri).ok().filter(|u| u.scheme() == "file").and_then(|u| u.to_file_path().ok())
}

/// `file://` URI for a filesystem path.
pub fn path_to_uri(path: &Path) -> Option<String> {
    Url::from_file_path(path).ok().map(|u| u.to_string())
}

/// Path string used for schema/file-kind matching: the URI's decoded path
/// when it parses, the raw string otherwise.
pub fn match_path(uri: &str) -> String {
    uri_to_path(uri).map(|p| p.to_string_lossy().into_owned()).unwrap_or_else(|| uri.to_string())
}

/// Whether `ch` can appear inside a script identifier.
pub fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | ':' | '$' | '@')
}

/// The identifier-like token covering `position` on `line`, with its range.
///
/// Columns are UTF-16; the scan walks the line once accumulating both UTF-16
/// offsets and byte offsets so wide characters stay aligned.
pub fn word_at(line_text: &str, line: u32, character: u32) -> Option<(String, Range)> {
    // Build (utf16_start, char) pairs for the line.
    let mut cells: Vec<(u32, char)> = Vec::with_capacity(line_text.len());
    let mut utf16 = 0u32;
    for ch in line_text.chars() {
        cells.push((utf16, ch));
        utf16 += ch.len_utf16() as u32;
    }

    // Find the cell at (or just before) the cursor.
    let mut cursor = None;
    for (i, (start, ch)) in cells.iter().enumerate() {
        if *start <= character && character < *start + ch.len_utf16() as u32 {
            cursor = Some(i);
            break;
        }
    }
    // A cursor at end-of-word sits one past the last char.
    let mut at = match cursor {
        Some(i) => i,
        None if character >= utf16 && !cells.is_empty() => cells.len() - 1,
        None => return None,
    };
    if !is_word_char(cells[at].1) {
        if at == 0 || !is_word_char(cells[at - 1].1) {
            return None;
        }
        at -= 1;
    }

    let mut begin = at;
    while begin > 0 && is_word_char(cells[begin - 1].1) {
        begin -= 1;
    }
    let mut end = at;
    while end + 1 < cells.len() && is_word_char(cells[end + 1].1) {
        end += 1;
    }

    let word: String = cells[begin..=end].iter().map(|(_, c)| *c).collect();
    let start_col = cells[begin].0;
    let end_col = cells[end].0 + cells[end].1.len_utf16() as u32;
    Some((word, Range::on_line(line, start_col, end_col)))
}

/// Text of the line strictly before `character`, for completion context.
pub fn line_prefix(line_text: &str, character: u32) -> String {
    let mut utf16 = 0u32;
    let mut out = String::new();
    for ch in line_text.chars() {
        if utf16 >= character {
            break;
        }
        out.push(ch);
        utf16 += ch.len_utf16() as u32;
    }
    out
}

/// Occurrences of `word` as a whole token in `text`, as single-line ranges.
pub fn whole_token_occurrences(text: &str, word: &str) -> Vec<Range> {
    let mut out = Vec::new();
    if word.is_empty() {
        return out;
    }
    for (line_number, line) in text.lines().enumerate() {
        let mut search_from = 0usize;
        while let Some(found) = line[search_from..].find(word) {
            let begin = search_from + found;
            let end = begin + word.len();
            let before_ok =
                begin == 0 || !line[..begin].chars().next_back().is_some_and(is_word_char);
            let after_ok = end >= line.len() || !line[end..].chars().next().is_some_and(is_word_char);
            if before_ok && after_ok {
                let col = utf16_len(&line[..begin]);
                out.push(Range::on_line(line_number as u32, col, col + utf16_len(word)));
            }
            search_from = end;
        }
    }
    out
}

/// Parse an LSP wire position out of request params.
pub fn position_from_params(params: &serde_json::Value) -> Option<Position> {
    let position = params.get("position")?;
    Some(Position::new(
        position.get("line")?.as_u64()? as u32,
        position.get("character")?.as_u64()? as u32,
    ))
}

/// The `textDocument.uri` out of request params.
pub fn uri_from_params(params: &serde_json::Value) -> Option<String> {
    params.get("textDocument")?.get("uri")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn word_at_middle_and_edges() {
        let line = "trigger_event = my_mod.0001";
        let (word, range) = word_at(line, 0, 3).unwrap();
        assert_eq!(word, "trigger_event");
        assert_eq!(range, Range::on_line(0, 0, 13));

        let (word, _) = word_at(line, 0, 20).unwrap();
        assert_eq!(word, "my_mod.0001");

        // Cursor just past the last character still hits the word.
        let (word, _) = word_at(line, 0, 27).unwrap();
        assert_eq!(word, "my_mod.0001");
    }

    #[test]
    fn word_at_rejects_gaps() {
        assert!(word_at("a  = b", 0, 2).is_none());
    }

    #[test]
    fn whole_token_matching_is_boundary_aware() {
        let text = "x = my_mod.0001\nmy_mod.00011 = no\ntrigger_event = my_mod.0001";
        let hits = whole_token_occurrences(text, "my_mod.0001");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].start.line, 0);
        assert_eq!(hits[1].start.line, 2);
    }

    #[test]
    fn line_prefix_respects_utf16() {
        assert_eq!(line_prefix("ab = cd", 4), "ab =");
        assert_eq!(line_prefix("\u{1F600}x", 2), "\u{1F600}");
    }
}
