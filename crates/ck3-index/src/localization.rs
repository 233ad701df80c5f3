//! Localization key scanner.
//!
//! Locale files are YAML-ish but follow a rigid line shape the game itself
//! relies on: `KEY:N "TEXT"` where N is an optional version integer. A
//! line scanner is deliberately used instead of the script parser - inline
//! `[scope.Function]` calls and `#formatting#!` runs inside TEXT are opaque
//! here.

use crate::{Contribution, SymbolCategory};
use ck3_ast::Range;

/// Maximum preview text stored in the index per key.
const PREVIEW_LIMIT: usize = 80;

/// Scan one locale file for `key:N "text"` lines.
pub fn scan_localization(text: &str) -> Vec<Contribution> {
    let mut out = Vec::new();
    for (line_number, line) in text.lines().enumerate() {
        if let Some((key, column, preview)) = scan_line(line) {
            let width = key.encode_utf16().count() as u32;
            let mut attributes = Vec::new();
            if !preview.is_empty() {
                attributes.push(("text".to_string(), preview));
            }
            out.push(Contribution {
                category: SymbolCategory::Localization,
                name: key,
                range: Range::on_line(line_number as u32, column, column + width),
                attributes,
            });
        }
    }
    out
}

/// Parse one line; returns `(key, utf16 start column, text preview)`.
fn scan_line(line: &str) -> Option<(String, u32, String)> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let indent = &line[..line.len() - trimmed.len()];
    let colon = trimmed.find(':')?;
    let key = &trimmed[..colon];
    if key.is_empty()
        || !key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b == b'-')
    {
        return None;
    }
    let mut rest = &trimmed[colon + 1..];
    // Optional version number.
    let digits = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
    rest = &rest[digits..];
    let rest = rest.trim_start();
    // The language header (`l_english:`) has no quoted payload and is skipped.
    if !rest.starts_with('"') {
        return None;
    }
    let body = &rest[1..];
    let end = body.rfind('"').unwrap_or(body.len());
    let mut preview: String = body[..end].to_string();
    if preview.len() > PREVIEW_LIMIT {
        let mut cut = PREVIEW_LIMIT;
        while !preview.is_char_boundary(cut) {
            cut -= 1;
        }
        preview.truncate(cut);
    }
    let column = indent.encode_utf16().count() as u32;
    Some((key.to_string(), column, preview))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scans_keys_and_skips_header() {
        let text = "l_english:\n my_mod.0001.t:0 \"A Fateful Meeting\"\n my_mod.0001.desc:1 \"Text with [ROOT.Char.GetName] inside\"\n";
        let found = scan_localization(text);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "my_mod.0001.t");
        assert_eq!(found[0].range.start.line, 1);
        assert_eq!(found[0].range.start.character, 1);
        assert_eq!(found[0].attribute("text"), Some("A Fateful Meeting"));
        assert_eq!(found[1].name, "my_mod.0001.desc");
    }

    #[test]
    fn version_number_is_optional() {
        let found = scan_localization(" plain_key: \"no version\"\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "plain_key");
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let found = scan_localization("# header comment\n\n  # indented comment\n");
        assert!(found.is_empty());
    }

    #[test]
    fn unquoted_lines_are_ignored() {
        let found = scan_localization("l_german:\nsome_yaml_key: 5\n");
        assert!(found.is_empty());
    }
}
