//! Formatter.
//!
//! Canonical style: tabs for indentation, a single space around operators,
//! opening brace on the key's line, one statement per line, scalar-only
//! lists kept inline, and a blank line after each top-level block. Comments
//! survive formatting: full-line comments keep their own line at the current
//! indent, trailing comments stay attached to their statement.
//!
//! The formatter is idempotent, and reparsing its output yields a tree whose
//! canonical form equals the input's.

use ck3_lexer::{Lexer, Token, TokenKind};
use serde_json::{Value, json};

/// Format a whole document.
pub fn format_document(text: &str) -> String {
    let tokens: Vec<Token> =
        Lexer::tokenize(text).into_iter().filter(|t| t.kind != TokenKind::Whitespace).collect();

    let mut printer = Printer::default();
    let mut i = 0usize;
    while i < tokens.len() {
        let token = &tokens[i];
        match token.kind {
            TokenKind::Eof => break,
            TokenKind::Comment => {
                let inline = i > 0
                    && tokens[i - 1].kind != TokenKind::Comment
                    && tokens[i - 1].range.end.line == token.range.start.line
                    && !printer.current.is_empty();
                printer.comment(&token.text, inline);
            }
            TokenKind::Identifier | TokenKind::Number | TokenKind::String => {
                printer.scalar(&render_scalar(token));
            }
            TokenKind::Operator => printer.operator(&token.text),
            TokenKind::LeftBrace => {
                if let Some(scalars) = inline_list(&tokens, i) {
                    printer.inline_list(&scalars);
                    i += scalars.len() + 2;
                    continue;
                }
                printer.open_brace();
            }
            TokenKind::RightBrace => printer.close_brace(),
            TokenKind::Error => printer.raw(&token.text),
            TokenKind::Whitespace => {}
        }
        i += 1;
    }
    printer.finish()
}

/// The single whole-document edit for a formatting request, or `None` when
/// the document is already formatted.
pub fn formatting_edits(text: &str) -> Option<Vec<Value>> {
    let formatted = format_document(text);
    if formatted == text {
        return None;
    }
    let end_line = text.lines().count() as u32 + 1;
    Some(vec![json!({
        "range": {
            "start": { "line": 0, "character": 0 },
            "end": { "line": end_line, "character": 0 }
        },
        "newText": formatted,
    })])
}

/// Scalar-only block contents starting at the `{` at `open`, if the block
/// qualifies for inline printing.
fn inline_list(tokens: &[Token], open: usize) -> Option<Vec<String>> {
    let mut scalars = Vec::new();
    for token in &tokens[open + 1..] {
        match token.kind {
            TokenKind::Identifier | TokenKind::Number | TokenKind::String => {
                scalars.push(render_scalar(token));
            }
            TokenKind::RightBrace => return Some(scalars),
            _ => return None,
        }
    }
    None
}

fn render_scalar(token: &Token) -> String {
    if token.kind == TokenKind::String {
        format!("\"{}\"", token.text.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        token.text.clone()
    }
}

#[derive(Default)]
struct Printer {
    lines: Vec<String>,
    current: String,
    depth: usize,
    after_operator: bool,
    /// Set when a top-level `}` was just emitted; the next top-level
    /// statement gets a separating blank line.
    blank_before_next_top: bool,
}

impl Printer {
    fn indent(&self) -> String {
        "\t".repeat(self.depth)
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(std::mem::take(&mut self.current));
        }
        self.after_operator = false;
    }

    fn begin_statement(&mut self) {
        self.flush();
        if self.depth == 0 && self.blank_before_next_top && !self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.blank_before_next_top = false;
        self.current = self.indent();
    }

    fn scalar(&mut self, text: &str) {
        if self.after_operator {
            self.current.push_str(text);
            self.after_operator = false;
        } else {
            self.begin_statement();
            self.current.push_str(text);
        }
    }

    fn operator(&mut self, op: &str) {
        if self.current.is_empty() {
            // Recovery case: operator with no key.
            self.current = self.indent();
        }
        self.current.push(' ');
        self.current.push_str(op);
        self.current.push(' ');
        self.after_operator = true;
    }

    fn open_brace(&mut self) {
        if self.after_operator {
            self.current.push('{');
        } else {
            self.begin_statement();
            self.current.push('{');
        }
        self.flush();
        self.depth += 1;
    }

    fn close_brace(&mut self) {
        self.flush();
        self.depth = self.depth.saturating_sub(1);
        self.lines.push(format!("{}{}", self.indent(), '}'));
        if self.depth == 0 {
            self.blank_before_next_top = true;
        }
    }

    fn inline_list(&mut self, scalars: &[String]) {
        let body = if scalars.is_empty() {
            "{}".to_string()
        } else {
            format!("{{ {} }}", scalars.join(" "))
        };
        if self.after_operator {
            self.current.push_str(&body);
            self.after_operator = false;
        } else {
            self.begin_statement();
            self.current.push_str(&body);
        }
        self.flush();
    }

    fn comment(&mut self, text: &str, inline: bool) {
        if inline {
            self.current.push(' ');
            self.current.push_str(text);
            self.flush();
        } else {
            self.flush();
            self.lines.push(format!("{}{}", self.indent(), text));
        }
    }

    fn raw(&mut self, text: &str) {
        self.begin_statement();
        self.current.push_str(text.trim_end());
        self.flush();
    }

    fn finish(mut self) -> String {
        self.flush();
        while self.lines.last().is_some_and(|l| l.is_empty()) {
            self.lines.pop();
        }
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn canonical_layout() {
        let input = "m.0001={type=character_event\ntrigger={is_adult=yes}\noption={name=m.0001.a add_gold=5}}";
        let expected = "m.0001 = {\n\ttype = character_event\n\ttrigger = {\n\t\tis_adult = yes\n\t}\n\toption = {\n\t\tname = m.0001.a\n\t\tadd_gold = 5\n\t}\n}\n";
        assert_eq!(format_document(input), expected);
    }

    #[test]
    fn formatting_is_idempotent() {
        let input = "a = {  b   = yes\n c = { 1 2   3 }\n}\nd = no\n";
        let once = format_document(input);
        let twice = format_document(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn round_trip_preserves_the_tree() {
        let input = "m.0001 = { trigger = { gold >= 100 } option = { name = a } }\nx = { 1 2 3 }";
        let formatted = format_document(input);
        let before = ck3_parser::parse(input).ast.to_canonical_string();
        let after = ck3_parser::parse(&formatted).ast.to_canonical_string();
        assert_eq!(before, after);
    }

    #[test]
    fn scalar_lists_stay_inline() {
        let formatted = format_document("color = {\n 0.6   0.2 0.2\n}");
        assert_eq!(formatted, "color = { 0.6 0.2 0.2 }\n");
    }

    #[test]
    fn comments_survive() {
        let input = "# header\na = yes # trailing\n# standalone\nb = no";
        let formatted = format_document(input);
        assert_eq!(formatted, "# header\na = yes # trailing\n# standalone\nb = no\n");
    }

    #[test]
    fn blank_line_between_top_level_blocks() {
        let formatted = format_document("a = { x = 1 }\nb = { y = 2 }");
        assert_eq!(formatted, "a = {\n\tx = 1\n}\n\nb = {\n\ty = 2\n}\n");
    }

    #[test]
    fn strings_are_requoted() {
        let formatted = format_document(r#"desc = "he said \"hi\"""#);
        assert_eq!(formatted, "desc = \"he said \\\"hi\\\"\"\n");
    }

    #[test]
    fn already_formatted_yields_no_edits() {
        let text = "a = {\n\tb = yes\n}\n";
        assert!(formatting_edits(text).is_none());
        assert!(formatting_edits("a={b=yes}").is_some());
    }

    #[test]
    fn comparison_operators_keep_single_spaces() {
        let formatted = format_document("t = { gold>=100 age<16 }");
        assert_eq!(formatted, "t = {\n\tgold >= 100\n\tage < 16\n}\n");
    }
}
