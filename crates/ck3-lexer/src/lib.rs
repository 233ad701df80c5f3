//! Hand-written tokenizer for CK3 script.
//!
//! Consumes UTF-8 text and produces tokens with 0-based line numbers and
//! UTF-16 code-unit columns, the encoding the LSP wire format negotiates.
//! Whitespace and comments are emitted as trivia tokens so the formatter can
//! reconstruct layout; the parser skips them.
//!
//! Lexing never fails: unrecognized input becomes an [`TokenKind::Error`]
//! token spanning to the next recovery boundary (a `{` or a newline) and
//! scanning continues.

#![deny(unsafe_code)]

mod token;

pub use token::{Token, TokenKind};

use ck3_ast::{Position, Range};

/// Streaming tokenizer over a source string.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: u32,
    column: u32,
    eof_emitted: bool,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over `source`. A UTF-8 BOM is tolerated and skipped.
    pub fn new(source: &'a str) -> Self {
        let source = source.strip_prefix('\u{FEFF}').unwrap_or(source);
        Self { chars: source.chars().peekable(), line: 0, column: 0, eof_emitted: false }
    }

    /// Lex the entire input. The final token is always [`TokenKind::Eof`].
    pub fn tokenize(source: &'a str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        while let Some(token) = lexer.next_token() {
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    #[inline]
    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    /// Consume one char, updating line/column bookkeeping.
    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += ch.len_utf16() as u32;
        }
        Some(ch)
    }

    #[inline]
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Produce the next token, or `None` once Eof has been emitted.
    pub fn next_token(&mut self) -> Option<Token> {
        if self.eof_emitted {
            return None;
        }
        let start = self.position();

        let Some(ch) = self.peek() else {
            self.eof_emitted = true;
            return Some(Token::new(TokenKind::Eof, "", Range::new(start, start)));
        };

        let token = match ch {
            c if c == ' ' || c == '\t' || c == '\r' || c == '\n' => self.lex_whitespace(start),
            '#' => self.lex_comment(start),
            '"' => self.lex_string(start),
            '{' => self.lex_single(TokenKind::LeftBrace, start),
            '}' => self.lex_single(TokenKind::RightBrace, start),
            '=' | '>' | '<' | '!' => self.lex_operator(start),
            '-' => self.lex_number_or_error(start),
            c if c.is_ascii_digit() => self.lex_number(start),
            c if c.is_ascii_alphabetic() || c == '_' || c == '$' || c == '@' => {
                self.lex_identifier(start)
            }
            _ => self.lex_error(start),
        };
        Some(token)
    }

    fn lex_whitespace(&mut self, start: Position) -> Token {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == ' ' || c == '\t' || c == '\r' || c == '\n' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Token::new(TokenKind::Whitespace, text, Range::new(start, self.position()))
    }

    fn lex_comment(&mut self, start: Position) -> Token {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            text.push(c);
            self.bump();
        }
        Token::new(TokenKind::Comment, text, Range::new(start, self.position()))
    }

    fn lex_string(&mut self, start: Position) -> Token {
        self.bump(); // opening quote
        let mut text = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    // Unterminated string: error token, recover at the newline.
                    return Token::new(TokenKind::Error, text, Range::new(start, self.position()));
                }
                Some('"') => {
                    self.bump();
                    return Token::new(TokenKind::String, text, Range::new(start, self.position()));
                }
                Some('\\') => {
                    self.bump();
                    match self.peek() {
                        Some('\\') => {
                            text.push('\\');
                            self.bump();
                        }
                        Some('"') => {
                            text.push('"');
                            self.bump();
                        }
                        // Unknown escape: keep the backslash literally.
                        _ => text.push('\\'),
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                }
            }
        }
    }

    fn lex_single(&mut self, kind: TokenKind, start: Position) -> Token {
        let c = self.bump().unwrap_or_default();
        Token::new(kind, c.to_string(), Range::new(start, self.position()))
    }

    fn lex_operator(&mut self, start: Position) -> Token {
        let first = self.bump().unwrap_or_default();
        let mut text = first.to_string();
        // Two-char forms: == != >= <=
        if self.peek() == Some('=') && matches!(first, '=' | '!' | '>' | '<') {
            text.push('=');
            self.bump();
        } else if first == '!' {
            // `!` without `=` is not an operator.
            return self.extend_error(text, start);
        }
        Token::new(TokenKind::Operator, text, Range::new(start, self.position()))
    }

    fn lex_number_or_error(&mut self, start: Position) -> Token {
        self.bump(); // the minus sign
        if self.peek().is_some_and(|c| c.is_ascii_digit()) {
            let mut token = self.lex_number_body(start, String::from("-"));
            token.range = Range::new(start, token.range.end);
            token
        } else {
            self.extend_error(String::from("-"), start)
        }
    }

    fn lex_number(&mut self, start: Position) -> Token {
        self.lex_number_body(start, String::new())
    }

    fn lex_number_body(&mut self, start: Position, mut text: String) -> Token {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') {
            // Only a fraction if a digit follows; `1.foo` stays an error.
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if lookahead.peek().is_some_and(|c| c.is_ascii_digit()) {
                text.push('.');
                self.bump();
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
            }
        }
        Token::new(TokenKind::Number, text, Range::new(start, self.position()))
    }

    fn lex_identifier(&mut self, start: Position) -> Token {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '$' | '@') {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Token::new(TokenKind::Identifier, text, Range::new(start, self.position()))
    }

    fn lex_error(&mut self, start: Position) -> Token {
        self.extend_error(String::new(), start)
    }

    /// Consume up to the recovery boundary: the next `{` or newline.
    fn extend_error(&mut self, mut text: String, start: Position) -> Token {
        if text.is_empty() {
            if let Some(c) = self.bump() {
                text.push(c);
            }
        }
        while let Some(c) = self.peek() {
            if c == '{' || c == '\n' {
                break;
            }
            text.push(c);
            self.bump();
        }
        Token::new(TokenKind::Error, text, Range::new(start, self.position()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    fn non_trivia(source: &str) -> Vec<Token> {
        Lexer::tokenize(source).into_iter().filter(|t| !t.is_trivia()).collect()
    }

    #[test]
    fn empty_input_is_just_eof() {
        let tokens = Lexer::tokenize("");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
    }

    #[test]
    fn lexes_simple_assignment() {
        let tokens = non_trivia("gold = 100");
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![TokenKind::Identifier, TokenKind::Operator, TokenKind::Number, TokenKind::Eof]
        );
        assert_eq!(tokens[0].text, "gold");
        assert_eq!(tokens[2].text, "100");
    }

    #[test]
    fn identifiers_admit_dots_and_colons() {
        let tokens = non_trivia("my_mod.0001 scope:target ns.x");
        assert_eq!(tokens[0].text, "my_mod.0001");
        assert_eq!(tokens[1].text, "scope:target");
        assert_eq!(tokens[2].text, "ns.x");
        assert!(tokens[..3].iter().all(|t| t.kind == TokenKind::Identifier));
    }

    #[test]
    fn two_char_operators_win_over_single() {
        let tokens = non_trivia("a >= b <= c != d == e");
        let ops: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Operator)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(ops, vec![">=", "<=", "!=", "=="]);
    }

    #[test]
    fn negative_and_decimal_numbers() {
        let tokens = non_trivia("x = -5 y = 2.75");
        assert_eq!(tokens[2].kind, TokenKind::Number);
        assert_eq!(tokens[2].text, "-5");
        assert_eq!(tokens[5].kind, TokenKind::Number);
        assert_eq!(tokens[5].text, "2.75");
    }

    #[test]
    fn comment_runs_to_end_of_line() {
        let tokens = Lexer::tokenize("# a comment\nkey = yes");
        assert_eq!(tokens[0].kind, TokenKind::Comment);
        assert_eq!(tokens[0].text, "# a comment");
        assert_eq!(tokens[1].kind, TokenKind::Whitespace);
    }

    #[test]
    fn string_escapes() {
        let tokens = non_trivia(r#"desc = "he said \"hi\" \\ twice""#);
        assert_eq!(tokens[2].kind, TokenKind::String);
        assert_eq!(tokens[2].text, r#"he said "hi" \ twice"#);
    }

    #[test]
    fn unterminated_string_recovers_at_newline() {
        let tokens = Lexer::tokenize("a = \"oops\nb = yes");
        let error = tokens.iter().find(|t| t.kind == TokenKind::Error);
        assert!(error.is_some());
        // Lexing continues on the next line.
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Identifier && t.text == "b"));
    }

    #[test]
    fn parameter_markers_lex_as_identifiers() {
        let tokens = non_trivia("add_gold = $AMOUNT$ cost = @war_cost");
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
        assert_eq!(tokens[2].text, "$AMOUNT$");
        assert_eq!(tokens[5].text, "@war_cost");
    }

    #[test]
    fn stray_bytes_recover_at_brace_or_newline() {
        let tokens = non_trivia("%junk% { a = b }");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[1].kind, TokenKind::LeftBrace);
    }

    #[test]
    fn positions_are_utf16_columns() {
        // The emoji is two UTF-16 units, so the identifier after it starts at 5.
        let tokens = Lexer::tokenize("\"\u{1F600}\" x");
        let x = tokens.iter().find(|t| t.text == "x").cloned();
        assert_eq!(x.map(|t| t.range.start), Some(Position::new(0, 5)));
    }

    #[test]
    fn line_tracking_across_newlines() {
        let tokens = Lexer::tokenize("a = yes\nb = no");
        let b = tokens.iter().find(|t| t.text == "b").cloned();
        assert_eq!(b.map(|t| (t.line(), t.column())), Some((1, 0)));
    }

    #[test]
    fn bom_is_skipped() {
        assert_eq!(
            kinds("\u{FEFF}key = value"),
            vec![
                TokenKind::Identifier,
                TokenKind::Whitespace,
                TokenKind::Operator,
                TokenKind::Whitespace,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
    }
}
