//! Token types for the CK3 script lexer.

use ck3_ast::{Position, Range};

/// Token classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `[A-Za-z_$@][A-Za-z0-9_.:$@]*` - dots and colons are inner characters
    /// so `scope:target` and `my_mod.0001` lex as single identifiers; `$`
    /// admits `$PARAM$` substitution markers and `@` script-value references.
    Identifier,
    /// Signed decimal: `-?[0-9]+(.[0-9]+)?`.
    Number,
    /// Double-quoted string; `text` holds the unescaped contents.
    String,
    /// One of `= > < >= <= != ==`.
    Operator,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `#` to end of line, hash included.
    Comment,
    /// A run of spaces, tabs, carriage returns, and newlines.
    Whitespace,
    /// End of input; always the final token.
    Eof,
    /// Unrecognized input; spans to the recovery boundary (next `{` or newline).
    Error,
}

/// One lexed token with its source range.
///
/// `range.start` is the token's line/column; columns count UTF-16 code units.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Token classification.
    pub kind: TokenKind,
    /// Token text (strings are unescaped, quotes stripped).
    pub text: String,
    /// Source range covered by the token, delimiters included.
    pub range: Range,
}

impl Token {
    /// Create a token.
    pub fn new(kind: TokenKind, text: impl Into<String>, range: Range) -> Self {
        Self { kind, text: text.into(), range }
    }

    /// 0-based start line.
    #[inline]
    pub fn line(&self) -> u32 {
        self.range.start.line
    }

    /// 0-based UTF-16 start column.
    #[inline]
    pub fn column(&self) -> u32 {
        self.range.start.character
    }

    /// Start position.
    #[inline]
    pub fn start(&self) -> Position {
        self.range.start
    }

    /// Whether the parser should skip this token (trivia).
    #[inline]
    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace | TokenKind::Comment)
    }
}
