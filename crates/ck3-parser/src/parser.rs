//! The recursive-descent parser proper.

use crate::{
    CODE_UNCLOSED_BRACE, CODE_UNEXPECTED_TOKEN, CODE_UNMATCHED_BRACE, ParseOutcome, SyntaxError,
};
use ck3_ast::{
    Node, NodeId, NodeType, NodeValue, Operator, Position, Range, Scalar, ScalarKind, ScriptAst,
};
use ck3_lexer::{Lexer, Token, TokenKind};
use ck3_scope::ScopeType;

/// Token-stream parser producing a [`ScriptAst`].
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<SyntaxError>,
}

impl Parser {
    /// Lex `source` and set up the parser.
    pub fn new(source: &str) -> Self {
        Self { tokens: Lexer::tokenize(source), pos: 0, errors: Vec::new() }
    }

    /// Parse the whole token stream into a forest.
    pub fn parse(mut self) -> ParseOutcome {
        let end = self
            .tokens
            .last()
            .map(|t| t.range.end)
            .unwrap_or_default();
        let mut ast = ScriptAst::new(Range::new(Position::new(0, 0), end));
        let root = ast.root();

        loop {
            self.skip_whitespace();
            let token = self.peek().clone();
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::Comment => {
                    self.push_comment(&mut ast, root, &token);
                    self.advance();
                }
                TokenKind::RightBrace => {
                    self.error(
                        CODE_UNMATCHED_BRACE,
                        "unmatched '}' with no open block",
                        token.range,
                    );
                    self.advance();
                }
                TokenKind::Identifier | TokenKind::Number | TokenKind::String => {
                    self.parse_assignment(&mut ast, root);
                }
                TokenKind::LeftBrace => {
                    self.error(
                        CODE_UNEXPECTED_TOKEN,
                        "unexpected '{' without a key",
                        token.range,
                    );
                    self.advance();
                    self.skip_balanced_block();
                }
                TokenKind::Operator => {
                    self.error(
                        CODE_UNEXPECTED_TOKEN,
                        format!("unexpected '{}' without a key", token.text),
                        token.range,
                    );
                    self.advance();
                }
                TokenKind::Error => {
                    self.error(
                        CODE_UNEXPECTED_TOKEN,
                        format!("unrecognized input '{}'", token.text.trim_end()),
                        token.range,
                    );
                    self.advance();
                }
                TokenKind::Whitespace => unreachable!("whitespace skipped above"),
            }
        }

        ParseOutcome { ast, errors: self.errors }
    }

    // ------------------------------------------------------------------
    // Grammar productions
    // ------------------------------------------------------------------

    /// `assignment := key op value`. The current token is the key candidate.
    fn parse_assignment(&mut self, ast: &mut ScriptAst, parent: NodeId) {
        let key_token = self.peek().clone();
        self.advance();
        self.skip_whitespace();

        let op_token = self.peek().clone();
        if op_token.kind != TokenKind::Operator {
            // A bare scalar at top level is not list syntax; recover on it.
            self.error(
                CODE_UNEXPECTED_TOKEN,
                format!("expected an operator after '{}'", key_token.text),
                key_token.range,
            );
            return;
        }
        let operator = parse_operator(&op_token.text);
        self.advance();
        self.skip_whitespace();

        let value_token = self.peek().clone();
        match value_token.kind {
            TokenKind::LeftBrace => {
                let open_range = value_token.range;
                self.advance();
                let node = ast.push_child(
                    parent,
                    Node {
                        node_type: NodeType::Assignment,
                        key: key_token.text.clone(),
                        key_range: key_token.range,
                        operator: Some(operator),
                        value: NodeValue::Block,
                        range: key_token.range,
                        parent: None,
                        children: Vec::new(),
                        scope_type: ScopeType::Unknown,
                    },
                );
                let closed = self.parse_block_body(ast, node);
                let end = if closed {
                    // parse_block_body consumed the '}'.
                    self.previous_end().unwrap_or(open_range.end)
                } else {
                    self.error(
                        CODE_UNCLOSED_BRACE,
                        "'{' is never closed",
                        open_range,
                    );
                    self.previous_end().unwrap_or(open_range.end)
                };
                ast.node_mut(node).range = Range::new(key_token.range.start, end);
            }
            TokenKind::Identifier | TokenKind::Number | TokenKind::String => {
                self.advance();
                let scalar = to_scalar(&value_token);
                ast.push_child(
                    parent,
                    Node {
                        node_type: NodeType::Assignment,
                        key: key_token.text.clone(),
                        key_range: key_token.range,
                        operator: Some(operator),
                        value: NodeValue::Scalar(scalar),
                        range: Range::new(key_token.range.start, value_token.range.end),
                        parent: None,
                        children: Vec::new(),
                        scope_type: ScopeType::Unknown,
                    },
                );
            }
            _ => {
                self.error(
                    CODE_UNEXPECTED_TOKEN,
                    format!("expected a value after '{} {}'", key_token.text, op_token.text),
                    op_token.range,
                );
                // Keep the keyed node so index extraction still sees it.
                ast.push_child(
                    parent,
                    Node {
                        node_type: NodeType::Assignment,
                        key: key_token.text.clone(),
                        key_range: key_token.range,
                        operator: Some(operator),
                        value: NodeValue::None,
                        range: Range::new(key_token.range.start, op_token.range.end),
                        parent: None,
                        children: Vec::new(),
                        scope_type: ScopeType::Unknown,
                    },
                );
            }
        }
    }

    /// `block := '{' (assignment | scalar)* '}'` - the opening brace is
    /// already consumed. Returns true when the closing brace was found.
    fn parse_block_body(&mut self, ast: &mut ScriptAst, parent: NodeId) -> bool {
        loop {
            self.skip_whitespace();
            let token = self.peek().clone();
            match token.kind {
                TokenKind::RightBrace => {
                    self.advance();
                    return true;
                }
                TokenKind::Eof => return false,
                TokenKind::Comment => {
                    self.push_comment(ast, parent, &token);
                    self.advance();
                }
                TokenKind::Identifier | TokenKind::Number | TokenKind::String => {
                    if self.next_non_trivia_is_operator() {
                        self.parse_assignment(ast, parent);
                    } else {
                        // Bare scalar: list element.
                        self.advance();
                        ast.push_child(
                            parent,
                            Node {
                                node_type: NodeType::ListItem,
                                key: String::new(),
                                key_range: token.range,
                                operator: None,
                                value: NodeValue::Scalar(to_scalar(&token)),
                                range: token.range,
                                parent: None,
                                children: Vec::new(),
                                scope_type: ScopeType::Unknown,
                            },
                        );
                    }
                }
                TokenKind::LeftBrace => {
                    self.error(
                        CODE_UNEXPECTED_TOKEN,
                        "unexpected '{' without a key",
                        token.range,
                    );
                    self.advance();
                    self.skip_balanced_block();
                }
                TokenKind::Operator | TokenKind::Error => {
                    let message = if token.kind == TokenKind::Operator {
                        format!("unexpected '{}' without a key", token.text)
                    } else {
                        format!("unrecognized input '{}'", token.text.trim_end())
                    };
                    self.error(CODE_UNEXPECTED_TOKEN, message, token.range);
                    self.advance();
                    self.skip_to_block_recovery();
                }
                TokenKind::Whitespace => unreachable!("whitespace skipped above"),
            }
        }
    }

    // ------------------------------------------------------------------
    // Token plumbing and recovery
    // ------------------------------------------------------------------

    #[inline]
    fn peek(&self) -> &Token {
        // The token vector always ends with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    #[inline]
    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        } else {
            self.pos = self.tokens.len() - 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().kind == TokenKind::Whitespace {
            self.advance();
        }
    }

    /// End position of the most recently consumed token.
    fn previous_end(&self) -> Option<Position> {
        self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)).map(|t| t.range.end)
    }

    /// Whether the next non-trivia token after the current one is an operator.
    fn next_non_trivia_is_operator(&self) -> bool {
        self.tokens[self.pos + 1..]
            .iter()
            .find(|t| !t.is_trivia())
            .is_some_and(|t| t.kind == TokenKind::Operator)
    }

    /// After an error inside a block: skip to the next `key op` pair at this
    /// level or the closing `}` (not consumed).
    fn skip_to_block_recovery(&mut self) {
        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Eof | TokenKind::RightBrace => return,
                TokenKind::Identifier | TokenKind::Number | TokenKind::String
                    if self.next_non_trivia_is_operator() =>
                {
                    return;
                }
                TokenKind::LeftBrace => {
                    self.advance();
                    self.skip_balanced_block();
                }
                _ => self.advance(),
            }
        }
    }

    /// Skip tokens until the brace depth opened before the call closes.
    fn skip_balanced_block(&mut self) {
        let mut depth = 1usize;
        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Eof => return,
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    fn push_comment(&mut self, ast: &mut ScriptAst, parent: NodeId, token: &Token) {
        ast.push_child(
            parent,
            Node {
                node_type: NodeType::Comment,
                key: token.text.clone(),
                key_range: token.range,
                operator: None,
                value: NodeValue::None,
                range: token.range,
                parent: None,
                children: Vec::new(),
                scope_type: ScopeType::None,
            },
        );
    }

    fn error(&mut self, code: &'static str, message: impl Into<String>, range: Range) {
        self.errors.push(SyntaxError { code, message: message.into(), range });
    }
}

fn parse_operator(text: &str) -> Operator {
    match text {
        ">" => Operator::Greater,
        "<" => Operator::Less,
        ">=" => Operator::GreaterEq,
        "<=" => Operator::LessEq,
        "!=" => Operator::NotEq,
        "==" => Operator::Eq,
        _ => Operator::Assign,
    }
}

fn to_scalar(token: &Token) -> Scalar {
    let kind = match token.kind {
        TokenKind::Number => ScalarKind::Number,
        TokenKind::String => ScalarKind::String,
        _ => ScalarKind::Identifier,
    };
    Scalar { text: token.text.clone(), kind, range: token.range }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_parses_to_bare_root() {
        let outcome = parse("");
        assert!(outcome.errors.is_empty());
        assert!(outcome.ast.is_empty());
    }

    #[test]
    fn parses_nested_blocks_and_lists() {
        let outcome = parse("a = { b = yes c = { 1 2 3 } }");
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.ast.to_canonical_string(), "(file (a = (b = yes) (c = 1 2 3)))");
    }

    #[test]
    fn comparison_operators_survive() {
        let outcome = parse("trigger = { gold >= 100 age < 16 }");
        assert!(outcome.errors.is_empty());
        assert_eq!(
            outcome.ast.to_canonical_string(),
            "(file (trigger = (gold >= 100) (age < 16)))"
        );
    }

    #[test]
    fn unmatched_close_brace_is_ck3001() {
        let outcome = parse("a = yes\n}\nb = no");
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].code, CODE_UNMATCHED_BRACE);
        assert_eq!(outcome.errors[0].range.start, Position::new(1, 0));
        // Parsing continued past the error.
        assert_eq!(outcome.ast.to_canonical_string(), "(file (a = yes) (b = no))");
    }

    #[test]
    fn unclosed_brace_is_ck3002_at_the_open() {
        let outcome = parse("a = {\n  b = yes\n");
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].code, CODE_UNCLOSED_BRACE);
        assert_eq!(outcome.errors[0].range.start, Position::new(0, 4));
    }

    #[test]
    fn single_unclosed_brace_yields_exactly_one_error() {
        let outcome = parse("namespace = my_mod\nmy_mod.0001 = { type = character_event\n");
        let codes: Vec<_> = outcome.errors.iter().map(|e| e.code).collect();
        assert_eq!(codes, vec![CODE_UNCLOSED_BRACE]);
    }

    #[test]
    fn recovery_keeps_following_assignments() {
        let outcome = parse("a = { = broken\n ok = yes }");
        assert!(outcome.errors.iter().any(|e| e.code == CODE_UNEXPECTED_TOKEN));
        assert!(outcome.ast.to_canonical_string().contains("(ok = yes)"));
    }

    #[test]
    fn parse_is_deterministic() {
        let source = "ns = x\nns.1 = { trigger = { always = yes } option = { name = a } }";
        let a = parse(source).ast.to_canonical_string();
        let b = parse(source).ast.to_canonical_string();
        assert_eq!(a, b);
    }

    #[test]
    fn parent_links_form_a_spine() {
        let outcome = parse("a = { b = { c = yes } }");
        let ast = &outcome.ast;
        for id in ast.walk() {
            for ancestor in ast.ancestors(id) {
                assert!(ast.children(ancestor).len() <= ast.len());
            }
        }
        // Deepest node's ancestor chain reaches the root.
        let deepest = ast
            .walk()
            .find(|&id| ast.node(id).key == "c")
            .map(|id| ast.ancestors(id).last());
        assert_eq!(deepest.flatten(), Some(ast.root()));
    }
}
