//! Recursive-descent parser for CK3 script.
//!
//! Parsing always yields a forest: syntax problems become diagnostics and
//! recovery resumes at the next plausible boundary, so every other subsystem
//! can rely on getting an AST even for files mid-edit. After tree
//! construction a single walk annotates each node with the scope type its
//! value evaluates in (see [`annotate`]).

#![deny(unsafe_code)]

pub mod annotate;
mod parser;

pub use annotate::annotate_scopes;
pub use parser::Parser;

use ck3_ast::{Range, ScriptAst};

/// Diagnostic code for an unmatched `}` with no open block.
pub const CODE_UNMATCHED_BRACE: &str = "CK3001";
/// Diagnostic code for a `{` still open at end of file.
pub const CODE_UNCLOSED_BRACE: &str = "CK3002";
/// Diagnostic code for any other unexpected token.
pub const CODE_UNEXPECTED_TOKEN: &str = "CK3003";

/// A localized syntax problem; parsing never throws.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Stable diagnostic code (CK3001..CK3003).
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Range the diagnostic attaches to.
    pub range: Range,
}

/// Result of parsing one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    /// The tree, scope-annotated.
    pub ast: ScriptAst,
    /// Syntax diagnostics in source order.
    pub errors: Vec<SyntaxError>,
}

/// Parse `source` and annotate scopes. Deterministic: the canonical form of
/// the returned AST is a pure function of the input text.
pub fn parse(source: &str) -> ParseOutcome {
    let mut outcome = Parser::new(source).parse();
    annotate::annotate_scopes(&mut outcome.ast);
    outcome
}
