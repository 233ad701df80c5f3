//! LSP feature providers.
//!
//! Each provider is a thin adapter: it reads the cached AST, the index, and
//! the schemas, and renders one LSP reply shape. Providers never mutate
//! server state and never block on anything but the locks they read through.

pub mod code_actions;
pub mod code_lens;
pub mod completion;
pub mod definition;
pub mod document_highlight;
pub mod folding;
pub mod formatting;
pub mod hover;
pub mod inlay_hints;
pub mod references;
pub mod rename;
pub mod semantic_tokens;
pub mod symbols;

use ck3_index::FileKind;
use ck3_parser::ParseOutcome;
use std::sync::Arc;

/// Read-only view of one document, taken while holding the documents lock
/// and released before any feature work happens.
#[derive(Clone)]
pub struct DocSnapshot {
    pub uri: String,
    pub path: String,
    pub kind: FileKind,
    pub version: i32,
    pub text: String,
    pub parse: Arc<ParseOutcome>,
}

impl DocSnapshot {
    /// The text of one line, newline stripped.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        self.text.lines().nth(line as usize)
    }

    /// Enclosing top-level block key at `position`, if any (e.g. the event
    /// id for positions inside an event body).
    pub fn top_level_key_at(&self, position: ck3_ast::Position) -> Option<String> {
        let ast = &self.parse.ast;
        let node = ast.node_at_position(position)?;
        let mut current = node;
        for ancestor in std::iter::once(node).chain(ast.ancestors(node)) {
            if ast.node(ancestor).parent == Some(ast.root()) {
                current = ancestor;
                break;
            }
            current = ancestor;
        }
        let node = ast.node(current);
        (node.parent == Some(ast.root())).then(|| node.key.clone())
    }
}
