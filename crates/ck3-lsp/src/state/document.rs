//! Per-document state.
//!
//! Documents keep both a rope (for O(log n) incremental edits from the
//! client) and a cached `String` (for the parser and the line-based
//! validators). The version counter increases monotonically per change and
//! gates stale-result discard throughout the pipeline.

use ck3_ast::Position;
use ck3_parser::ParseOutcome;
use std::sync::Arc;

/// One open document.
#[derive(Clone)]
pub struct DocumentState {
    /// Rope-backed content, the authoritative copy for edits.
    pub rope: ropey::Rope,
    /// Cached string copy, kept in sync with the rope.
    pub text: String,
    /// LSP document version; monotonically increasing.
    pub version: i32,
    /// Cached parse of the current content, if the pipeline got to it.
    pub parse: Option<Arc<ParseOutcome>>,
    /// md5 hex digest of `text`, the AST-cache key.
    pub content_hash: String,
    /// Last version whose contributions made it into the index.
    pub last_indexed_version: i32,
}

impl DocumentState {
    /// Create from full document content.
    pub fn new(content: &str, version: i32) -> Self {
        Self {
            rope: ropey::Rope::from_str(content),
            text: content.to_string(),
            version,
            parse: None,
            content_hash: content_hash(content),
            last_indexed_version: -1,
        }
    }

    /// Replace the whole content (full-sync change or didOpen on an already
    /// open document).
    pub fn replace_content(&mut self, content: &str, version: i32) {
        self.rope = ropey::Rope::from_str(content);
        self.text = content.to_string();
        self.version = version;
        self.parse = None;
        self.content_hash = content_hash(content);
    }

    /// Apply one incremental change (`range` + new text) and bump caches.
    pub fn apply_change(&mut self, start: Position, end: Position, new_text: &str, version: i32) {
        let start_idx = self.position_to_char(start);
        let end_idx = self.position_to_char(end);
        if start_idx < end_idx && end_idx <= self.rope.len_chars() {
            self.rope.remove(start_idx..end_idx);
        }
        if !new_text.is_empty() && start_idx <= self.rope.len_chars() {
            self.rope.insert(start_idx, new_text);
        }
        self.text = self.rope.to_string();
        self.version = version;
        self.parse = None;
        self.content_hash = content_hash(&self.text);
    }

    /// Line count of the current content.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Convert an LSP position (UTF-16 column) to a rope char index.
    pub fn position_to_char(&self, position: Position) -> usize {
        let line = position.line as usize;
        if line >= self.rope.len_lines() {
            return self.rope.len_chars();
        }
        let line_start = self.rope.line_to_char(line);
        let line_slice = self.rope.line(line);
        let mut utf16_offset = 0usize;
        let mut char_idx = 0usize;
        for ch in line_slice.chars() {
            if utf16_offset >= position.character as usize {
                break;
            }
            utf16_offset += ch.len_utf16();
            char_idx += 1;
        }
        line_start + char_idx.min(line_slice.len_chars())
    }

    /// The text of one line, newline stripped.
    pub fn line_text(&self, line: u32) -> Option<String> {
        if (line as usize) >= self.rope.len_lines() {
            return None;
        }
        let text: String = self.rope.line(line as usize).to_string();
        Some(text.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// md5 hex digest used as the AST-cache key.
pub fn content_hash(source: &str) -> String {
    format!("{:x}", md5::compute(source.as_bytes()))
}
