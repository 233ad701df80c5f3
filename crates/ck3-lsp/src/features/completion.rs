//! Completion provider.
//!
//! Proposals are filtered by block context (trigger/effect/schema) and by
//! the current scope type. The trigger characters do most of the routing:
//! `.` proposes link children of the chain so far, `:` proposes saved scopes
//! for `scope:`, `=` and plain typing propose values or keys.

use crate::features::DocSnapshot;
use crate::util::{line_prefix, word_at};
use ck3_ast::{NodeId, Position};
use ck3_diagnostics::{BlockContext, context_of};
use ck3_index::{DocumentIndex, SymbolCategory};
use ck3_schema::{SchemaSet, field_completions};
use ck3_scope::{ScopeType, iterators, links, validate_chain};
use serde::Serialize;

/// LSP `CompletionItemKind` values used here.
mod kinds {
    pub const FUNCTION: u32 = 3;
    pub const VARIABLE: u32 = 6;
    pub const PROPERTY: u32 = 10;
    pub const VALUE: u32 = 12;
    pub const ENUM_MEMBER: u32 = 20;
    pub const KEYWORD: u32 = 14;
    pub const EVENT: u32 = 23;
    pub const SNIPPET: u32 = 15;
}

/// Wire completion item.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionItem {
    pub label: String,
    pub kind: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert_text: Option<String>,
    /// 1 = plain text, 2 = snippet.
    pub insert_text_format: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_text: Option<String>,
}

impl CompletionItem {
    fn plain(label: impl Into<String>, kind: u32) -> Self {
        Self {
            label: label.into(),
            kind,
            detail: None,
            documentation: None,
            insert_text: None,
            insert_text_format: 1,
            sort_text: None,
        }
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Entry point.
pub fn complete(
    snapshot: &DocSnapshot,
    index: &DocumentIndex,
    schemas: &SchemaSet,
    position: Position,
    snippet_support: bool,
    max_items: usize,
) -> Vec<CompletionItem> {
    let Some(line) = snapshot.line_text(position.line) else { return Vec::new() };
    let prefix = line_prefix(line, position.character);
    let word = trailing_word(&prefix);

    let mut items = if let Some(rest) = word.strip_suffix('.').or(word
        .rsplit_once('.')
        .map(|(head, _)| head))
    {
        // Mid-chain: `liege.` or `liege.pri` - propose children of the chain.
        chain_completions(snapshot, position, rest)
    } else if word.starts_with("scope:") || word == "scope" && prefix.ends_with("scope:") {
        saved_scope_completions(snapshot, index, position)
    } else if let Some(key) = value_position_key(&prefix, &word) {
        value_completions(snapshot, index, schemas, position, &key)
    } else {
        key_completions(snapshot, index, schemas, position, snippet_support)
    };

    items.sort_by(|a, b| {
        a.sort_text.as_deref().unwrap_or(&a.label).cmp(b.sort_text.as_deref().unwrap_or(&b.label))
    });
    items.dedup_by(|a, b| a.label == b.label);
    items.truncate(max_items);
    items
}

/// Identifier-ish text immediately before the cursor.
fn trailing_word(prefix: &str) -> String {
    prefix
        .chars()
        .rev()
        .take_while(|&c| crate::util::is_word_char(c))
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect()
}

/// `key = par|` - the key of a value position, if the cursor is in one.
fn value_position_key(prefix: &str, word: &str) -> Option<String> {
    let before_word = prefix[..prefix.len() - word.len()].trim_end();
    let rest = before_word.strip_suffix(['=', '>', '<'])?;
    let rest = rest.strip_suffix(['=', '!', '>', '<']).unwrap_or(rest);
    let key = rest
        .trim_end()
        .chars()
        .rev()
        .take_while(|&c| crate::util::is_word_char(c))
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<String>();
    (!key.is_empty()).then_some(key)
}

fn scope_at(snapshot: &DocSnapshot, position: Position) -> ScopeType {
    let ast = &snapshot.parse.ast;
    let Some(node) = ast.node_at_position(position) else { return ScopeType::Unknown };
    let node_ref = ast.node(node);
    if node_ref.is_block() || node_ref.node_type == ck3_ast::NodeType::Root {
        node_ref.scope_type
    } else {
        node_ref
            .parent
            .map(|p| ast.node(p).scope_type)
            .unwrap_or(ScopeType::Unknown)
    }
}

fn chain_completions(
    snapshot: &DocSnapshot,
    position: Position,
    chain_prefix: &str,
) -> Vec<CompletionItem> {
    let start = scope_at(snapshot, position);
    let resolved = if chain_prefix.is_empty() {
        start
    } else {
        validate_chain(chain_prefix, start, &[]).result
    };
    let mut items: Vec<CompletionItem> = links::link_names(resolved)
        .into_iter()
        .map(|(name, target)| {
            CompletionItem::plain(name, kinds::PROPERTY).with_detail(format!("→ {target}"))
        })
        .collect();
    if matches!(resolved, ScopeType::Unknown | ScopeType::Any) {
        // Nothing typed resolves; offer the stack keywords at least.
        for keyword in ["this", "prev", "root"] {
            items.push(CompletionItem::plain(keyword, kinds::KEYWORD));
        }
    }
    items
}

fn saved_scope_completions(
    snapshot: &DocSnapshot,
    index: &DocumentIndex,
    position: Position,
) -> Vec<CompletionItem> {
    let enclosing_event = snapshot.top_level_key_at(position);
    let mut items = Vec::new();
    for name in index.names(SymbolCategory::SavedScopes) {
        let entries = index.lookup(SymbolCategory::SavedScopes, &name);
        let visible = entries.iter().any(|e| {
            match (&enclosing_event, e.attribute("event")) {
                // Inside an event body: only scopes saved by this event.
                (Some(event), Some(owner)) => owner == event,
                _ => e.uri == snapshot.uri,
            }
        });
        if visible {
            items.push(
                CompletionItem::plain(name, kinds::VARIABLE).with_detail("saved scope"),
            );
        }
    }
    items
}

fn value_completions(
    snapshot: &DocSnapshot,
    index: &DocumentIndex,
    schemas: &SchemaSet,
    position: Position,
    key: &str,
) -> Vec<CompletionItem> {
    let mut items = Vec::new();

    // Schema enum/bool values for the field, resolved through the key path.
    if let Some((schema, path)) = schema_path_at(snapshot, schemas, position) {
        let mut field_path: Vec<&str> = path.iter().map(String::as_str).collect();
        field_path.push(key);
        if let Some(field) = schema.doc_for_path(&field_path) {
            match field.record.field_type {
                ck3_schema::FieldType::Enum => {
                    for value in &field.enum_values {
                        items.push(CompletionItem::plain(value, kinds::ENUM_MEMBER));
                    }
                }
                ck3_schema::FieldType::Bool => {
                    items.push(CompletionItem::plain("yes", kinds::ENUM_MEMBER));
                    items.push(CompletionItem::plain("no", kinds::ENUM_MEMBER));
                }
                ck3_schema::FieldType::LocalizationKey => {
                    for name in index.names(SymbolCategory::Localization) {
                        items.push(CompletionItem::plain(name, kinds::VALUE));
                    }
                }
                _ => {}
            }
        }
    }

    match key {
        "trigger_event" | "event" => {
            for name in index.names(SymbolCategory::Events) {
                items.push(CompletionItem::plain(name, kinds::EVENT));
            }
        }
        "add_trait" | "remove_trait" | "has_trait" => {
            for name in index.names(SymbolCategory::Traits) {
                items.push(CompletionItem::plain(name, kinds::VALUE));
            }
        }
        "save_scope_as" | "save_temporary_scope_as" => {}
        _ if items.is_empty() => {
            // Generic boolean leaves are overwhelmingly common.
            items.push(CompletionItem::plain("yes", kinds::ENUM_MEMBER));
            items.push(CompletionItem::plain("no", kinds::ENUM_MEMBER));
        }
        _ => {}
    }
    items
}

fn key_completions(
    snapshot: &DocSnapshot,
    index: &DocumentIndex,
    schemas: &SchemaSet,
    position: Position,
    snippet_support: bool,
) -> Vec<CompletionItem> {
    let ast = &snapshot.parse.ast;
    let mut items = Vec::new();

    // Schema fields for the enclosing block, when a schema governs it.
    if let Some((schema, path)) = schema_path_at(snapshot, schemas, position) {
        let field_path: Vec<&str> = path.iter().map(String::as_str).collect();
        if let Some(fields) = schema.fields_for_path(&field_path) {
            if let Some(block) = enclosing_block(snapshot, position) {
                for proposal in field_completions(fields, ast, block) {
                    let mut item = CompletionItem::plain(&proposal.name, kinds::SNIPPET);
                    item.detail = proposal.detail;
                    item.documentation = proposal.documentation;
                    if snippet_support {
                        item.insert_text = proposal.snippet;
                        item.insert_text_format = 2;
                    }
                    item.sort_text = Some(format!("0_{}", proposal.name));
                    items.push(item);
                }
            }
        }
    }

    // Language-table names by context.
    let context = enclosing_block(snapshot, position)
        .map(|block| block_body_context(snapshot, block))
        .unwrap_or(BlockContext::Unknown);
    let scope = scope_at(snapshot, position);

    match context {
        BlockContext::Trigger => {
            for name in ck3_tables::TRIGGERS.iter() {
                items.push(CompletionItem::plain(*name, kinds::FUNCTION));
            }
            for name in index.names(SymbolCategory::ScriptedTriggers) {
                items.push(CompletionItem::plain(name, kinds::FUNCTION).with_detail("scripted trigger"));
            }
            for (base, target) in iterators::iterator_bases(scope) {
                items.push(
                    CompletionItem::plain(format!("any_{base}"), kinds::FUNCTION)
                        .with_detail(format!("→ {target}")),
                );
            }
        }
        BlockContext::Effect => {
            for name in ck3_tables::EFFECTS.iter() {
                items.push(CompletionItem::plain(*name, kinds::FUNCTION));
            }
            for name in index.names(SymbolCategory::ScriptedEffects) {
                items.push(CompletionItem::plain(name, kinds::FUNCTION).with_detail("scripted effect"));
            }
            for (base, target) in iterators::iterator_bases(scope) {
                for prefix in ["every_", "random_", "ordered_"] {
                    items.push(
                        CompletionItem::plain(format!("{prefix}{base}"), kinds::FUNCTION)
                            .with_detail(format!("→ {target}")),
                    );
                }
            }
        }
        BlockContext::Unknown => {}
    }

    if context != BlockContext::Unknown {
        for keyword in ck3_tables::KEYWORDS.iter() {
            items.push(CompletionItem::plain(*keyword, kinds::KEYWORD));
        }
        for (name, target) in links::link_names(scope) {
            items.push(
                CompletionItem::plain(name, kinds::PROPERTY).with_detail(format!("→ {target}")),
            );
        }
    }

    items
}

/// The deepest block node containing `position`.
fn enclosing_block(snapshot: &DocSnapshot, position: Position) -> Option<NodeId> {
    let ast = &snapshot.parse.ast;
    let node = ast.node_at_position(position)?;
    if ast.node(node).is_block() {
        return Some(node);
    }
    ast.ancestors(node).find(|&a| ast.node(a).is_block())
}

/// Context of content *inside* `block` (not of the block node itself): probe
/// via a child when one exists, else classify the block in its parent and
/// re-interpret for its body.
fn block_body_context(snapshot: &DocSnapshot, block: NodeId) -> BlockContext {
    let ast = &snapshot.parse.ast;
    if let Some(&child) = ast.children(block).first() {
        return context_of(ast, child, snapshot.kind);
    }
    // Empty block: classify as if it had a child, by asking about the block
    // itself one level up with its own key taken into account.
    let key = ast.node(block).key.as_str();
    if matches!(key, "trigger" | "limit" | "alternative_limit") {
        return BlockContext::Trigger;
    }
    if matches!(key, "immediate" | "effect" | "after" | "option") {
        return BlockContext::Effect;
    }
    context_of(ast, block, snapshot.kind)
}

/// The governing schema and the key path from the top-level block down to
/// the block containing `position`.
fn schema_path_at<'s>(
    snapshot: &DocSnapshot,
    schemas: &'s SchemaSet,
    position: Position,
) -> Option<(&'s ck3_schema::CompiledSchema, Vec<String>)> {
    let ast = &snapshot.parse.ast;
    let block = enclosing_block(snapshot, position)?;

    // Spine from top-level block to the enclosing block.
    let mut spine: Vec<NodeId> = std::iter::once(block)
        .chain(ast.ancestors(block))
        .filter(|&id| id != ast.root())
        .collect();
    spine.reverse();
    let top = *spine.first()?;
    let schema = schemas.schema_for_block(&snapshot.path, &ast.node(top).key)?;
    let path: Vec<String> = spine[1..].iter().map(|&id| ast.node(id).key.clone()).collect();
    Some((schema, path))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::Arc;

    fn snapshot(text: &str) -> DocSnapshot {
        DocSnapshot {
            uri: "file:///mod/events/test.txt".into(),
            path: "mod/events/test.txt".into(),
            kind: ck3_index::FileKind::Events,
            version: 1,
            text: text.to_string(),
            parse: Arc::new(ck3_parser::parse(text)),
        }
    }

    fn labels(items: &[CompletionItem]) -> Vec<&str> {
        items.iter().map(|i| i.label.as_str()).collect()
    }

    #[test]
    fn dot_proposes_links_of_the_chain() {
        let text = "m.0001 = { immediate = { liege. } }";
        let snap = snapshot(text);
        let items = complete(
            &snap,
            &DocumentIndex::new(),
            &SchemaSet::load_bundled(),
            Position::new(0, 31),
            false,
            200,
        );
        let labels = labels(&items);
        assert!(labels.contains(&"primary_title"));
        assert!(labels.contains(&"mother"));
        assert!(!labels.contains(&"holder"));
    }

    #[test]
    fn trigger_context_proposes_triggers_not_effects() {
        let text = "m.0001 = { trigger = {  } }";
        let snap = snapshot(text);
        let items = complete(
            &snap,
            &DocumentIndex::new(),
            &SchemaSet::load_bundled(),
            Position::new(0, 23),
            false,
            10_000,
        );
        let labels = labels(&items);
        assert!(labels.contains(&"has_trait"));
        assert!(labels.contains(&"any_child"));
        assert!(!labels.contains(&"add_gold"));
        assert!(!labels.contains(&"every_child"));
    }

    #[test]
    fn effect_context_proposes_effects() {
        let text = "m.0001 = { immediate = {  } }";
        let snap = snapshot(text);
        let items = complete(
            &snap,
            &DocumentIndex::new(),
            &SchemaSet::load_bundled(),
            Position::new(0, 25),
            false,
            10_000,
        );
        let labels = labels(&items);
        assert!(labels.contains(&"add_gold"));
        assert!(labels.contains(&"every_child"));
        assert!(!labels.contains(&"has_trait") || ck3_tables::is_effect("has_trait"));
    }

    #[test]
    fn event_body_proposes_schema_fields() {
        let text = "m.0001 = {  }";
        let snap = snapshot(text);
        let items = complete(
            &snap,
            &DocumentIndex::new(),
            &SchemaSet::load_bundled(),
            Position::new(0, 11),
            true,
            10_000,
        );
        let labels = labels(&items);
        assert!(labels.contains(&"type"));
        assert!(labels.contains(&"option"));
        let option = items.iter().find(|i| i.label == "option").unwrap();
        assert_eq!(option.insert_text_format, 2);
        assert!(option.insert_text.as_deref().unwrap_or("").contains("name"));
    }

    #[test]
    fn enum_values_after_equals() {
        let text = "m.0001 = { type =  }";
        let snap = snapshot(text);
        let items = complete(
            &snap,
            &DocumentIndex::new(),
            &SchemaSet::load_bundled(),
            Position::new(0, 18),
            false,
            200,
        );
        let labels = labels(&items);
        assert!(labels.contains(&"character_event"));
        assert!(labels.contains(&"letter_event"));
    }

    #[test]
    fn saved_scopes_filter_by_enclosing_event() {
        let text = "m.0001 = { immediate = { save_scope_as = victim } }\nm.0002 = { immediate = { x = scope: } }";
        let snap = snapshot(text);
        let index = DocumentIndex::new();
        ck3_lsp_index_seed(&index, &snap);
        // Cursor inside m.0002 after `scope:`.
        let items = complete(
            &snap,
            &index,
            &SchemaSet::load_bundled(),
            Position::new(1, 35),
            false,
            200,
        );
        // `victim` was saved by m.0001, not m.0002: filtered out.
        assert!(!labels(&items).contains(&"victim"));
    }

    fn ck3_lsp_index_seed(index: &DocumentIndex, snap: &DocSnapshot) {
        let contributions =
            ck3_index::extract_contributions(&snap.parse.ast, ck3_index::FileKind::Events);
        index.replace(&snap.uri, contributions);
    }
}
