//! Scope-chain and saved-scope validation (CK3201, CK3202).

use crate::context::{BlockContext, ValidationContext, context_of};
use crate::validators::saved_scopes_in;
use crate::{Diagnostic, Severity, Validate, codes};
use ck3_ast::{NodeId, NodeType, Range, ScriptAst, utf16_len};
use ck3_index::SymbolCategory;
use ck3_parser::annotate::looks_like_event_id;
use ck3_scope::{ScopeType, links, validate_chain};

const SOURCE: &str = "ck3-scope";

pub struct ScopeValidator;

impl Validate for ScopeValidator {
    fn name(&self) -> &'static str {
        "scope"
    }

    fn validate(&self, ast: &ScriptAst, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for &top in ast.children(ast.root()) {
            if ast.node(top).node_type != NodeType::Assignment || !ast.node(top).is_block() {
                continue;
            }
            // A `scope:` reference is only valid once the effect that saves
            // it has run, so the body is walked in source order and a save
            // counts only from its own position onward. The whole-body set
            // exists solely to route trigger-block references to later saves
            // to the timing validator (CK3251) instead of CK3202.
            let saved_anywhere = saved_scopes_in(ast, top);
            let mut saved_so_far = std::collections::HashSet::new();
            visit_body(ast, top, false, &saved_anywhere, &mut saved_so_far, ctx, &mut out);
        }
        out
    }
}

/// Source-order walk of one top-level body. `in_top_trigger` is set inside
/// the body's direct `trigger` block, which the engine evaluates before any
/// effect runs.
fn visit_body(
    ast: &ScriptAst,
    block: NodeId,
    in_top_trigger: bool,
    saved_anywhere: &std::collections::HashSet<String>,
    saved_so_far: &mut std::collections::HashSet<String>,
    ctx: &ValidationContext<'_>,
    out: &mut Vec<Diagnostic>,
) {
    for &child in ast.children(block) {
        let node = ast.node(child);
        if node.node_type == NodeType::Assignment {
            check_key_chain(ast, child, ctx, out);
            check_saved_refs(ast, child, in_top_trigger, saved_anywhere, saved_so_far, out);
            if matches!(node.key.as_str(), "save_scope_as" | "save_temporary_scope_as") {
                if let Some(scalar) = node.scalar() {
                    saved_so_far.insert(scalar.text.clone());
                }
            }
        }
        if node.is_block() {
            let child_in_trigger = in_top_trigger
                || (ast.node(block).parent == Some(ast.root()) && node.key == "trigger");
            visit_body(ast, child, child_in_trigger, saved_anywhere, saved_so_far, ctx, out);
        }
    }
}

/// Validate a dotted key as a scope chain (rule: left-to-right through the
/// link table; first unresolved segment downgrades the rest).
fn check_key_chain(
    ast: &ScriptAst,
    id: NodeId,
    ctx: &ValidationContext<'_>,
    out: &mut Vec<Diagnostic>,
) {
    let node = ast.node(id);
    let key = node.key.as_str();
    if !key.contains('.') || looks_like_event_id(key) {
        return;
    }
    let start = enclosing_scope(ast, id);
    if start.is_unknown() {
        return;
    }

    let ancestors = ancestor_scopes(ast, id);
    let segments: Vec<&str> = key.split('.').collect();
    let (last, chain_segments) = match segments.split_last() {
        Some((last, rest)) if !rest.is_empty() => (*last, rest.join(".")),
        _ => return,
    };

    let outcome = validate_chain(&chain_segments, start, &ancestors);
    if let Some(error) = &outcome.error {
        out.push(chain_diagnostic(
            node.key_range,
            error.offset,
            &error.segment,
            error.from,
            error.suggestion,
        ));
        return;
    }

    // The chain resolved; the final segment must make sense from the
    // resulting scope.
    let final_scope = outcome.result;
    if final_scope.is_unknown() {
        return;
    }
    let context = context_of(ast, id, ctx.file_kind);
    let last_ok = links::resolve_link(final_scope, last).is_some()
        || match context {
            BlockContext::Trigger => ck3_tables::is_trigger(last),
            BlockContext::Effect => ck3_tables::is_effect(last),
            BlockContext::Unknown => {
                ck3_tables::is_trigger(last) || ck3_tables::is_effect(last)
            }
        }
        || !ctx.index.lookup(SymbolCategory::ScriptedEffects, last).is_empty()
        || !ctx.index.lookup(SymbolCategory::ScriptedTriggers, last).is_empty()
        || !ctx.index.lookup(SymbolCategory::ScriptValues, last).is_empty()
        || ck3_scope::iterators::parse_iterator_key(last).is_some();
    if !last_ok {
        let offset = utf16_len(&chain_segments) + 1;
        out.push(chain_diagnostic(
            node.key_range,
            offset,
            last,
            final_scope,
            links::suggest_link(final_scope, last),
        ));
    }
}

fn chain_diagnostic(
    key_range: Range,
    offset: u32,
    segment: &str,
    from: ScopeType,
    suggestion: Option<&'static str>,
) -> Diagnostic {
    let start = ck3_ast::Position::new(key_range.start.line, key_range.start.character + offset);
    let end = ck3_ast::Position::new(start.line, start.character + utf16_len(segment));
    let mut message = format!("'{segment}' does not resolve from scope {from}");
    if let Some(suggestion) = suggestion {
        message.push_str(&format!("; did you mean '{suggestion}'?"));
    }
    let diagnostic = Diagnostic::new(
        Range::new(start, end),
        Severity::Error,
        codes::BAD_SCOPE_CHAIN,
        SOURCE,
        message,
    );
    match suggestion {
        Some(s) => diagnostic.with_replacement(s),
        None => diagnostic,
    }
}

/// CK3202: a `scope:NAME` reference needs an earlier save in the same body.
///
/// References inside the body's `trigger` block to names the body saves
/// later are skipped here; that ordering problem is the timing validator's
/// (CK3251).
fn check_saved_refs(
    ast: &ScriptAst,
    id: NodeId,
    in_top_trigger: bool,
    saved_anywhere: &std::collections::HashSet<String>,
    saved_so_far: &std::collections::HashSet<String>,
    out: &mut Vec<Diagnostic>,
) {
    let node = ast.node(id);
    let check = |name: &str, range: Range, out: &mut Vec<Diagnostic>| {
        if saved_so_far.contains(name) {
            return;
        }
        if in_top_trigger && saved_anywhere.contains(name) {
            return;
        }
        out.push(unsaved_diagnostic(range, name, saved_anywhere.contains(name)));
    };

    if let Some(name) = scope_ref_name(&node.key) {
        let width = utf16_len("scope:") + utf16_len(name);
        let end = ck3_ast::Position::new(
            node.key_range.start.line,
            node.key_range.start.character + width,
        );
        check(name, Range::new(node.key_range.start, end), out);
    }

    // `save_scope_as = foo` defines rather than references.
    if matches!(node.key.as_str(), "save_scope_as" | "save_temporary_scope_as") {
        return;
    }
    if let Some(scalar) = node.scalar() {
        if let Some(name) = scope_ref_name(&scalar.text) {
            check(name, scalar.range, out);
        }
    }
}

fn unsaved_diagnostic(range: Range, name: &str, saved_later: bool) -> Diagnostic {
    let message = if saved_later {
        format!("scope '{name}' is referenced before it is saved (save_scope_as = {name} must run first)")
    } else {
        format!("scope '{name}' is never saved in this body (save_scope_as = {name})")
    };
    Diagnostic::new(range, Severity::Error, codes::UNSAVED_SCOPE, SOURCE, message)
}

/// `scope:foo` or `scope:foo.rest` - returns `foo`.
fn scope_ref_name(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("scope:")?;
    let name = rest.split('.').next().unwrap_or(rest);
    (!name.is_empty()).then_some(name)
}

/// Scope a node's key is evaluated in: its parent block's annotation.
fn enclosing_scope(ast: &ScriptAst, id: NodeId) -> ScopeType {
    ast.node(id)
        .parent
        .map(|p| ast.node(p).scope_type)
        .unwrap_or(ScopeType::Unknown)
}

/// Ancestor scope stack, outermost first, for `prev`/`root` resolution.
fn ancestor_scopes(ast: &ScriptAst, id: NodeId) -> Vec<ScopeType> {
    let mut scopes: Vec<ScopeType> = ast
        .ancestors(id)
        .filter(|&a| a != ast.root())
        .map(|a| ast.node(a).scope_type)
        .collect();
    scopes.reverse();
    scopes
}
