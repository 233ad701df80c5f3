//! Scope-timing checks (CK3251).
//!
//! An event's `trigger` is evaluated before `immediate` runs, so a
//! `scope:NAME` reference inside the trigger cannot see a scope that the
//! same event only saves later. The plain existence check (CK3202) passes in
//! that situation; this validator catches the ordering problem.

use crate::context::ValidationContext;
use crate::validators::saved_scopes_in;
use crate::{Diagnostic, Severity, Validate, codes};
use ck3_ast::{NodeId, NodeType, ScriptAst};
use ck3_index::FileKind;
use ck3_parser::annotate::looks_like_event_id;

const SOURCE: &str = "ck3-scope";

pub struct ScopeTimingValidator;

impl Validate for ScopeTimingValidator {
    fn name(&self) -> &'static str {
        "scope_timing"
    }

    fn validate(&self, ast: &ScriptAst, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        if ctx.file_kind != FileKind::Events {
            return Vec::new();
        }
        let mut out = Vec::new();
        for &top in ast.children(ast.root()) {
            let node = ast.node(top);
            if node.node_type != NodeType::Assignment
                || !node.is_block()
                || !looks_like_event_id(&node.key)
            {
                continue;
            }
            let saved_here = saved_scopes_in(ast, top);
            if saved_here.is_empty() {
                continue;
            }
            for trigger in ast.child_assignments(top, "trigger") {
                check_trigger_refs(ast, trigger, &saved_here, &mut out);
            }
        }
        out
    }
}

fn check_trigger_refs(
    ast: &ScriptAst,
    trigger: NodeId,
    saved_in_event: &std::collections::HashSet<String>,
    out: &mut Vec<Diagnostic>,
) {
    let mut stack = vec![trigger];
    while let Some(id) = stack.pop() {
        for &child in ast.children(id) {
            let node = ast.node(child);
            if node.is_block() {
                stack.push(child);
            }
            if node.node_type != NodeType::Assignment {
                continue;
            }
            for (text, range) in [
                (Some(node.key.as_str()), node.key_range),
                (
                    node.scalar().map(|s| s.text.as_str()),
                    node.scalar().map(|s| s.range).unwrap_or_default(),
                ),
            ] {
                let Some(text) = text else { continue };
                let Some(rest) = text.strip_prefix("scope:") else { continue };
                let name = rest.split('.').next().unwrap_or(rest);
                if saved_in_event.contains(name) {
                    out.push(Diagnostic::new(
                        range,
                        Severity::Warning,
                        codes::SCOPE_TIMING,
                        SOURCE,
                        format!(
                            "scope '{name}' is saved by this event, but the trigger runs before \
                             the save; the reference will not resolve on first evaluation"
                        ),
                    ));
                }
            }
        }
    }
}
