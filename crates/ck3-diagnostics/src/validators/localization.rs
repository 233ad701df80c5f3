//! Missing-localization checks for events (CK3503).
//!
//! Only runs once the index has localization entries at all, so a workspace
//! without scanned locale files does not drown in warnings.

use crate::context::ValidationContext;
use crate::{Diagnostic, Severity, Validate, codes};
use ck3_ast::{NodeType, ScriptAst};
use ck3_index::{FileKind, SymbolCategory};
use ck3_parser::annotate::looks_like_event_id;

const SOURCE: &str = "ck3-localization";

pub struct LocalizationValidator;

impl Validate for LocalizationValidator {
    fn name(&self) -> &'static str {
        "localization"
    }

    fn validate(&self, ast: &ScriptAst, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        if ctx.file_kind != FileKind::Events {
            return Vec::new();
        }
        if ctx.index.stats().get("localization").copied().unwrap_or(0) == 0 {
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
            for field in ["title", "desc"] {
                for occurrence in ast.child_assignments(top, field) {
                    check_key(ast, occurrence, ctx, &mut out);
                }
            }
            for option in ast.child_assignments(top, "option") {
                for name in ast.child_assignments(option, "name") {
                    check_key(ast, name, ctx, &mut out);
                }
            }
        }
        out
    }
}

fn check_key(
    ast: &ScriptAst,
    id: ck3_ast::NodeId,
    ctx: &ValidationContext<'_>,
    out: &mut Vec<Diagnostic>,
) {
    let Some(scalar) = ast.node(id).scalar() else { return };
    // Desc blocks (first_valid etc.) and inline quoted text are not keys.
    if scalar.kind != ck3_ast::ScalarKind::Identifier {
        return;
    }
    if ctx.index.lookup(SymbolCategory::Localization, &scalar.text).is_empty() {
        out.push(Diagnostic::new(
            scalar.range,
            Severity::Warning,
            codes::MISSING_LOCALIZATION,
            SOURCE,
            format!("no localization entry for '{}'", scalar.text),
        ));
    }
}
