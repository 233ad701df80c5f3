//! Script-value formula checks (CK3620).

use crate::context::ValidationContext;
use crate::{Diagnostic, Severity, Validate, codes};
use ck3_ast::{NodeId, NodeType, ScriptAst};
use ck3_index::FileKind;

const SOURCE: &str = "ck3-script-values";

/// Steps the formula evaluator understands.
fn is_formula_step(key: &str) -> bool {
    matches!(
        key,
        "value" | "add" | "subtract" | "multiply" | "divide" | "modulo" | "min" | "max"
            | "round" | "floor" | "ceiling" | "abs" | "if" | "else_if" | "else" | "limit"
            | "desc" | "format" | "fixed_range" | "integer_range"
    )
}

pub struct ScriptValuesValidator;

impl Validate for ScriptValuesValidator {
    fn name(&self) -> &'static str {
        "script_values"
    }

    fn validate(&self, ast: &ScriptAst, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        if ctx.file_kind != FileKind::ScriptValues {
            return Vec::new();
        }
        let mut out = Vec::new();
        for &top in ast.children(ast.root()) {
            let node = ast.node(top);
            if node.node_type != NodeType::Assignment || !node.is_block() {
                continue;
            }
            check_formula(ast, top, &mut out);
        }
        out
    }
}

fn check_formula(ast: &ScriptAst, block: NodeId, out: &mut Vec<Diagnostic>) {
    for &child in ast.children(block) {
        let node = ast.node(child);
        if node.node_type != NodeType::Assignment {
            continue;
        }
        let key = node.key.as_str();
        if is_formula_step(key) {
            if node.is_block() && matches!(key, "if" | "else_if" | "else" | "min" | "max") {
                check_formula(ast, child, out);
            }
            continue;
        }
        // Scope chains and value references are legal operands.
        if key.contains('.') || key.contains(':') {
            continue;
        }
        out.push(Diagnostic::new(
            node.key_range,
            Severity::Warning,
            codes::UNKNOWN_FORMULA_STEP,
            SOURCE,
            format!("'{key}' is not a formula step"),
        ));
    }
}
