//! Script-variable checks (CK3701).
//!
//! `var:name` references are matched against `set_variable`/`set_local_variable`
//! occurrences in the same file. Global variables are exempt - they are
//! routinely set in a different file.

use crate::context::ValidationContext;
use crate::{Diagnostic, Severity, Validate, codes};
use ck3_ast::{NodeType, ScriptAst};
use std::collections::HashSet;

const SOURCE: &str = "ck3-variables";

pub struct VariablesValidator;

impl Validate for VariablesValidator {
    fn name(&self) -> &'static str {
        "variables"
    }

    fn validate(&self, ast: &ScriptAst, _ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        let mut set_names: HashSet<String> = HashSet::new();

        // First pass: collect variable definitions. Both the scalar form
        // `set_variable = my_var` and the block form with a `name` field.
        for id in ast.walk() {
            let node = ast.node(id);
            if node.node_type != NodeType::Assignment {
                continue;
            }
            if matches!(node.key.as_str(), "set_variable" | "set_local_variable" | "change_variable") {
                if let Some(scalar) = node.scalar() {
                    set_names.insert(scalar.text.clone());
                } else if let Some(name) = ast.scalar_of(id, "name") {
                    set_names.insert(name.to_string());
                }
            }
        }

        // Second pass: flag unresolved `var:` / `local_var:` references.
        let mut out = Vec::new();
        for id in ast.walk() {
            let node = ast.node(id);
            if node.node_type != NodeType::Assignment {
                continue;
            }
            for (text, range) in [
                (Some(node.key.as_str()), node.key_range),
                (node.scalar().map(|s| s.text.as_str()), node.scalar().map(|s| s.range).unwrap_or_default()),
            ] {
                let Some(text) = text else { continue };
                let Some(name) = variable_ref(text) else { continue };
                if !set_names.contains(name) {
                    out.push(Diagnostic::new(
                        range,
                        Severity::Warning,
                        codes::UNSET_VARIABLE,
                        SOURCE,
                        format!("variable '{name}' is never set in this file"),
                    ));
                }
            }
        }
        out
    }
}

/// `var:foo` or `local_var:foo` (first chain segment), ignoring `global_var:`.
fn variable_ref(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("var:").or_else(|| text.strip_prefix("local_var:"))?;
    let name = rest.split('.').next().unwrap_or(rest);
    (!name.is_empty()).then_some(name)
}
