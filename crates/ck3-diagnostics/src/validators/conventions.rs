//! Naming-convention checks (CK3901, CK3902). Hint severity.

use crate::context::ValidationContext;
use crate::{Diagnostic, Severity, Validate, codes};
use ck3_ast::{NodeType, ScriptAst};
use ck3_index::FileKind;
use ck3_parser::annotate::looks_like_event_id;

const SOURCE: &str = "ck3-conventions";

pub struct ConventionsValidator;

impl Validate for ConventionsValidator {
    fn name(&self) -> &'static str {
        "conventions"
    }

    fn validate(&self, ast: &ScriptAst, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for &top in ast.children(ast.root()) {
            let node = ast.node(top);
            if node.node_type != NodeType::Assignment {
                continue;
            }

            if ctx.file_kind == FileKind::Events && looks_like_event_id(&node.key) {
                if let Some((_, number)) = node.key.rsplit_once('.') {
                    if number.len() < 4 {
                        out.push(Diagnostic::new(
                            node.key_range,
                            Severity::Hint,
                            codes::SHORT_EVENT_NUMBER,
                            SOURCE,
                            format!(
                                "event numbers are conventionally four digits (e.g. {}.{:0>4})",
                                node.key.rsplit_once('.').map(|(ns, _)| ns).unwrap_or(""),
                                number
                            ),
                        ));
                    }
                }
            }

            if node.key.bytes().any(|b| b.is_ascii_uppercase()) && !looks_like_event_id(&node.key)
            {
                out.push(Diagnostic::new(
                    node.key_range,
                    Severity::Hint,
                    codes::NON_SNAKE_CASE,
                    SOURCE,
                    format!("'{}' is not snake_case", node.key),
                ));
            }
        }
        out
    }
}
