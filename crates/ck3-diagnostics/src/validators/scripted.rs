//! Scripted-block checks (CK3601, CK3602).
//!
//! Scripted triggers are pure predicates: any built-in effect in their body
//! is an error the engine would only report at runtime. `$PARAM$`
//! substitution markers must come in pairs within a single token.

use crate::context::ValidationContext;
use crate::{Diagnostic, Severity, Validate, codes};
use ck3_ast::{NodeType, ScriptAst};
use ck3_index::FileKind;

const SOURCE: &str = "ck3-scripted";

pub struct ScriptedBlocksValidator;

impl Validate for ScriptedBlocksValidator {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn validate(&self, ast: &ScriptAst, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        let scripted = matches!(
            ctx.file_kind,
            FileKind::ScriptedTriggers | FileKind::ScriptedEffects
        );
        if !scripted {
            return out;
        }

        for id in ast.walk() {
            let node = ast.node(id);
            if node.node_type != NodeType::Assignment {
                continue;
            }

            if ctx.file_kind == FileKind::ScriptedTriggers
                && node.parent != Some(ast.root())
                && ck3_tables::is_effect(&node.key)
                && !ck3_tables::is_trigger(&node.key)
            {
                out.push(Diagnostic::new(
                    node.key_range,
                    Severity::Error,
                    codes::EFFECT_IN_SCRIPTED_TRIGGER,
                    SOURCE,
                    format!("'{}' is an effect; scripted triggers must stay pure", node.key),
                ));
            }

            if node.key.matches('$').count() % 2 != 0 {
                out.push(Diagnostic::new(
                    node.key_range,
                    Severity::Error,
                    codes::UNBALANCED_PARAMETER,
                    SOURCE,
                    format!("unbalanced '$' in parameter reference '{}'", node.key),
                ));
            }
            if let Some(scalar) = node.scalar() {
                if scalar.text.matches('$').count() % 2 != 0 {
                    out.push(Diagnostic::new(
                        scalar.range,
                        Severity::Error,
                        codes::UNBALANCED_PARAMETER,
                        SOURCE,
                        format!("unbalanced '$' in parameter reference '{}'", scalar.text),
                    ));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ck3_index::DocumentIndex;
    use ck3_parser::parse;
    use ck3_schema::SchemaSet;

    fn run(source: &str, kind: FileKind, path: &str) -> Vec<Diagnostic> {
        let outcome = parse(source);
        let index = DocumentIndex::new();
        let schemas = SchemaSet::from_sources(&[]).unwrap_or_else(|_| unreachable!());
        let ctx = ValidationContext {
            uri: "file:///x",
            path,
            file_kind: kind,
            index: &index,
            schemas: &schemas,
            source,
        };
        ScriptedBlocksValidator.validate(&outcome.ast, &ctx)
    }

    #[test]
    fn effect_inside_scripted_trigger_is_flagged() {
        let diagnostics = run(
            "my_check = { is_adult = yes add_gold = 5 }",
            FileKind::ScriptedTriggers,
            "common/scripted_triggers/t.txt",
        );
        let effects: Vec<_> =
            diagnostics.iter().filter(|d| d.code == codes::EFFECT_IN_SCRIPTED_TRIGGER).collect();
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn effects_are_fine_in_scripted_effects() {
        let diagnostics = run(
            "my_fx = { add_gold = 5 }",
            FileKind::ScriptedEffects,
            "common/scripted_effects/e.txt",
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn balanced_parameters_pass_unbalanced_fail() {
        let ok = run(
            "my_fx = { add_gold = $AMOUNT$ }",
            FileKind::ScriptedEffects,
            "common/scripted_effects/e.txt",
        );
        assert!(ok.is_empty(), "{ok:?}");

        let bad = run(
            "my_fx = { add_gold = $AMOUNT }",
            FileKind::ScriptedEffects,
            "common/scripted_effects/e.txt",
        );
        assert!(bad.iter().any(|d| d.code == codes::UNBALANCED_PARAMETER));
    }
}
