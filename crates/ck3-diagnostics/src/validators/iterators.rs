//! Iterator validation (CK3203, CK3260).

use crate::context::{BlockContext, ValidationContext, context_of};
use crate::{Diagnostic, Severity, Validate, codes};
use ck3_ast::{NodeType, ScriptAst};
use ck3_scope::iterators::{self, IteratorPrefix};

const SOURCE: &str = "ck3-scope";

pub struct IteratorsValidator;

impl Validate for IteratorsValidator {
    fn name(&self) -> &'static str {
        "iterators"
    }

    fn validate(&self, ast: &ScriptAst, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for id in ast.walk() {
            let node = ast.node(id);
            if node.node_type != NodeType::Assignment
                || !node.is_block()
                || node.parent == Some(ast.root())
            {
                continue;
            }
            let Some((prefix, base)) = IteratorPrefix::strip(&node.key) else { continue };
            if ck3_tables::is_keyword(&node.key) {
                continue;
            }

            let context = context_of(ast, id, ctx.file_kind);

            if prefix.is_effect() && context == BlockContext::Trigger {
                out.push(Diagnostic::new(
                    node.key_range,
                    Severity::Error,
                    codes::BAD_ITERATOR,
                    SOURCE,
                    format!(
                        "'{}{base}' is an effect iterator; use 'any_{base}' in trigger blocks",
                        prefix.as_str()
                    ),
                ).with_replacement(&format!("any_{base}")));
                continue;
            }
            if prefix == IteratorPrefix::Any && context == BlockContext::Effect {
                out.push(Diagnostic::new(
                    node.key_range,
                    Severity::Error,
                    codes::BAD_ITERATOR,
                    SOURCE,
                    format!(
                        "'any_{base}' is a trigger; use 'every_{base}', 'random_{base}', or \
                         'ordered_{base}' in effect blocks"
                    ),
                ));
                continue;
            }

            // Base must be a legal list from the enclosing scope.
            let from = node
                .parent
                .map(|p| ast.node(p).scope_type)
                .unwrap_or(ck3_scope::ScopeType::Unknown);
            if iterators::resolve_iterator(base, from).is_none() {
                let mut message =
                    format!("'{base}' is not an iterable list from scope {from}");
                let suggestion = iterators::suggest_iterator_base(base);
                if let Some(suggestion) = suggestion {
                    message.push_str(&format!("; did you mean '{}{suggestion}'?", prefix.as_str()));
                }
                let mut diagnostic = Diagnostic::new(
                    node.key_range,
                    Severity::Error,
                    codes::BAD_ITERATOR,
                    SOURCE,
                    message,
                );
                if let Some(suggestion) = suggestion {
                    diagnostic =
                        diagnostic.with_replacement(&format!("{}{suggestion}", prefix.as_str()));
                }
                out.push(diagnostic);
                continue;
            }

            // An iterator whose body only filters (or is empty) does nothing.
            let has_payload = ast.children(id).iter().any(|&c| {
                let child = ast.node(c);
                child.node_type != NodeType::Comment
                    && !matches!(child.key.as_str(), "limit" | "count" | "order_by" | "position" | "max" | "check_range_bounds")
            });
            if !has_payload && prefix != IteratorPrefix::Any {
                out.push(Diagnostic::new(
                    node.key_range,
                    Severity::Warning,
                    codes::EMPTY_ITERATOR,
                    SOURCE,
                    format!("'{}' iterates but its body does nothing", node.key),
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ck3_index::{DocumentIndex, FileKind};
    use ck3_parser::parse;
    use ck3_schema::SchemaSet;

    fn run(source: &str) -> Vec<Diagnostic> {
        let outcome = parse(source);
        let index = DocumentIndex::new();
        let schemas = SchemaSet::from_sources(&[]).unwrap_or_else(|_| unreachable!());
        let ctx = ValidationContext {
            uri: "file:///events/test.txt",
            path: "events/test.txt",
            file_kind: FileKind::Events,
            index: &index,
            schemas: &schemas,
            source,
        };
        IteratorsValidator.validate(&outcome.ast, &ctx)
    }

    #[test]
    fn effect_iterator_in_trigger_block() {
        let diagnostics = run("x.1 = { trigger = { every_child = { is_adult = yes } } }");
        let bad: Vec<_> = diagnostics.iter().filter(|d| d.code == codes::BAD_ITERATOR).collect();
        assert_eq!(bad.len(), 1);
        assert!(bad[0].message.contains("any_child"));
    }

    #[test]
    fn any_iterator_in_effect_block() {
        let diagnostics = run("x.1 = { immediate = { any_child = { add_gold = 1 } } }");
        assert!(diagnostics.iter().any(|d| d.code == codes::BAD_ITERATOR));
    }

    #[test]
    fn illegal_base_from_scope() {
        // `held_title` lists titles from a character, not from a province.
        let diagnostics = run(
            "x.1 = { immediate = { capital_province = { every_held_title = { set_title_name = a } } } }",
        );
        assert!(diagnostics.iter().any(|d| d.code == codes::BAD_ITERATOR));
    }

    #[test]
    fn legal_iterators_are_quiet() {
        let diagnostics = run(
            "x.1 = { trigger = { any_child = { is_adult = yes } } immediate = { every_vassal = { add_opinion = { target = root modifier = x } } } }",
        );
        assert!(diagnostics.iter().all(|d| d.code != codes::BAD_ITERATOR), "{diagnostics:?}");
    }

    #[test]
    fn empty_iterator_body_warns() {
        let diagnostics = run("x.1 = { immediate = { every_child = { limit = { is_adult = yes } } } }");
        assert!(diagnostics.iter().any(|d| d.code == codes::EMPTY_ITERATOR));
    }

    #[test]
    fn typo_in_base_gets_suggestion() {
        let diagnostics = run("x.1 = { immediate = { every_chil = { add_gold = 1 } } }");
        let bad: Vec<_> = diagnostics.iter().filter(|d| d.code == codes::BAD_ITERATOR).collect();
        assert_eq!(bad.len(), 1);
        assert!(bad[0].message.contains("every_child"));
    }
}
