//! Event-file domain checks (CK3501, CK3502).

use crate::context::ValidationContext;
use crate::{Diagnostic, RelatedInformation, Severity, Validate, WireLocation, codes};
use ck3_ast::{NodeType, ScriptAst};
use ck3_index::{FileKind, SymbolCategory};
use ck3_parser::annotate::looks_like_event_id;
use std::collections::HashMap;

const SOURCE: &str = "ck3-events";

pub struct EventsValidator;

impl Validate for EventsValidator {
    fn name(&self) -> &'static str {
        "events"
    }

    fn validate(&self, ast: &ScriptAst, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        if ctx.file_kind != FileKind::Events {
            return Vec::new();
        }
        let mut out = Vec::new();

        let mut local_namespaces = Vec::new();
        for &top in ast.children(ast.root()) {
            let node = ast.node(top);
            if node.node_type == NodeType::Assignment && node.key == "namespace" {
                if let Some(scalar) = node.scalar() {
                    local_namespaces.push(scalar.text.clone());
                }
            }
        }

        let mut seen: HashMap<&str, ck3_ast::Range> = HashMap::new();
        for &top in ast.children(ast.root()) {
            let node = ast.node(top);
            if node.node_type != NodeType::Assignment
                || !node.is_block()
                || !looks_like_event_id(&node.key)
            {
                continue;
            }

            if let Some(&first) = seen.get(node.key.as_str()) {
                let mut diagnostic = Diagnostic::new(
                    node.key_range,
                    Severity::Error,
                    codes::DUPLICATE_EVENT,
                    SOURCE,
                    format!("event '{}' is defined more than once in this file", node.key),
                );
                diagnostic.related_information = Some(vec![RelatedInformation {
                    location: WireLocation { uri: ctx.uri.to_string(), range: first },
                    message: "first definition is here".to_string(),
                }]);
                out.push(diagnostic);
            } else {
                seen.insert(node.key.as_str(), node.key_range);
            }

            if let Some((namespace, _)) = node.key.rsplit_once('.') {
                let declared_here = local_namespaces.iter().any(|n| n == namespace);
                let declared_anywhere = declared_here
                    || !ctx.index.lookup(SymbolCategory::Namespaces, namespace).is_empty();
                if !declared_anywhere {
                    out.push(Diagnostic::new(
                        node.key_range,
                        Severity::Warning,
                        codes::UNDECLARED_NAMESPACE,
                        SOURCE,
                        format!(
                            "namespace '{namespace}' is not declared (add `namespace = {namespace}`)"
                        ),
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
        EventsValidator.validate(&outcome.ast, &ctx)
    }

    #[test]
    fn duplicate_event_ids_are_flagged_once_per_duplicate() {
        let diagnostics = run(
            "namespace = m\nm.1 = { option = { name = a } }\nm.1 = { option = { name = b } }",
        );
        let duplicates: Vec<_> =
            diagnostics.iter().filter(|d| d.code == codes::DUPLICATE_EVENT).collect();
        assert_eq!(duplicates.len(), 1);
        assert!(duplicates[0].related_information.is_some());
    }

    #[test]
    fn undeclared_namespace_warns() {
        let diagnostics = run("other.1 = { option = { name = a } }");
        assert!(diagnostics.iter().any(|d| d.code == codes::UNDECLARED_NAMESPACE));
    }

    #[test]
    fn declared_namespace_is_quiet() {
        let diagnostics = run("namespace = m\nm.1 = { option = { name = a } }");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }
}
