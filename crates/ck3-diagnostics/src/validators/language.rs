//! Built-in name validation (CK3101, CK3102, CK3103).
//!
//! Inside trigger and effect blocks, plain single-segment keys must be known
//! to the language tables, the workspace index (scripted effects/triggers,
//! script values), or the structural vocabulary of the surrounding block.

use crate::context::{BlockContext, ValidationContext, context_of};
use crate::{Diagnostic, Severity, Validate, codes};
use ck3_ast::{NodeType, ScriptAst};
use ck3_index::SymbolCategory;
use ck3_scope::{iterators, links};

const SOURCE: &str = "ck3-language";

/// Structural keys that are legal in many block bodies without being
/// triggers or effects themselves.
fn is_structural(key: &str) -> bool {
    matches!(
        key,
        "name" | "text" | "desc" | "title" | "value" | "factor" | "add" | "subtract"
            | "multiply" | "divide" | "min" | "max" | "target" | "character" | "animation"
            | "trait" | "opinion" | "days" | "months" | "years" | "chance" | "type"
            | "first_valid" | "triggered_desc" | "random_valid" | "tooltip" | "flag"
            | "count" | "order_by" | "position" | "weight" | "scope" | "list"
            | "save_scope_value_as" | "event" | "on_action" | "delayed" | "id"
    )
}

pub struct LanguageValidator;

impl Validate for LanguageValidator {
    fn name(&self) -> &'static str {
        "language"
    }

    fn validate(&self, ast: &ScriptAst, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for id in ast.walk() {
            let node = ast.node(id);
            if node.node_type != NodeType::Assignment || node.parent == Some(ast.root()) {
                continue;
            }
            let key = node.key.as_str();
            if !is_plain_name(key) {
                continue;
            }
            if ck3_tables::is_keyword(key)
                || ck3_tables::BOOLEANS.contains(key)
                || is_structural(key)
            {
                continue;
            }
            if iterators::parse_iterator_key(key).is_some() {
                // Iterator shape; the iterator validator owns its rules.
                continue;
            }
            let scope = node
                .parent
                .map(|p| ast.node(p).scope_type)
                .unwrap_or(ck3_scope::ScopeType::Unknown);
            // `Unknown` scopes resolve every link, which must not silence
            // the tables; fall back to "is this a link anywhere" there.
            let is_link = if matches!(scope, ck3_scope::ScopeType::Unknown | ck3_scope::ScopeType::Any)
            {
                links::is_link_from_any_scope(key)
            } else {
                links::resolve_link(scope, key).is_some()
            };
            if is_link {
                continue;
            }

            match context_of(ast, id, ctx.file_kind) {
                BlockContext::Trigger => check_trigger_name(node, key, ctx, &mut out),
                BlockContext::Effect => check_effect_name(node, key, ctx, &mut out),
                BlockContext::Unknown => {}
            }
        }
        out
    }
}

fn check_trigger_name(
    node: &ck3_ast::Node,
    key: &str,
    ctx: &ValidationContext<'_>,
    out: &mut Vec<Diagnostic>,
) {
    if ck3_tables::is_trigger(key)
        || !ctx.index.lookup(SymbolCategory::ScriptedTriggers, key).is_empty()
        || !ctx.index.lookup(SymbolCategory::ScriptValues, key).is_empty()
    {
        return;
    }
    if ck3_tables::is_effect(key) {
        out.push(Diagnostic::new(
            node.key_range,
            Severity::Error,
            codes::EFFECT_IN_TRIGGER,
            SOURCE,
            format!("'{key}' is an effect; only triggers are allowed here"),
        ));
        return;
    }
    let mut diagnostic = Diagnostic::new(
        node.key_range,
        Severity::Error,
        codes::UNKNOWN_TRIGGER,
        SOURCE,
        format!("unknown trigger '{key}'"),
    );
    if let Some(suggestion) = ck3_tables::suggest_trigger(key) {
        diagnostic.message.push_str(&format!("; did you mean '{suggestion}'?"));
        diagnostic = diagnostic.with_replacement(suggestion);
    }
    out.push(diagnostic);
}

fn check_effect_name(
    node: &ck3_ast::Node,
    key: &str,
    ctx: &ValidationContext<'_>,
    out: &mut Vec<Diagnostic>,
) {
    if ck3_tables::is_effect(key)
        || !ctx.index.lookup(SymbolCategory::ScriptedEffects, key).is_empty()
    {
        return;
    }
    let mut diagnostic = Diagnostic::new(
        node.key_range,
        Severity::Error,
        codes::UNKNOWN_EFFECT,
        SOURCE,
        if ck3_tables::is_trigger(key) {
            format!("'{key}' is a trigger, not an effect")
        } else {
            format!("unknown effect '{key}'")
        },
    );
    if !ck3_tables::is_trigger(key) {
        if let Some(suggestion) = ck3_tables::suggest_effect(key) {
            diagnostic.message.push_str(&format!("; did you mean '{suggestion}'?"));
            diagnostic = diagnostic.with_replacement(suggestion);
        }
    }
    out.push(diagnostic);
}

/// Single-segment bare identifier: no dots, no `scope:`/`var:` prefixes, not
/// numeric.
fn is_plain_name(key: &str) -> bool {
    !key.is_empty()
        && !key.contains('.')
        && !key.contains(':')
        && !key.contains('$')
        && !key.contains('@')
        && !key.bytes().next().is_some_and(|b| b.is_ascii_digit() || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use ck3_index::{Contribution, DocumentIndex, FileKind};
    use ck3_parser::parse;
    use ck3_schema::SchemaSet;

    fn run_with_index(source: &str, index: &DocumentIndex) -> Vec<Diagnostic> {
        let outcome = parse(source);
        let schemas = SchemaSet::from_sources(&[]).unwrap_or_else(|_| unreachable!());
        let ctx = ValidationContext {
            uri: "file:///events/test.txt",
            path: "events/test.txt",
            file_kind: FileKind::Events,
            index,
            schemas: &schemas,
            source,
        };
        LanguageValidator.validate(&outcome.ast, &ctx)
    }

    fn run(source: &str) -> Vec<Diagnostic> {
        run_with_index(source, &DocumentIndex::new())
    }

    #[test]
    fn typo_in_trigger_gets_suggestion() {
        let diagnostics = run("x.1 = { trigger = { has_trate = yes } }");
        let unknown: Vec<_> =
            diagnostics.iter().filter(|d| d.code == codes::UNKNOWN_TRIGGER).collect();
        assert_eq!(unknown.len(), 1);
        assert!(unknown[0].message.contains("has_trait"));
        assert_eq!(
            unknown[0].data.as_ref().and_then(|d| d["replacement"].as_str()),
            Some("has_trait")
        );
    }

    #[test]
    fn effect_in_trigger_block_is_ck3102() {
        let diagnostics = run("x.1 = { trigger = { add_gold = 10 } }");
        assert!(diagnostics.iter().any(|d| d.code == codes::EFFECT_IN_TRIGGER));
    }

    #[test]
    fn unknown_effect_is_ck3103() {
        let diagnostics = run("x.1 = { immediate = { add_goldd = 10 } }");
        let unknown: Vec<_> =
            diagnostics.iter().filter(|d| d.code == codes::UNKNOWN_EFFECT).collect();
        assert_eq!(unknown.len(), 1);
        assert!(unknown[0].message.contains("add_gold"));
    }

    #[test]
    fn scripted_names_from_the_index_are_known() {
        let index = DocumentIndex::new();
        index.replace(
            "file:///common/scripted_effects/fx.txt",
            vec![Contribution {
                category: ck3_index::SymbolCategory::ScriptedEffects,
                name: "grant_boon".into(),
                range: ck3_ast::Range::on_line(0, 0, 10),
                attributes: Vec::new(),
            }],
        );
        let diagnostics = run_with_index("x.1 = { immediate = { grant_boon = yes } }", &index);
        assert!(diagnostics.iter().all(|d| d.code != codes::UNKNOWN_EFFECT));
    }

    #[test]
    fn structural_and_control_keys_are_quiet() {
        let diagnostics = run(
            "x.1 = { option = { name = a if = { limit = { is_adult = yes } add_gold = 5 } } }",
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn links_used_as_blocks_are_quiet() {
        let diagnostics = run("x.1 = { immediate = { liege = { add_gold = 5 } } }");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }
}
