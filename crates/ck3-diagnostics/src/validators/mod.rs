//! The validator registry.
//!
//! Order is fixed and mirrors the publication pipeline: scope and language
//! checks first (they anchor most quick fixes), then schema, then the domain
//! validators, then style and conventions.

pub mod conventions;
pub mod events;
pub mod iterators;
pub mod language;
pub mod localization;
pub mod schema;
pub mod scope;
pub mod script_values;
pub mod scripted;
pub mod style;
pub mod timing;
pub mod variables;

use crate::Validate;

/// Build the fixed validator pipeline.
pub fn registry() -> Vec<Box<dyn Validate>> {
    vec![
        Box::new(scope::ScopeValidator),
        Box::new(language::LanguageValidator),
        Box::new(schema::SchemaValidator),
        Box::new(events::EventsValidator),
        Box::new(iterators::IteratorsValidator),
        Box::new(localization::LocalizationValidator),
        Box::new(script_values::ScriptValuesValidator),
        Box::new(scripted::ScriptedBlocksValidator),
        Box::new(variables::VariablesValidator),
        Box::new(style::StyleValidator),
        Box::new(conventions::ConventionsValidator),
        Box::new(timing::ScopeTimingValidator),
    ]
}

/// Saved-scope names defined anywhere inside `block` (one top-level body).
pub(crate) fn saved_scopes_in(
    ast: &ck3_ast::ScriptAst,
    block: ck3_ast::NodeId,
) -> std::collections::HashSet<String> {
    let mut names = std::collections::HashSet::new();
    let mut stack = vec![block];
    while let Some(id) = stack.pop() {
        for &child in ast.children(id) {
            let node = ast.node(child);
            if node.is_block() {
                stack.push(child);
            } else if matches!(node.key.as_str(), "save_scope_as" | "save_temporary_scope_as") {
                if let Some(scalar) = node.scalar() {
                    names.insert(scalar.text.clone());
                }
            }
        }
    }
    names
}
