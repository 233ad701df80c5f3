//! Declarative schema engine.
//!
//! Validation, completion, hover documentation, and document outlines for
//! whole block families (events, on-actions, scripted effects, ...) are
//! driven from YAML schema files bundled with the server rather than
//! per-field code. One compiled schema serves all four consumers from the
//! same walk.

#![deny(unsafe_code)]

pub mod engine;
pub mod expr;
pub mod model;

pub use engine::{
    CompiledField, CompiledFields, CompiledSchema, FieldCompletion, OutlineItem, SchemaDiagnostic,
    SchemaLoadError, SchemaSet, SchemaSeverity, field_completions,
};
pub use expr::{Expr, FieldFacts, Tri};
pub use model::{FieldDoc, FieldRecord, FieldType, SchemaRecord};

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use ck3_parser::parse;

    const EVENT_PATH: &str = "mod/events/test_events.txt";

    fn bundled() -> SchemaSet {
        SchemaSet::load_bundled()
    }

    #[test]
    fn bundled_schemas_load() {
        let set = bundled();
        assert_eq!(set.schemas().len(), 5);
        assert!(set.schema_for_block(EVENT_PATH, "my_mod.0001").is_some());
        assert!(set.schema_for_block("mod/common/scripted_effects/fx.txt", "my_fx").is_some());
        assert!(set.schema_for_block("mod/gui/window.gui", "anything").is_none());
    }

    #[test]
    fn well_formed_event_passes() {
        let source = "my_mod.0001 = {\n\
                      \ttype = character_event\n\
                      \ttitle = my_mod.0001.t\n\
                      \tdesc = my_mod.0001.desc\n\
                      \toption = { name = my_mod.0001.a }\n\
                      }\n";
        let outcome = parse(source);
        let diagnostics = bundled().validate_file(EVENT_PATH, &outcome.ast);
        assert_eq!(diagnostics, vec![]);
    }

    #[test]
    fn bad_event_type_is_flagged() {
        let outcome = parse("my_mod.0001 = { type = chraacter_event\n option = { name = a } }");
        let diagnostics = bundled().validate_file(EVENT_PATH, &outcome.ast);
        assert!(diagnostics.iter().any(|d| d.code == "CK3401" && d.message.contains("chraacter_event")));
    }

    #[test]
    fn visible_event_without_option_warns() {
        let outcome = parse("my_mod.0002 = { type = character_event }");
        let diagnostics = bundled().validate_file(EVENT_PATH, &outcome.ast);
        assert!(diagnostics.iter().any(|d| d.code == "CK3410"));
    }

    #[test]
    fn hidden_event_without_option_is_fine() {
        let outcome =
            parse("my_mod.0003 = { hidden = yes\n immediate = { add_gold = 5 } }");
        let diagnostics = bundled().validate_file(EVENT_PATH, &outcome.ast);
        assert!(!diagnostics.iter().any(|d| d.code == "CK3410"));
    }

    #[test]
    fn unknown_event_field_warns() {
        let outcome = parse("my_mod.0004 = { optoin = { name = a } option = { name = b } }");
        let diagnostics = bundled().validate_file(EVENT_PATH, &outcome.ast);
        assert!(diagnostics
            .iter()
            .any(|d| d.code == "CK3405" && d.message.contains("optoin")));
    }

    #[test]
    fn option_requires_name() {
        let outcome = parse("my_mod.0005 = { option = { add_gold = 10 } }");
        let diagnostics = bundled().validate_file(EVENT_PATH, &outcome.ast);
        assert!(diagnostics.iter().any(|d| d.code == "CK3404"));
    }

    #[test]
    fn occurrence_limits_are_enforced() {
        let outcome = parse(
            "my_mod.0006 = { type = character_event\n type = letter_event\n option = { name = a } }",
        );
        let diagnostics = bundled().validate_file(EVENT_PATH, &outcome.ast);
        assert!(diagnostics.iter().any(|d| d.message.contains("at most 1")));
    }

    #[test]
    fn trigger_must_be_a_block() {
        let outcome = parse("my_mod.0007 = { trigger = yes option = { name = a } }");
        let diagnostics = bundled().validate_file(EVENT_PATH, &outcome.ast);
        assert!(diagnostics.iter().any(|d| d.message.contains("expects a block")));
    }

    #[test]
    fn completions_skip_exhausted_fields() {
        let outcome = parse("my_mod.0008 = { type = character_event option = { name = a } }");
        let ast = &outcome.ast;
        let set = bundled();
        let schema = set.schema_for_block(EVENT_PATH, "my_mod.0008").unwrap();
        let block = ast.children(ast.root())[0];
        let completions = field_completions(&schema.top, ast, block);
        let names: Vec<&str> = completions.iter().map(|c| c.name.as_str()).collect();
        // `type` is at its max, `option` is repeatable, `trigger` is absent.
        assert!(!names.contains(&"type"));
        assert!(names.contains(&"option"));
        assert!(names.contains(&"trigger"));
    }

    #[test]
    fn doc_paths_resolve_nested_fields() {
        let set = bundled();
        let schema = set.schema_for_block(EVENT_PATH, "my_mod.0009").unwrap();
        let field = schema.doc_for_path(&["option", "name"]).unwrap();
        assert!(field.record.doc.as_ref().is_some_and(|d| !d.description.is_empty()));
        assert!(schema.doc_for_path(&["option", "no_such"]).is_none());
    }

    #[test]
    fn outline_follows_the_recipe() {
        let source = "my_mod.0010 = {\n\
                      \ttype = character_event\n\
                      \toption = { name = my_mod.0010.a }\n\
                      \toption = { name = my_mod.0010.b }\n\
                      }\n";
        let outcome = parse(source);
        let ast = &outcome.ast;
        let set = bundled();
        let schema = set.schema_for_block(EVENT_PATH, "my_mod.0010").unwrap();
        let block = ast.children(ast.root())[0];
        let outline = schema.outline(ast, block).unwrap();
        assert_eq!(outline.name, "my_mod.0010");
        assert_eq!(outline.kind, "event");
        let option_children: Vec<_> =
            outline.children.iter().filter(|c| c.name == "option").collect();
        assert_eq!(option_children.len(), 2);
        assert_eq!(option_children[0].detail.as_deref(), Some("my_mod.0010.a"));
    }

    #[test]
    fn on_action_rule_fires_on_empty_hookup() {
        let outcome = parse("on_birthday_stub = { trigger = { is_adult = yes } }");
        let diagnostics =
            bundled().validate_file("mod/common/on_action/my_actions.txt", &outcome.ast);
        assert!(diagnostics.iter().any(|d| d.code == "CK3421"));
    }

    #[test]
    fn scripted_effect_bodies_are_free_form() {
        let outcome = parse("my_fx = { add_gold = 5 whatever_custom = yes }");
        let diagnostics =
            bundled().validate_file("mod/common/scripted_effects/fx.txt", &outcome.ast);
        assert_eq!(diagnostics, vec![]);
    }
}
