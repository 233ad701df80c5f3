//! Bridge from the schema engine's diagnostics to the wire model.

use crate::context::ValidationContext;
use crate::{Diagnostic, Severity, Validate};
use ck3_ast::ScriptAst;
use ck3_schema::SchemaSeverity;

const SOURCE: &str = "ck3-schema";

pub struct SchemaValidator;

impl Validate for SchemaValidator {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn validate(&self, ast: &ScriptAst, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        ctx.schemas
            .validate_file(ctx.path, ast)
            .into_iter()
            .map(|d| {
                Diagnostic::new(d.range, map_severity(d.severity), d.code, SOURCE, d.message)
            })
            .collect()
    }
}

fn map_severity(severity: SchemaSeverity) -> Severity {
    match severity {
        SchemaSeverity::Error => Severity::Error,
        SchemaSeverity::Warning => Severity::Warning,
        SchemaSeverity::Info => Severity::Information,
        SchemaSeverity::Hint => Severity::Hint,
    }
}
