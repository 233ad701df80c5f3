//! The fixed diagnostic pipeline with staged output.

use crate::context::ValidationContext;
use crate::{Diagnostic, Severity, Validate, sort_diagnostics, validators};
use ck3_parser::ParseOutcome;

/// Diagnostics split for staged publication: `syntax` goes out first, then
/// `combined` (a non-strict superset) replaces it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StagedDiagnostics {
    /// Parse-stage diagnostics (source `ck3-parse`).
    pub syntax: Vec<Diagnostic>,
    /// Syntax plus everything semantic, in publication order.
    pub combined: Vec<Diagnostic>,
}

/// Runs the registry of validators in fixed order.
pub struct DiagnosticOrchestrator {
    validators: Vec<Box<dyn Validate>>,
}

impl Default for DiagnosticOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticOrchestrator {
    /// Build the orchestrator with the standard validator registry.
    pub fn new() -> Self {
        Self { validators: validators::registry() }
    }

    /// Syntax-stage diagnostics only (cheap; no validators run).
    pub fn syntax_stage(&self, parse: &ParseOutcome) -> Vec<Diagnostic> {
        let mut syntax: Vec<Diagnostic> = parse
            .errors
            .iter()
            .map(|e| {
                Diagnostic::new(e.range, Severity::Error, e.code, "ck3-parse", e.message.clone())
            })
            .collect();
        sort_diagnostics(&mut syntax);
        syntax
    }

    /// Run the full pipeline. `should_cancel` is polled between validators;
    /// on cancellation the partial result is returned with `cancelled` left
    /// to the caller to detect via the flag.
    pub fn run(
        &self,
        parse: &ParseOutcome,
        ctx: &ValidationContext<'_>,
        should_cancel: &dyn Fn() -> bool,
    ) -> StagedDiagnostics {
        let syntax = self.syntax_stage(parse);
        let mut combined = syntax.clone();

        for validator in &self.validators {
            if should_cancel() {
                break;
            }
            combined.extend(validator.validate(&parse.ast, ctx));
        }

        sort_diagnostics(&mut combined);
        StagedDiagnostics { syntax, combined }
    }
}
