//! Diagnostic model and orchestrator.
//!
//! Every validator is additive: it receives the AST plus a read-only context
//! (index, schemas, file kind) and returns a list of diagnostics, never
//! raising to the caller. The orchestrator runs a fixed registry of
//! validators and splits the output into a *syntax* stage (parse errors,
//! publishable immediately) and a *semantic* stage (everything else).

#![deny(unsafe_code)]

pub mod codes;
pub mod context;
pub mod orchestrator;
pub mod validators;

pub use context::{BlockContext, ValidationContext, context_of};
pub use orchestrator::{DiagnosticOrchestrator, StagedDiagnostics};

use ck3_ast::Range;
use serde::Serialize;

/// LSP diagnostic severity values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

impl Serialize for Severity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(match self {
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Information => 3,
            Severity::Hint => 4,
        })
    }
}

/// Related location attached to a diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedInformation {
    pub location: WireLocation,
    pub message: String,
}

/// `{uri, range}` pair in wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireLocation {
    pub uri: String,
    pub range: Range,
}

/// One diagnostic in LSP wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub range: Range,
    pub severity: Severity,
    pub code: String,
    /// Producing component (`ck3-parse`, `ck3-scope`, `ck3-schema`, ...).
    pub source: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_information: Option<Vec<RelatedInformation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<u8>>,
    /// Machine-readable payload for code actions (e.g. a replacement name).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Diagnostic {
    /// Build a plain diagnostic.
    pub fn new(
        range: Range,
        severity: Severity,
        code: impl Into<String>,
        source: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            range,
            severity,
            code: code.into(),
            source: source.to_string(),
            message: message.into(),
            related_information: None,
            tags: None,
            data: None,
        }
    }

    /// Attach a replacement suggestion consumed by the quick-fix provider.
    pub fn with_replacement(mut self, replacement: &str) -> Self {
        self.data = Some(serde_json::json!({ "replacement": replacement }));
        self
    }
}

/// A validator in the fixed pipeline.
pub trait Validate: Send + Sync {
    /// Short name, used for logging and timing.
    fn name(&self) -> &'static str;
    /// Produce diagnostics; must not panic on malformed trees.
    fn validate(
        &self,
        ast: &ck3_ast::ScriptAst,
        ctx: &ValidationContext<'_>,
    ) -> Vec<Diagnostic>;
}

/// Sort diagnostics into the deterministic publication order.
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        (a.range.start.line, a.range.start.character, a.code.as_str()).cmp(&(
            b.range.start.line,
            b.range.start.character,
            b.code.as_str(),
        ))
    });
}
