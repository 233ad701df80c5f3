//! Serde data model for schema YAML files.
//!
//! A schema identifies the files and top-level blocks it governs (path globs
//! plus a key regex), then declares a field map, nested block schemas,
//! cross-field rules, per-field documentation, an outline recipe, and a
//! code-lens recipe. Unknown YAML keys are tolerated (and logged) so newer
//! schema files keep loading on older servers.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Root of one schema YAML document.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaRecord {
    /// Schema name, used in logs and as the diagnostic source suffix.
    pub name: String,
    /// File/block identification predicate.
    #[serde(rename = "match")]
    pub matcher: MatcherRecord,
    /// Named reusable value sets.
    #[serde(default)]
    pub constants: BTreeMap<String, Vec<String>>,
    /// Field map for the governed block.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldRecord>,
    /// Schemas for nested block fields, referenced by name from `fields`.
    #[serde(default)]
    pub nested_schemas: BTreeMap<String, NestedSchemaRecord>,
    /// Cross-field validation rules.
    #[serde(default)]
    pub rules: Vec<RuleRecord>,
    /// Outline recipe.
    #[serde(default)]
    pub symbols: Option<SymbolsRecord>,
    /// Code-lens recipe.
    #[serde(default)]
    pub code_lens: Option<CodeLensRecord>,
    /// Whether keys absent from `fields` are flagged.
    #[serde(default)]
    pub allow_unknown_fields: bool,
    /// Diagnostic code for unexpected fields (when not allowed).
    #[serde(default)]
    pub unknown_field_code: Option<String>,
}

/// Path globs + top-level key regex identifying governed blocks.
#[derive(Debug, Clone, Deserialize)]
pub struct MatcherRecord {
    /// Workspace-relative globs, e.g. `**/events/*.txt`.
    pub path_globs: Vec<String>,
    /// Regex the top-level block key must match, anchored by the loader.
    #[serde(default)]
    pub key_pattern: Option<String>,
}

/// One field declaration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FieldRecord {
    /// Value shape; see [`FieldType`].
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    /// Field must be present.
    #[serde(default)]
    pub required: bool,
    /// Field must be present when this predicate holds.
    #[serde(default)]
    pub required_when: Option<String>,
    /// Minimum occurrences (0 = optional).
    #[serde(default)]
    pub min: Option<u32>,
    /// Maximum occurrences (absent = unbounded).
    #[serde(default)]
    pub max: Option<u32>,
    /// Inline enum values.
    #[serde(default)]
    pub values: Vec<String>,
    /// Enum values pulled from a named constant set.
    #[serde(default)]
    pub values_from: Option<String>,
    /// Nested schema name for block fields.
    #[serde(default)]
    pub schema: Option<String>,
    /// Diagnostic code for violations on this field.
    #[serde(default)]
    pub code: Option<String>,
    /// Default value shown in completion snippets.
    #[serde(default)]
    pub default: Option<String>,
    /// Severity override (`error`, `warning`, `info`, `hint`).
    #[serde(default)]
    pub severity: Option<String>,
    /// Hover documentation and completion snippet.
    #[serde(default)]
    pub doc: Option<FieldDoc>,
}

/// Value shape of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Any scalar.
    #[default]
    Scalar,
    /// `yes` or `no`.
    Bool,
    /// A decimal number.
    Number,
    /// A bare identifier.
    Identifier,
    /// A quoted string.
    String,
    /// An identifier expected to have a localization entry.
    LocalizationKey,
    /// A scalar drawn from an enum set.
    Enum,
    /// A block validated against a nested schema.
    Block,
    /// A block of triggers; contents are the scope validator's business.
    TriggerBlock,
    /// A block of effects; contents are the scope validator's business.
    EffectBlock,
    /// Scalar or block both accepted, contents unvalidated.
    Any,
}

/// Nested schema: a field map plus rules, without its own matcher.
#[derive(Debug, Clone, Deserialize)]
pub struct NestedSchemaRecord {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldRecord>,
    #[serde(default)]
    pub rules: Vec<RuleRecord>,
    #[serde(default)]
    pub allow_unknown_fields: bool,
    #[serde(default)]
    pub unknown_field_code: Option<String>,
}

/// One cross-field rule. The rule fires (produces a diagnostic) when `when`
/// holds (or is omitted) and `require` evaluates to definitely-false.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleRecord {
    /// Rule name for logs.
    pub name: String,
    /// Guard predicate; omitted means always.
    #[serde(default)]
    pub when: Option<String>,
    /// Requirement predicate.
    pub require: String,
    /// Diagnostic code.
    pub code: String,
    /// Diagnostic message.
    pub message: String,
    /// Severity override.
    #[serde(default)]
    pub severity: Option<String>,
}

/// Hover documentation entry for a field.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FieldDoc {
    /// One-line description.
    #[serde(default)]
    pub description: String,
    /// Longer detail, markdown.
    #[serde(default)]
    pub detail: Option<String>,
    /// Completion snippet template (`$1`, `${1:placeholder}` tab stops).
    #[serde(default)]
    pub snippet: Option<String>,
}

/// Outline recipe: the top-level block becomes the primary symbol; listed
/// child fields become nested symbols.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolsRecord {
    /// LSP symbol kind name for the primary symbol (e.g. `event`, `function`).
    pub kind: String,
    /// Child fields to surface, with their own kinds.
    #[serde(default)]
    pub children: Vec<SymbolChildRecord>,
}

/// One child entry of the outline recipe.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolChildRecord {
    /// Field key to surface.
    pub field: String,
    /// LSP symbol kind name.
    pub kind: String,
}

/// Code-lens recipe.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CodeLensRecord {
    /// Show reference counts above each governed block.
    #[serde(default)]
    pub reference_counts: bool,
    /// Fields whose values are localization keys; a lens flags missing ones.
    #[serde(default)]
    pub missing_localization: Vec<String>,
}
