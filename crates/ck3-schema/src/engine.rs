//! Schema loading, matching, and evaluation.
//!
//! Schemas are compiled once at startup: globs become a `GlobSet`, key
//! patterns become anchored regexes, and every rule / `required_when`
//! predicate is parsed into the expression AST. Evaluation is one walk per
//! governed top-level block and feeds four consumers - diagnostics,
//! completions, hover docs, and the outline - from the same compiled data.

use crate::expr::{self, Expr, FieldFacts, Tri};
use crate::model::{
    CodeLensRecord, FieldDoc, FieldRecord, FieldType, NestedSchemaRecord, RuleRecord,
    SchemaRecord, SymbolsRecord,
};
use ck3_ast::{NodeId, NodeType, Range, ScriptAst};
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use std::collections::BTreeMap;
use thiserror::Error;

/// Severity of a schema diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaSeverity {
    Error,
    Warning,
    Info,
    Hint,
}

impl SchemaSeverity {
    fn from_name(name: Option<&str>, default: SchemaSeverity) -> SchemaSeverity {
        match name {
            Some("error") => SchemaSeverity::Error,
            Some("warning") => SchemaSeverity::Warning,
            Some("info") => SchemaSeverity::Info,
            Some("hint") => SchemaSeverity::Hint,
            _ => default,
        }
    }
}

/// One diagnostic produced by schema evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDiagnostic {
    pub range: Range,
    pub code: String,
    pub message: String,
    pub severity: SchemaSeverity,
}

/// A schema file that failed to load.
#[derive(Debug, Error)]
pub enum SchemaLoadError {
    #[error("yaml error in {name}: {source}")]
    Yaml {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("bad glob '{glob}' in {name}: {source}")]
    Glob {
        name: String,
        glob: String,
        #[source]
        source: globset::Error,
    },
    #[error("bad key pattern in {name}: {source}")]
    KeyPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
    #[error("bad expression '{expr}' in {name}: {source}")]
    Expr {
        name: String,
        expr: String,
        #[source]
        source: expr::ExprError,
    },
}

/// A compiled field map shared by top-level and nested schemas.
pub struct CompiledFields {
    pub fields: BTreeMap<String, CompiledField>,
    pub rules: Vec<CompiledRule>,
    pub allow_unknown: bool,
    pub unknown_code: Option<String>,
}

/// One compiled field.
pub struct CompiledField {
    pub record: FieldRecord,
    pub required_when: Option<Expr>,
    /// Enum values with `values_from` constants resolved.
    pub enum_values: Vec<String>,
}

/// One compiled cross-field rule.
pub struct CompiledRule {
    pub name: String,
    pub when: Option<Expr>,
    pub require: Expr,
    pub code: String,
    pub message: String,
    pub severity: SchemaSeverity,
}

/// A fully compiled schema.
pub struct CompiledSchema {
    pub name: String,
    globs: GlobSet,
    key_regex: Option<Regex>,
    pub top: CompiledFields,
    pub nested: BTreeMap<String, CompiledFields>,
    pub symbols: Option<SymbolsRecord>,
    pub code_lens: CodeLensRecord,
}

impl CompiledSchema {
    /// Whether this schema governs files at `path`.
    pub fn matches_path(&self, path: &str) -> bool {
        let normalized = path.replace('\\', "/");
        self.globs.is_match(normalized.as_str())
    }

    /// Whether this schema governs a top-level block keyed `key`.
    pub fn matches_key(&self, key: &str) -> bool {
        match &self.key_regex {
            Some(regex) => regex.is_match(key),
            None => true,
        }
    }

    /// Validate one governed top-level block.
    pub fn validate(&self, ast: &ScriptAst, block: NodeId) -> Vec<SchemaDiagnostic> {
        let mut out = Vec::new();
        validate_fields(&self.top, &self.nested, ast, block, &mut out);
        out
    }

    /// Resolve the field documentation for a key path below the block
    /// (e.g. `["option", "name"]`).
    pub fn doc_for_path(&self, path: &[&str]) -> Option<&CompiledField> {
        let mut fields = &self.top;
        let mut found: Option<&CompiledField> = None;
        for (i, key) in path.iter().enumerate() {
            let field = fields.fields.get(*key)?;
            found = Some(field);
            if i + 1 < path.len() {
                let nested_name = field.record.schema.as_deref()?;
                fields = self.nested.get(nested_name)?;
            }
        }
        found
    }

    /// The compiled field map for a key path ending at a block field, used
    /// for completions inside that block. An empty path means the top level.
    pub fn fields_for_path(&self, path: &[&str]) -> Option<&CompiledFields> {
        let mut fields = &self.top;
        for key in path {
            let field = fields.fields.get(*key)?;
            match field.record.field_type {
                FieldType::Block => {
                    let nested_name = field.record.schema.as_deref()?;
                    fields = self.nested.get(nested_name)?;
                }
                // Free-form trigger/effect blocks have no schema fields.
                _ => return None,
            }
        }
        Some(fields)
    }

    /// Build the outline item for one governed block per the symbols recipe.
    pub fn outline(&self, ast: &ScriptAst, block: NodeId) -> Option<OutlineItem> {
        let recipe = self.symbols.as_ref()?;
        let node = ast.node(block);
        let mut children = Vec::new();
        for child_recipe in &recipe.children {
            for child in ast.child_assignments(block, &child_recipe.field) {
                let child_node = ast.node(child);
                let detail = child_node.scalar().map(|s| s.text.clone()).or_else(|| {
                    ast.scalar_of(child, "name").map(str::to_string)
                });
                children.push(OutlineItem {
                    name: child_node.key.clone(),
                    detail,
                    kind: child_recipe.kind.clone(),
                    range: child_node.range,
                    selection_range: child_node.key_range,
                    children: Vec::new(),
                });
            }
        }
        Some(OutlineItem {
            name: node.key.clone(),
            detail: ast.scalar_of(block, "type").map(str::to_string),
            kind: recipe.kind.clone(),
            range: node.range,
            selection_range: node.key_range,
            children,
        })
    }
}

/// One document-outline entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineItem {
    pub name: String,
    pub detail: Option<String>,
    /// Symbol kind name from the recipe (`event`, `function`, `field`, ...).
    pub kind: String,
    pub range: Range,
    pub selection_range: Range,
    pub children: Vec<OutlineItem>,
}

/// A field proposal for completion.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCompletion {
    pub name: String,
    pub detail: Option<String>,
    pub documentation: Option<String>,
    pub snippet: Option<String>,
}

/// Fields still proposable in `block`: absent fields plus repeatable ones
/// below their max occurrence count.
pub fn field_completions(
    fields: &CompiledFields,
    ast: &ScriptAst,
    block: NodeId,
) -> Vec<FieldCompletion> {
    let facts = BlockFacts { ast, block };
    let mut out = Vec::new();
    for (name, field) in &fields.fields {
        let count = facts.count(name);
        let max = field.record.max.unwrap_or(u32::MAX);
        if count >= max {
            continue;
        }
        let doc = field.record.doc.as_ref();
        out.push(FieldCompletion {
            name: name.clone(),
            detail: doc.and_then(|d| d.detail.clone()),
            documentation: doc.map(|d| d.description.clone()).filter(|s| !s.is_empty()),
            snippet: completion_snippet(name, field, doc),
        });
    }
    out
}

fn completion_snippet(
    name: &str,
    field: &CompiledField,
    doc: Option<&FieldDoc>,
) -> Option<String> {
    if let Some(snippet) = doc.and_then(|d| d.snippet.clone()) {
        return Some(snippet);
    }
    Some(match field.record.field_type {
        FieldType::Block | FieldType::TriggerBlock | FieldType::EffectBlock => {
            format!("{name} = {{\n\t$0\n}}")
        }
        FieldType::Bool => format!("{name} = ${{1|yes,no|}}"),
        FieldType::Enum => {
            let default = field
                .record
                .default
                .clone()
                .or_else(|| field.enum_values.first().cloned())
                .unwrap_or_default();
            format!("{name} = ${{1:{default}}}")
        }
        _ => match &field.record.default {
            Some(default) => format!("{name} = ${{1:{default}}}"),
            None => format!("{name} = $0"),
        },
    })
}

// ----------------------------------------------------------------------
// Field facts over an AST block
// ----------------------------------------------------------------------

struct BlockFacts<'a> {
    ast: &'a ScriptAst,
    block: NodeId,
}

impl FieldFacts for BlockFacts<'_> {
    fn count(&self, field: &str) -> u32 {
        self.ast.child_assignments(self.block, field).count() as u32
    }
    fn value(&self, field: &str) -> Option<String> {
        self.ast.scalar_of(self.block, field).map(str::to_string)
    }
}

const DEFAULT_FIELD_CODE: &str = "CK3400";

fn validate_fields(
    fields: &CompiledFields,
    nested: &BTreeMap<String, CompiledFields>,
    ast: &ScriptAst,
    block: NodeId,
    out: &mut Vec<SchemaDiagnostic>,
) {
    let facts = BlockFacts { ast, block };
    let block_node = ast.node(block);

    for (name, field) in &fields.fields {
        let count = facts.count(name);
        let code =
            field.record.code.clone().unwrap_or_else(|| DEFAULT_FIELD_CODE.to_string());
        let severity =
            SchemaSeverity::from_name(field.record.severity.as_deref(), SchemaSeverity::Error);

        let min = field.record.min.unwrap_or(if field.record.required { 1 } else { 0 });
        if count < min {
            out.push(SchemaDiagnostic {
                range: block_node.key_range,
                code: code.clone(),
                message: format!("missing required field '{name}'"),
                severity,
            });
        } else if count == 0 {
            if let Some(when) = &field.required_when {
                if when.eval(&facts) == Tri::True {
                    out.push(SchemaDiagnostic {
                        range: block_node.key_range,
                        code: code.clone(),
                        message: format!("field '{name}' is required here"),
                        severity,
                    });
                }
            }
        }
        if let Some(max) = field.record.max {
            if count > max {
                // Flag the occurrences past the limit.
                for extra in ast.child_assignments(block, name).skip(max as usize) {
                    out.push(SchemaDiagnostic {
                        range: ast.node(extra).key_range,
                        code: code.clone(),
                        message: format!("field '{name}' may appear at most {max} time(s)"),
                        severity,
                    });
                }
            }
        }

        for occurrence in ast.child_assignments(block, name) {
            validate_field_value(field, &code, nested, ast, occurrence, out);
        }
    }

    if !fields.allow_unknown {
        let unknown_code =
            fields.unknown_code.clone().unwrap_or_else(|| DEFAULT_FIELD_CODE.to_string());
        for &child in ast.children(block) {
            let child_node = ast.node(child);
            if child_node.node_type != NodeType::Assignment {
                continue;
            }
            if !fields.fields.contains_key(&child_node.key) {
                out.push(SchemaDiagnostic {
                    range: child_node.key_range,
                    code: unknown_code.clone(),
                    message: format!("unexpected field '{}'", child_node.key),
                    severity: SchemaSeverity::Warning,
                });
            }
        }
    }

    for rule in &fields.rules {
        let applies = rule.when.as_ref().map(|w| w.eval(&facts)).unwrap_or(Tri::True);
        if applies == Tri::True && rule.require.eval(&facts) == Tri::False {
            out.push(SchemaDiagnostic {
                range: block_node.key_range,
                code: rule.code.clone(),
                message: rule.message.clone(),
                severity: rule.severity,
            });
        }
    }
}

fn validate_field_value(
    field: &CompiledField,
    code: &str,
    nested: &BTreeMap<String, CompiledFields>,
    ast: &ScriptAst,
    occurrence: NodeId,
    out: &mut Vec<SchemaDiagnostic>,
) {
    let node = ast.node(occurrence);
    let severity =
        SchemaSeverity::from_name(field.record.severity.as_deref(), SchemaSeverity::Error);
    let mut wrong_type = |message: String, range: Range, out: &mut Vec<SchemaDiagnostic>| {
        out.push(SchemaDiagnostic { range, code: code.to_string(), message, severity });
    };

    match field.record.field_type {
        FieldType::Block | FieldType::TriggerBlock | FieldType::EffectBlock => {
            if !node.is_block() {
                wrong_type(
                    format!("field '{}' expects a block value", node.key),
                    node.key_range,
                    out,
                );
                return;
            }
            if field.record.field_type == FieldType::Block {
                if let Some(nested_fields) =
                    field.record.schema.as_deref().and_then(|n| nested.get(n))
                {
                    validate_fields(nested_fields, nested, ast, occurrence, out);
                }
            }
        }
        FieldType::Any => {}
        scalar_type => {
            let Some(scalar) = node.scalar() else {
                if node.is_block() && scalar_type != FieldType::Scalar {
                    wrong_type(
                        format!("field '{}' expects a scalar value", node.key),
                        node.key_range,
                        out,
                    );
                }
                return;
            };
            match scalar_type {
                FieldType::Bool => {
                    if scalar.text != "yes" && scalar.text != "no" {
                        wrong_type(
                            format!("field '{}' expects yes or no", node.key),
                            scalar.range,
                            out,
                        );
                    }
                }
                FieldType::Number => {
                    if scalar.text.parse::<f64>().is_err() {
                        wrong_type(
                            format!("field '{}' expects a number", node.key),
                            scalar.range,
                            out,
                        );
                    }
                }
                FieldType::Enum => {
                    if !field.enum_values.iter().any(|v| v == &scalar.text) {
                        wrong_type(
                            format!(
                                "'{}' is not a valid value for '{}' (expected one of: {})",
                                scalar.text,
                                node.key,
                                field.enum_values.join(", ")
                            ),
                            scalar.range,
                            out,
                        );
                    }
                }
                _ => {}
            }
        }
    }
}

// ----------------------------------------------------------------------
// Loading
// ----------------------------------------------------------------------

/// Keys recognized at the top level of a schema document; anything else is
/// ignored with a warning.
const KNOWN_TOP_KEYS: &[&str] = &[
    "name",
    "match",
    "constants",
    "fields",
    "nested_schemas",
    "rules",
    "symbols",
    "code_lens",
    "allow_unknown_fields",
    "unknown_field_code",
];

/// The loaded schema registry.
pub struct SchemaSet {
    schemas: Vec<CompiledSchema>,
}

impl SchemaSet {
    /// Load the schemas bundled with the server.
    pub fn load_bundled() -> Self {
        let sources = [
            ("event", include_str!("../data/event.yaml")),
            ("scripted_effect", include_str!("../data/scripted_effect.yaml")),
            ("scripted_trigger", include_str!("../data/scripted_trigger.yaml")),
            ("on_action", include_str!("../data/on_action.yaml")),
            ("script_value", include_str!("../data/script_value.yaml")),
        ];
        match Self::from_sources(&sources) {
            Ok(set) => set,
            Err(error) => {
                // Bundled schemas are covered by tests; a load failure here
                // means a corrupted build, so degrade to an empty registry.
                tracing::error!(%error, "failed to load bundled schemas");
                Self { schemas: Vec::new() }
            }
        }
    }

    /// Compile schemas from `(name, yaml)` pairs.
    pub fn from_sources(sources: &[(&str, &str)]) -> Result<Self, SchemaLoadError> {
        let mut schemas = Vec::new();
        for (name, yaml) in sources {
            warn_unknown_keys(name, yaml);
            let record: SchemaRecord =
                serde_yaml::from_str(yaml).map_err(|source| SchemaLoadError::Yaml {
                    name: (*name).to_string(),
                    source,
                })?;
            schemas.push(compile(record)?);
        }
        Ok(Self { schemas })
    }

    /// All compiled schemas.
    pub fn schemas(&self) -> &[CompiledSchema] {
        &self.schemas
    }

    /// The schema governing top-level blocks keyed `key` in files at `path`.
    pub fn schema_for_block(&self, path: &str, key: &str) -> Option<&CompiledSchema> {
        self.schemas.iter().find(|s| s.matches_path(path) && s.matches_key(key))
    }

    /// Schemas whose path globs match `path`.
    pub fn schemas_for_path(&self, path: &str) -> Vec<&CompiledSchema> {
        self.schemas.iter().filter(|s| s.matches_path(path)).collect()
    }

    /// Validate every governed top-level block in a file.
    pub fn validate_file(&self, path: &str, ast: &ScriptAst) -> Vec<SchemaDiagnostic> {
        let candidates = self.schemas_for_path(path);
        if candidates.is_empty() {
            return Vec::new();
        }
        let mut out = Vec::new();
        for &top in ast.children(ast.root()) {
            let node = ast.node(top);
            if node.node_type != NodeType::Assignment || !node.is_block() {
                continue;
            }
            if let Some(schema) = candidates.iter().find(|s| s.matches_key(&node.key)) {
                out.extend(schema.validate(ast, top));
            }
        }
        out
    }
}

fn warn_unknown_keys(name: &str, yaml: &str) {
    let Ok(value) = serde_yaml::from_str::<serde_yaml::Value>(yaml) else { return };
    let Some(mapping) = value.as_mapping() else { return };
    for key in mapping.keys() {
        if let Some(key) = key.as_str() {
            if !KNOWN_TOP_KEYS.contains(&key) {
                tracing::warn!(schema = name, key, "ignoring unknown schema key");
            }
        }
    }
}

fn compile(record: SchemaRecord) -> Result<CompiledSchema, SchemaLoadError> {
    let name = record.name.clone();

    let mut builder = GlobSetBuilder::new();
    for glob in &record.matcher.path_globs {
        let compiled = Glob::new(glob).map_err(|source| SchemaLoadError::Glob {
            name: name.clone(),
            glob: glob.clone(),
            source,
        })?;
        builder.add(compiled);
    }
    let globs = builder.build().map_err(|source| SchemaLoadError::Glob {
        name: name.clone(),
        glob: String::from("<set>"),
        source,
    })?;

    let key_regex = match &record.matcher.key_pattern {
        Some(pattern) => Some(
            Regex::new(&format!("^(?:{pattern})$"))
                .map_err(|source| SchemaLoadError::KeyPattern { name: name.clone(), source })?,
        ),
        None => None,
    };

    let constants = record.constants.clone();
    let top = compile_fields(
        &name,
        &record.fields,
        &record.rules,
        record.allow_unknown_fields,
        record.unknown_field_code.clone(),
        &constants,
    )?;

    let mut nested = BTreeMap::new();
    for (nested_name, nested_record) in &record.nested_schemas {
        nested.insert(
            nested_name.clone(),
            compile_nested(&name, nested_record, &constants)?,
        );
    }

    Ok(CompiledSchema {
        name,
        globs,
        key_regex,
        top,
        nested,
        symbols: record.symbols,
        code_lens: record.code_lens.unwrap_or_default(),
    })
}

fn compile_nested(
    schema_name: &str,
    record: &NestedSchemaRecord,
    constants: &BTreeMap<String, Vec<String>>,
) -> Result<CompiledFields, SchemaLoadError> {
    compile_fields(
        schema_name,
        &record.fields,
        &record.rules,
        record.allow_unknown_fields,
        record.unknown_field_code.clone(),
        constants,
    )
}

fn compile_fields(
    schema_name: &str,
    fields: &BTreeMap<String, FieldRecord>,
    rules: &[RuleRecord],
    allow_unknown: bool,
    unknown_code: Option<String>,
    constants: &BTreeMap<String, Vec<String>>,
) -> Result<CompiledFields, SchemaLoadError> {
    let mut compiled_fields = BTreeMap::new();
    for (field_name, record) in fields {
        let required_when = match &record.required_when {
            Some(source) => Some(parse_expr(schema_name, source)?),
            None => None,
        };
        let mut enum_values = record.values.clone();
        if let Some(constant) = &record.values_from {
            if let Some(values) = constants.get(constant) {
                enum_values.extend(values.iter().cloned());
            } else {
                tracing::warn!(
                    schema = schema_name,
                    field = field_name.as_str(),
                    constant = constant.as_str(),
                    "values_from references an unknown constant"
                );
            }
        }
        compiled_fields.insert(
            field_name.clone(),
            CompiledField { record: record.clone(), required_when, enum_values },
        );
    }

    let mut compiled_rules = Vec::new();
    for rule in rules {
        let when = match &rule.when {
            Some(source) => Some(parse_expr(schema_name, source)?),
            None => None,
        };
        let require = parse_expr(schema_name, &rule.require)?;
        compiled_rules.push(CompiledRule {
            name: rule.name.clone(),
            when,
            require,
            code: rule.code.clone(),
            message: rule.message.clone(),
            severity: SchemaSeverity::from_name(rule.severity.as_deref(), SchemaSeverity::Warning),
        });
    }

    Ok(CompiledFields {
        fields: compiled_fields,
        rules: compiled_rules,
        allow_unknown,
        unknown_code,
    })
}

fn parse_expr(schema_name: &str, source: &str) -> Result<Expr, SchemaLoadError> {
    expr::parse(source).map_err(|error| SchemaLoadError::Expr {
        name: schema_name.to_string(),
        expr: source.to_string(),
        source: error,
    })
}
