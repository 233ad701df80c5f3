//! `workspace/executeCommand` implementations.
//!
//! Command names and argument/result shapes are part of the editor
//! extension contract; changing them breaks shipped clients.

use crate::scanner;
use crate::state::DocumentState;
use crate::util::match_path;
use ck3_ast::{NodeType, ScriptAst};
use ck3_diagnostics::{
    Diagnostic, DiagnosticOrchestrator, Severity, ValidationContext, codes,
};
use ck3_index::{DocumentIndex, SymbolCategory, file_kind_for_path};
use ck3_lsp_protocol::methods::commands as names;
use ck3_parser::annotate::looks_like_event_id;
use ck3_pool::PriorityThreadPool;
use ck3_schema::SchemaSet;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a command may read.
pub struct CommandContext<'a> {
    pub documents: &'a Mutex<HashMap<String, DocumentState>>,
    pub index: &'a Arc<DocumentIndex>,
    pub schemas: &'a Arc<SchemaSet>,
    pub orchestrator: &'a Arc<DiagnosticOrchestrator>,
    pub pool: &'a Arc<PriorityThreadPool>,
    pub roots: &'a [PathBuf],
}

/// Dispatch one command. `Err` carries a user-facing message.
pub fn execute(ctx: &CommandContext<'_>, command: &str, args: &[Value]) -> Result<Value, String> {
    match command {
        names::VALIDATE_WORKSPACE => Ok(validate_workspace(ctx)),
        names::RESCAN_WORKSPACE => Ok(rescan_workspace(ctx)),
        names::GET_WORKSPACE_STATS => Ok(json!(ctx.index.stats())),
        names::GENERATE_EVENT_TEMPLATE => generate_event_template(args),
        names::GENERATE_LOCALIZATION_STUBS => generate_localization_stubs(ctx, args),
        names::RENAME_EVENT => Ok(rename_event(ctx, args)),
        names::FIND_ORPHANED_LOCALIZATION => Ok(find_orphaned_localization(ctx)),
        names::SHOW_NAMESPACE_EVENTS => show_namespace_events(ctx, args),
        names::CHECK_DEPENDENCIES => Ok(check_dependencies(ctx)),
        other => Err(format!("unknown command '{other}'")),
    }
}

// ----------------------------------------------------------------------
// Workspace-wide validation and scanning
// ----------------------------------------------------------------------

fn validate_workspace(ctx: &CommandContext<'_>) -> Value {
    let mut by_uri: Map<String, Value> = Map::new();

    // Open documents take precedence over their disk copies.
    let open: Vec<(String, String)> = {
        let documents = ctx.documents.lock();
        documents.iter().map(|(uri, doc)| (uri.clone(), doc.text.clone())).collect()
    };
    let mut validated: std::collections::HashSet<String> =
        open.iter().map(|(uri, _)| uri.clone()).collect();

    for (uri, text) in &open {
        let diagnostics = run_diagnostics(ctx, uri, text);
        if !diagnostics.is_empty() {
            by_uri.insert(uri.clone(), json!(diagnostics));
        }
    }

    for path in scanner::discover_files(ctx.roots) {
        let Some(uri) = crate::util::path_to_uri(&path) else { continue };
        if !validated.insert(uri.clone()) {
            continue;
        }
        let Ok(text) = std::fs::read_to_string(&path) else { continue };
        let diagnostics = run_diagnostics(ctx, &uri, &text);
        if !diagnostics.is_empty() {
            by_uri.insert(uri, json!(diagnostics));
        }
    }

    json!({ "diagnostics_by_uri": by_uri })
}

fn run_diagnostics(ctx: &CommandContext<'_>, uri: &str, text: &str) -> Vec<Diagnostic> {
    let parse = ck3_parser::parse(text);
    let path = match_path(uri);
    let validation = ValidationContext {
        uri,
        path: &path,
        file_kind: file_kind_for_path(&path),
        index: ctx.index,
        schemas: ctx.schemas,
        source: text,
    };
    ctx.orchestrator.run(&parse, &validation, &|| false).combined
}

fn rescan_workspace(ctx: &CommandContext<'_>) -> Value {
    let report = scanner::scan_workspace(ctx.roots, ctx.index, ctx.pool);
    let mut out = Map::new();
    out.insert("scanned".to_string(), json!(report.scanned));
    for (category, count) in report.counts {
        out.insert(category.to_string(), json!(count));
    }
    Value::Object(out)
}

// ----------------------------------------------------------------------
// Template and localization generation
// ----------------------------------------------------------------------

fn generate_event_template(args: &[Value]) -> Result<Value, String> {
    let params = args.first().ok_or("expected {namespace, event_num, event_type}")?;
    let namespace = params
        .get("namespace")
        .and_then(Value::as_str)
        .ok_or("missing 'namespace'")?;
    let event_num = match params.get("event_num") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => return Err("missing 'event_num'".to_string()),
    };
    let event_type =
        params.get("event_type").and_then(Value::as_str).unwrap_or("character_event");

    if !namespace.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        return Err(format!("'{namespace}' is not a valid namespace"));
    }

    let event_id = format!("{namespace}.{event_num:0>4}");
    let title_key = format!("{event_id}.t");
    let desc_key = format!("{event_id}.desc");
    let option_key = format!("{event_id}.a");

    let template_text = format!(
        "{event_id} = {{\n\
         \ttype = {event_type}\n\
         \ttitle = {title_key}\n\
         \tdesc = {desc_key}\n\
         \ttheme = default\n\
         \n\
         \ttrigger = {{\n\
         \t}}\n\
         \n\
         \timmediate = {{\n\
         \t}}\n\
         \n\
         \toption = {{\n\
         \t\tname = {option_key}\n\
         \t}}\n\
         }}\n"
    );

    Ok(json!({
        "template_text": template_text,
        "event_id": event_id,
        "localization_keys": [title_key, desc_key, option_key],
    }))
}

fn generate_localization_stubs(
    ctx: &CommandContext<'_>,
    args: &[Value],
) -> Result<Value, String> {
    let params = args.first().ok_or("expected {event_id}")?;
    let event_id =
        params.get("event_id").and_then(Value::as_str).ok_or("missing 'event_id'")?;

    let entries = ctx.index.lookup(SymbolCategory::Events, event_id);
    let entry = entries.first();

    let mut keys = Vec::new();
    keys.push(
        entry
            .and_then(|e| e.attribute("title"))
            .map(str::to_string)
            .unwrap_or_else(|| format!("{event_id}.t")),
    );
    keys.push(
        entry
            .and_then(|e| e.attribute("desc"))
            .map(str::to_string)
            .unwrap_or_else(|| format!("{event_id}.desc")),
    );
    keys.push(format!("{event_id}.a"));

    // Only stub keys that do not exist yet.
    keys.retain(|k| ctx.index.lookup(SymbolCategory::Localization, k).is_empty());

    let mut text = String::from("l_english:\n");
    for key in &keys {
        text.push_str(&format!(" {key}:0 \"\"\n"));
    }

    Ok(json!({
        "localization_text": text,
        "keys_generated": keys,
    }))
}

// ----------------------------------------------------------------------
// Event maintenance
// ----------------------------------------------------------------------

fn rename_event(ctx: &CommandContext<'_>, args: &[Value]) -> Value {
    let params = args.first().cloned().unwrap_or(Value::Null);
    let old_id = params.get("old_id").and_then(Value::as_str).unwrap_or_default();
    let new_id = params.get("new_id").and_then(Value::as_str).unwrap_or_default();

    if ctx.index.lookup(SymbolCategory::Events, old_id).is_empty() {
        let suggestion = ctx
            .index
            .names(SymbolCategory::Events)
            .into_iter()
            .min_by_key(|candidate| strsim::levenshtein(candidate, old_id));
        let mut out = Map::new();
        out.insert("error".to_string(), json!(format!("event '{old_id}' does not exist")));
        if let Some(suggestion) = suggestion {
            out.insert("suggestion".to_string(), json!(suggestion));
        }
        return Value::Object(out);
    }
    if !looks_like_event_id(new_id) {
        return json!({
            "error": format!("'{new_id}' is not a valid event id"),
            "suggestion": format!("{}.{}", old_id.rsplit_once('.').map(|(ns, _)| ns).unwrap_or("my_mod"), "0001"),
        });
    }
    if !ctx.index.lookup(SymbolCategory::Events, new_id).is_empty() {
        return json!({ "error": format!("event '{new_id}' already exists") });
    }

    let open: Vec<(String, String)> = {
        let documents = ctx.documents.lock();
        documents.iter().map(|(uri, doc)| (uri.clone(), doc.text.clone())).collect()
    };
    let sites =
        crate::features::references::find_references(old_id, &open, ctx.roots);
    json!({
        "message": format!(
            "rename '{old_id}' to '{new_id}' touches {} occurrence(s) in {} file(s); \
             apply it via the rename refactoring on the event definition",
            sites.len(),
            sites.iter().map(|s| &s.uri).collect::<std::collections::HashSet<_>>().len()
        ),
    })
}

fn find_orphaned_localization(ctx: &CommandContext<'_>) -> Value {
    let mut orphaned = Vec::new();
    for key in ctx.index.names(SymbolCategory::Localization) {
        let Some(event_id) = event_prefix(&key) else { continue };
        if ctx.index.lookup(SymbolCategory::Events, event_id).is_empty() {
            orphaned.push(key);
        }
    }
    orphaned.sort();
    json!({
        "total_count": orphaned.len(),
        "orphaned_keys": orphaned,
    })
}

/// `war.0001.t` → `war.0001`; keys that are not event-derived return None.
fn event_prefix(key: &str) -> Option<&str> {
    let mut split = key.split('.');
    let namespace = split.next()?;
    let number = split.next()?;
    // Keys without a trailing segment are event ids themselves, not
    // derived keys; they are not orphan candidates.
    split.next()?;
    if namespace.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(&key[..namespace.len() + 1 + number.len()])
}

fn show_namespace_events(ctx: &CommandContext<'_>, args: &[Value]) -> Result<Value, String> {
    let params = args.first().ok_or("expected {namespace}")?;
    let namespace = params
        .get("namespace")
        .and_then(Value::as_str)
        .ok_or("missing 'namespace'")?;
    let prefix = format!("{namespace}.");

    let mut events = Vec::new();
    for name in ctx.index.names(SymbolCategory::Events) {
        if !name.starts_with(&prefix) {
            continue;
        }
        for entry in ctx.index.lookup(SymbolCategory::Events, &name) {
            events.push(json!({
                "event_id": name,
                "title": entry.attribute("title"),
                "file": entry.uri,
                "line": entry.range.start.line,
            }));
        }
    }

    Ok(json!({
        "namespace": namespace,
        "count": events.len(),
        "events": events,
    }))
}

fn check_dependencies(ctx: &CommandContext<'_>) -> Value {
    let mut by_uri: Map<String, Value> = Map::new();
    let open: Vec<(String, String)> = {
        let documents = ctx.documents.lock();
        documents.iter().map(|(uri, doc)| (uri.clone(), doc.text.clone())).collect()
    };

    for (uri, text) in open {
        let parse = ck3_parser::parse(&text);
        let diagnostics = missing_event_targets(&parse.ast, ctx.index);
        if !diagnostics.is_empty() {
            by_uri.insert(uri, json!(diagnostics));
        }
    }
    json!({ "diagnostics_by_uri": by_uri })
}

/// `trigger_event = X` (scalar or `id = X` block form) whose target event is
/// not indexed.
fn missing_event_targets(ast: &ScriptAst, index: &DocumentIndex) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for id in ast.walk() {
        let node = ast.node(id);
        if node.node_type != NodeType::Assignment || node.key != "trigger_event" {
            continue;
        }
        let target = match node.scalar() {
            Some(scalar) => Some((scalar.text.clone(), scalar.range)),
            None => ast
                .child_assignment(id, "id")
                .and_then(|c| ast.node(c).scalar())
                .map(|s| (s.text.clone(), s.range)),
        };
        let Some((target, range)) = target else { continue };
        if !looks_like_event_id(&target) {
            continue;
        }
        if index.lookup(SymbolCategory::Events, &target).is_empty() {
            out.push(Diagnostic::new(
                range,
                Severity::Warning,
                codes::MISSING_EVENT_TARGET,
                "ck3-events",
                format!("event '{target}' is not defined anywhere in the workspace"),
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    struct Fixture {
        documents: Mutex<HashMap<String, DocumentState>>,
        index: Arc<DocumentIndex>,
        schemas: Arc<SchemaSet>,
        orchestrator: Arc<DiagnosticOrchestrator>,
        pool: Arc<PriorityThreadPool>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                documents: Mutex::new(HashMap::new()),
                index: Arc::new(DocumentIndex::new()),
                schemas: Arc::new(SchemaSet::load_bundled()),
                orchestrator: Arc::new(DiagnosticOrchestrator::new()),
                pool: Arc::new(PriorityThreadPool::with_workers(2)),
            }
        }

        fn ctx(&self) -> CommandContext<'_> {
            CommandContext {
                documents: &self.documents,
                index: &self.index,
                schemas: &self.schemas,
                orchestrator: &self.orchestrator,
                pool: &self.pool,
                roots: &[],
            }
        }

        fn open(&self, uri: &str, text: &str) {
            self.documents.lock().insert(uri.to_string(), DocumentState::new(text, 1));
            let parse = ck3_parser::parse(text);
            let kind = file_kind_for_path(&match_path(uri));
            crate::pipeline::index_document(&self.index, uri, kind, &parse, text);
        }
    }

    #[test]
    fn event_template_is_bit_exact_in_shape() {
        let result = generate_event_template(&[json!({
            "namespace": "my_mod",
            "event_num": 1,
            "event_type": "character_event"
        })])
        .unwrap();
        assert_eq!(result["event_id"], "my_mod.0001");
        let text = result["template_text"].as_str().unwrap();
        assert!(text.starts_with("my_mod.0001 = {"));
        assert!(text.contains("type = character_event"));
        assert!(text.contains("name = my_mod.0001.a"));
        assert_eq!(
            result["localization_keys"],
            json!(["my_mod.0001.t", "my_mod.0001.desc", "my_mod.0001.a"])
        );
    }

    #[test]
    fn localization_stubs_skip_existing_keys() {
        let fixture = Fixture::new();
        fixture.open(
            "file:///mod/events/a.txt",
            "m.0001 = { title = m.0001.t desc = m.0001.desc }",
        );
        fixture.open(
            "file:///mod/localization/english/a_l_english.yml",
            "l_english:\n m.0001.t:0 \"Has one\"\n",
        );
        let result =
            generate_localization_stubs(&fixture.ctx(), &[json!({"event_id": "m.0001"})])
                .unwrap();
        let keys = result["keys_generated"].as_array().unwrap();
        assert!(keys.iter().all(|k| k != "m.0001.t"));
        assert!(keys.iter().any(|k| k == "m.0001.desc"));
        fixture.pool.shutdown(true, std::time::Duration::from_secs(2));
    }

    #[test]
    fn rename_event_rejects_unknown_and_suggests() {
        let fixture = Fixture::new();
        fixture.open("file:///mod/events/a.txt", "m.0001 = { }");
        let result = rename_event(
            &fixture.ctx(),
            &[json!({"old_id": "m.0002", "new_id": "m.0003"})],
        );
        assert!(result["error"].as_str().unwrap().contains("m.0002"));
        assert_eq!(result["suggestion"], "m.0001");
        fixture.pool.shutdown(true, std::time::Duration::from_secs(2));
    }

    #[test]
    fn orphaned_localization_found() {
        let fixture = Fixture::new();
        fixture.open("file:///mod/events/a.txt", "m.0001 = { }");
        fixture.open(
            "file:///mod/localization/english/a_l_english.yml",
            "l_english:\n m.0001.t:0 \"ok\"\n m.0099.t:0 \"orphan\"\n plain_key:0 \"not event derived\"\n",
        );
        let result = find_orphaned_localization(&fixture.ctx());
        assert_eq!(result["total_count"], 1);
        assert_eq!(result["orphaned_keys"], json!(["m.0099.t"]));
        fixture.pool.shutdown(true, std::time::Duration::from_secs(2));
    }

    #[test]
    fn namespace_events_are_listed() {
        let fixture = Fixture::new();
        fixture.open(
            "file:///mod/events/a.txt",
            "m.0001 = { title = m.0001.t }\nm.0002 = { }\nother.0001 = { }",
        );
        let result =
            show_namespace_events(&fixture.ctx(), &[json!({"namespace": "m"})]).unwrap();
        assert_eq!(result["count"], 2);
        assert_eq!(result["namespace"], "m");
        fixture.pool.shutdown(true, std::time::Duration::from_secs(2));
    }

    #[test]
    fn dependency_check_flags_missing_targets() {
        let fixture = Fixture::new();
        fixture.open(
            "file:///mod/events/a.txt",
            "m.0001 = { immediate = { trigger_event = m.0002 trigger_event = { id = ghost.0001 } } }\nm.0002 = { }",
        );
        let result = check_dependencies(&fixture.ctx());
        let diagnostics = result["diagnostics_by_uri"]["file:///mod/events/a.txt"]
            .as_array()
            .unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0]["message"].as_str().unwrap().contains("ghost.0001"));
        fixture.pool.shutdown(true, std::time::Duration::from_secs(2));
    }

    #[test]
    fn unknown_command_errors() {
        let fixture = Fixture::new();
        assert!(execute(&fixture.ctx(), "no_such_command", &[]).is_err());
        fixture.pool.shutdown(true, std::time::Duration::from_secs(2));
    }
}
