//! The LSP server: read-dispatch-respond loop over stdio framing.
//!
//! The loop itself stays on the calling thread; CPU-bound work (updates,
//! scans, reference searches) runs on the priority pool and is awaited via
//! task handles. Document updates never block the loop - they flow through
//! the debounced pipeline and publish diagnostics from worker threads.

use crate::cache::AstCache;
use crate::commands::{self, CommandContext};
use crate::features::{self, DocSnapshot};
use crate::logwatch;
use crate::pipeline::{DiagnosticsPublisher, DocumentPipeline};
use crate::scanner;
use crate::state::{DocumentState, ServerConfig};
use crate::transport::{read_message, write_message, write_notification};
use crate::util::{match_path, position_from_params, uri_from_params, uri_to_path};
use ck3_diagnostics::DiagnosticOrchestrator;
use ck3_index::{DocumentIndex, file_kind_for_path};
use ck3_lsp_protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, error_codes, methods, server_capabilities,
};
use ck3_pool::{Priority, PriorityThreadPool, TaskError, TaskHandle};
use ck3_schema::SchemaSet;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Shutdown drain budget for the pool.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// The language server.
pub struct LspServer {
    documents: Arc<Mutex<HashMap<String, DocumentState>>>,
    index: Arc<DocumentIndex>,
    schemas: Arc<SchemaSet>,
    orchestrator: Arc<DiagnosticOrchestrator>,
    pool: Arc<PriorityThreadPool>,
    ast_cache: Arc<AstCache>,
    config: Arc<Mutex<ServerConfig>>,
    pipeline: Arc<DocumentPipeline>,
    reader: Box<dyn BufRead + Send>,
    output: Arc<Mutex<Box<dyn Write + Send>>>,
    workspace_folders: Arc<Mutex<Vec<PathBuf>>>,
    cancelled_requests: Arc<Mutex<HashSet<String>>>,
    initialized: bool,
    shutdown_received: bool,
    client_snippet_support: bool,
    log_watcher: Option<TaskHandle<()>>,
}

impl LspServer {
    /// Production server over stdio.
    pub fn new() -> Self {
        Self::with_io(Box::new(BufReader::new(io::stdin())), Box::new(io::stdout()))
    }

    /// Server over arbitrary I/O (tests drive the protocol through buffers).
    pub fn with_io<R, W>(reader: Box<R>, writer: Box<W>) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let documents: Arc<Mutex<HashMap<String, DocumentState>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let index = Arc::new(DocumentIndex::new());
        let schemas = Arc::new(SchemaSet::load_bundled());
        let orchestrator = Arc::new(DiagnosticOrchestrator::new());
        let pool = Arc::new(PriorityThreadPool::new());
        let ast_cache = Arc::new(AstCache::new(crate::cache::DEFAULT_CAPACITY));
        let config = Arc::new(Mutex::new(ServerConfig::default()));
        let output: Arc<Mutex<Box<dyn Write + Send>>> =
            Arc::new(Mutex::new(writer as Box<dyn Write + Send>));

        let publish_output = Arc::clone(&output);
        let publisher: DiagnosticsPublisher = Arc::new(move |uri, version, diagnostics| {
            let params = json!({
                "uri": uri,
                "version": version,
                "diagnostics": diagnostics,
            });
            let mut writer = publish_output.lock();
            if let Err(error) =
                write_notification(writer.as_mut(), methods::PUBLISH_DIAGNOSTICS, params)
            {
                tracing::warn!(%error, uri, "failed to publish diagnostics");
            }
        });

        let pipeline = DocumentPipeline::new(
            Arc::clone(&documents),
            Arc::clone(&index),
            Arc::clone(&schemas),
            Arc::clone(&orchestrator),
            Arc::clone(&pool),
            Arc::clone(&ast_cache),
            Arc::clone(&config),
            publisher,
        );

        Self {
            documents,
            index,
            schemas,
            orchestrator,
            pool,
            ast_cache,
            config,
            pipeline,
            reader: Box::new(BufReader::new(reader)),
            output,
            workspace_folders: Arc::new(Mutex::new(Vec::new())),
            cancelled_requests: Arc::new(Mutex::new(HashSet::new())),
            initialized: false,
            shutdown_received: false,
            client_snippet_support: false,
            log_watcher: None,
        }
    }

    /// Run until the client disconnects or sends `exit`. The return value is
    /// the process exit code per the LSP lifecycle rules.
    pub fn run(&mut self) -> io::Result<i32> {
        loop {
            let message = match read_message(self.reader.as_mut()) {
                Ok(Some(message)) => message,
                Ok(None) => {
                    tracing::info!("client closed the stream");
                    self.teardown();
                    return Ok(if self.shutdown_received { 0 } else { 1 });
                }
                Err(error) => {
                    // Framing violations are the one fatal error class.
                    tracing::error!(%error, "framing violation");
                    self.teardown();
                    return Err(error);
                }
            };

            if message.method == methods::EXIT {
                self.teardown();
                return Ok(if self.shutdown_received { 0 } else { 1 });
            }

            match message.id.clone() {
                Some(id) => {
                    let response = self.handle_request(&message);
                    let mut output = self.output.lock();
                    let response = match response {
                        Ok(result) => JsonRpcResponse::success(Some(id), result),
                        Err(error) => JsonRpcResponse::error(Some(id), error),
                    };
                    write_message(output.as_mut(), &response)?;
                }
                None => self.handle_notification(&message),
            }
        }
    }

    fn teardown(&mut self) {
        if let Some(watcher) = self.log_watcher.take() {
            watcher.cancel();
        }
        self.pool.shutdown(true, SHUTDOWN_TIMEOUT);
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    fn handle_request(&mut self, request: &JsonRpcRequest) -> Result<Value, JsonRpcError> {
        let params = request.params.clone().unwrap_or(Value::Null);

        if !self.initialized && request.method != methods::INITIALIZE {
            return Err(JsonRpcError::new(
                error_codes::SERVER_NOT_INITIALIZED,
                "server is not initialized",
            ));
        }
        if let Some(id) = &request.id {
            if self.cancelled_requests.lock().remove(&id.to_string()) {
                return Err(JsonRpcError::new(
                    error_codes::REQUEST_CANCELLED,
                    "request was cancelled",
                ));
            }
        }

        match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(&params),
            methods::SHUTDOWN => {
                self.shutdown_received = true;
                Ok(Value::Null)
            }
            methods::COMPLETION => self.handle_completion(&params),
            methods::HOVER => self.handle_hover(&params),
            methods::DEFINITION => self.handle_definition(&params),
            methods::REFERENCES => self.handle_references(&params),
            methods::DOCUMENT_HIGHLIGHT => self.handle_document_highlight(&params),
            methods::DOCUMENT_SYMBOL => self.handle_document_symbols(&params),
            methods::WORKSPACE_SYMBOL => self.handle_workspace_symbols(&params),
            methods::CODE_ACTION => self.handle_code_actions(&params),
            methods::CODE_LENS => self.handle_code_lens(&params),
            methods::CODE_LENS_RESOLVE => self.handle_code_lens_resolve(&params),
            methods::FORMATTING | methods::RANGE_FORMATTING => self.handle_formatting(&params),
            methods::RENAME => self.handle_rename(&params),
            methods::PREPARE_RENAME => self.handle_prepare_rename(&params),
            methods::FOLDING_RANGE => self.handle_folding(&params),
            methods::SEMANTIC_TOKENS_FULL => self.handle_semantic_tokens(&params),
            methods::INLAY_HINT => self.handle_inlay_hints(&params),
            methods::EXECUTE_COMMAND => self.handle_execute_command(&params),
            other => Err(JsonRpcError::new(
                error_codes::METHOD_NOT_FOUND,
                format!("method not found: {other}"),
            )),
        }
    }

    fn handle_initialize(&mut self, params: &Value) -> Result<Value, JsonRpcError> {
        self.initialized = true;

        self.client_snippet_support = params
            .pointer("/capabilities/textDocument/completion/completionItem/snippetSupport")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        *self.config.lock() =
            ServerConfig::from_initialization_options(params.get("initializationOptions"));

        let mut folders = Vec::new();
        if let Some(list) = params.get("workspaceFolders").and_then(Value::as_array) {
            for folder in list {
                if let Some(path) =
                    folder.get("uri").and_then(Value::as_str).and_then(uri_to_path)
                {
                    folders.push(path);
                }
            }
        }
        if folders.is_empty() {
            if let Some(path) = params.get("rootUri").and_then(Value::as_str).and_then(uri_to_path)
            {
                folders.push(path);
            }
        }
        *self.workspace_folders.lock() = scanner::workspace_roots(&folders);

        if let Some(directory) = self.config.lock().log_watch_path.clone() {
            let output = Arc::clone(&self.output);
            let sink: logwatch::LogSink = Arc::new(move |level, text| {
                let mut writer = output.lock();
                let _ = write_notification(
                    writer.as_mut(),
                    methods::LOG_MESSAGE,
                    json!({ "type": level, "message": text }),
                );
            });
            self.log_watcher = Some(logwatch::spawn(&self.pool, directory, sink));
        }

        Ok(json!({
            "capabilities": server_capabilities(),
            "serverInfo": {
                "name": "ck3-lsp",
                "version": env!("CARGO_PKG_VERSION"),
            }
        }))
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    fn handle_notification(&mut self, request: &JsonRpcRequest) {
        let params = request.params.clone().unwrap_or(Value::Null);
        match request.method.as_str() {
            methods::INITIALIZED => {
                // Kick off the initial workspace scan in the background.
                let roots = self.workspace_folders.lock().clone();
                if !roots.is_empty() {
                    let index = Arc::clone(&self.index);
                    let scan_pool = Arc::clone(&self.pool);
                    self.pool.submit(
                        move |_| {
                            let report = scanner::scan_workspace(&roots, &index, &scan_pool);
                            tracing::info!(scanned = report.scanned, "workspace scan finished");
                        },
                        Priority::Normal,
                        "workspace-scan",
                    );
                }
            }
            methods::DID_OPEN => self.handle_did_open(&params),
            methods::DID_CHANGE => self.handle_did_change(&params),
            methods::DID_CLOSE => self.handle_did_close(&params),
            methods::DID_SAVE => {}
            methods::DID_CHANGE_CONFIGURATION => {
                if let Some(settings) = params.get("settings") {
                    self.config.lock().apply(settings);
                }
            }
            methods::DID_CHANGE_WATCHED_FILES => self.handle_watched_files(&params),
            methods::CANCEL_REQUEST => {
                if let Some(id) = params.get("id") {
                    self.cancelled_requests.lock().insert(id.to_string());
                }
            }
            methods::SET_TRACE => {}
            other => tracing::debug!(method = other, "ignoring notification"),
        }
    }

    fn handle_did_open(&mut self, params: &Value) {
        let Some(uri) = uri_from_params(params) else { return };
        let document = &params["textDocument"];
        let text = document["text"].as_str().unwrap_or_default();
        let version = document["version"].as_i64().unwrap_or(0) as i32;
        self.documents.lock().insert(uri.clone(), DocumentState::new(text, version));
        self.pipeline.schedule_update(&uri, false);
    }

    fn handle_did_change(&mut self, params: &Value) {
        let Some(uri) = uri_from_params(params) else { return };
        let version = params["textDocument"]["version"].as_i64().unwrap_or(0) as i32;
        let Some(changes) = params.get("contentChanges").and_then(Value::as_array) else {
            return;
        };
        {
            let mut documents = self.documents.lock();
            let Some(doc) = documents.get_mut(&uri) else { return };
            for change in changes {
                match change.get("range") {
                    Some(range) => {
                        let start = ck3_ast::Position::new(
                            range["start"]["line"].as_u64().unwrap_or(0) as u32,
                            range["start"]["character"].as_u64().unwrap_or(0) as u32,
                        );
                        let end = ck3_ast::Position::new(
                            range["end"]["line"].as_u64().unwrap_or(0) as u32,
                            range["end"]["character"].as_u64().unwrap_or(0) as u32,
                        );
                        let text = change["text"].as_str().unwrap_or_default();
                        doc.apply_change(start, end, text, version);
                    }
                    None => {
                        let text = change["text"].as_str().unwrap_or_default();
                        doc.replace_content(text, version);
                    }
                }
            }
        }
        self.pipeline.schedule_update(&uri, true);
    }

    fn handle_did_close(&mut self, params: &Value) {
        let Some(uri) = uri_from_params(params) else { return };
        self.pipeline.forget(&uri);
        self.documents.lock().remove(&uri);
        // Clear stale squiggles on the client.
        let mut output = self.output.lock();
        let _ = write_notification(
            output.as_mut(),
            methods::PUBLISH_DIAGNOSTICS,
            json!({ "uri": uri, "diagnostics": [] }),
        );
    }

    fn handle_watched_files(&mut self, params: &Value) {
        let Some(changes) = params.get("changes").and_then(Value::as_array) else { return };
        for change in changes {
            let Some(uri) = change.get("uri").and_then(Value::as_str) else { continue };
            let deleted = change.get("type").and_then(Value::as_u64) == Some(3);
            if self.documents.lock().contains_key(uri) {
                // Open documents are authoritative; ignore disk churn.
                continue;
            }
            if deleted {
                self.index.remove(uri);
                continue;
            }
            if let Some(path) = uri_to_path(uri) {
                let index = Arc::clone(&self.index);
                self.pool.submit(
                    move |_| {
                        if let Some((uri, contributions)) = scanner::scan_file(&path) {
                            index.replace(&uri, contributions);
                        }
                    },
                    Priority::Normal,
                    &format!("reindex:{uri}"),
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // Feature handlers
    // ------------------------------------------------------------------

    /// Snapshot a document for feature work, parsing through the cache when
    /// the pipeline has not caught up yet.
    fn snapshot(&self, uri: &str) -> Option<DocSnapshot> {
        let (text, version, parse) = {
            let documents = self.documents.lock();
            let doc = documents.get(uri)?;
            (doc.text.clone(), doc.version, doc.parse.clone())
        };
        let parse = match parse {
            Some(parse) => parse,
            None => {
                let hash = crate::state::content_hash(&text);
                self.ast_cache.get_or_parse(&hash, &text)
            }
        };
        let path = match_path(uri);
        Some(DocSnapshot {
            uri: uri.to_string(),
            kind: file_kind_for_path(&path),
            path,
            version,
            text,
            parse,
        })
    }

    fn open_docs_snapshot(&self) -> Vec<(String, String)> {
        let documents = self.documents.lock();
        documents.iter().map(|(uri, doc)| (uri.clone(), doc.text.clone())).collect()
    }

    /// Run `work` on the pool at `priority` and wait for it, mapping worker
    /// failures to a JSON-RPC internal error.
    fn on_pool<T, F>(&self, priority: Priority, name: &str, work: F) -> Result<T, JsonRpcError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let handle = self.pool.submit(move |_| work(), priority, name);
        match handle.wait() {
            Ok(value) => Ok(value),
            Err(TaskError::Cancelled) => Err(JsonRpcError::new(
                error_codes::REQUEST_CANCELLED,
                "request was cancelled",
            )),
            Err(error) => {
                tracing::error!(%error, name, "feature task failed");
                Err(JsonRpcError::new(error_codes::INTERNAL_ERROR, error.to_string()))
            }
        }
    }

    fn handle_completion(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let Some((snapshot, position)) = self.snapshot_and_position(params) else {
            return Ok(Value::Null);
        };
        let index = Arc::clone(&self.index);
        let schemas = Arc::clone(&self.schemas);
        let snippet_support = self.client_snippet_support;
        let max_items = self.config.lock().max_completion_items;
        let items = self.on_pool(Priority::High, "completion", move || {
            features::completion::complete(
                &snapshot,
                &index,
                &schemas,
                position,
                snippet_support,
                max_items,
            )
        })?;
        Ok(json!({ "isIncomplete": false, "items": items }))
    }

    fn handle_hover(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let Some((snapshot, position)) = self.snapshot_and_position(params) else {
            return Ok(Value::Null);
        };
        let index = Arc::clone(&self.index);
        let schemas = Arc::clone(&self.schemas);
        let hover = self.on_pool(Priority::High, "hover", move || {
            features::hover::hover(&snapshot, &index, &schemas, position)
        })?;
        Ok(hover.unwrap_or(Value::Null))
    }

    fn handle_definition(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let Some((snapshot, position)) = self.snapshot_and_position(params) else {
            return Ok(Value::Null);
        };
        let index = Arc::clone(&self.index);
        let locations = self.on_pool(Priority::High, "definition", move || {
            features::definition::definition(&snapshot, &index, position)
        })?;
        Ok(Value::Array(locations))
    }

    fn handle_references(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let Some((snapshot, position)) = self.snapshot_and_position(params) else {
            return Ok(Value::Null);
        };
        let Some((word, _)) = features::hover::word_range_at(&snapshot, position) else {
            return Ok(Value::Array(Vec::new()));
        };
        let open_docs = self.open_docs_snapshot();
        let roots = self.workspace_folders.lock().clone();
        let locations = self.on_pool(Priority::High, "references", move || {
            let sites = features::references::find_references(&word, &open_docs, &roots);
            features::references::to_locations(&sites)
        })?;
        Ok(Value::Array(locations))
    }

    fn handle_document_highlight(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let Some((snapshot, position)) = self.snapshot_and_position(params) else {
            return Ok(Value::Null);
        };
        let highlights = self.on_pool(Priority::Critical, "document-highlight", move || {
            features::document_highlight::document_highlights(&snapshot, position)
        })?;
        Ok(Value::Array(highlights))
    }

    fn handle_document_symbols(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let Some(uri) = uri_from_params(params) else { return Ok(Value::Null) };
        let Some(snapshot) = self.snapshot(&uri) else { return Ok(Value::Null) };
        let schemas = Arc::clone(&self.schemas);
        let symbols = self.on_pool(Priority::Normal, "document-symbols", move || {
            features::symbols::document_symbols(&snapshot, &schemas)
        })?;
        Ok(Value::Array(symbols))
    }

    fn handle_workspace_symbols(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let query = params.get("query").and_then(Value::as_str).unwrap_or("").to_string();
        let index = Arc::clone(&self.index);
        let symbols = self.on_pool(Priority::High, "workspace-symbols", move || {
            features::symbols::workspace_symbols(&index, &query, 500)
        })?;
        Ok(Value::Array(symbols))
    }

    fn handle_code_actions(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let Some(uri) = uri_from_params(params) else { return Ok(Value::Null) };
        let Some(snapshot) = self.snapshot(&uri) else { return Ok(Value::Null) };
        let diagnostics = params
            .pointer("/context/diagnostics")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(Value::Array(features::code_actions::code_actions(&snapshot, &diagnostics)))
    }

    fn handle_code_lens(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let Some(uri) = uri_from_params(params) else { return Ok(Value::Null) };
        let Some(snapshot) = self.snapshot(&uri) else { return Ok(Value::Null) };
        let index = Arc::clone(&self.index);
        let schemas = Arc::clone(&self.schemas);
        let lenses = self.on_pool(Priority::Normal, "code-lens", move || {
            features::code_lens::code_lenses(&snapshot, &index, &schemas)
        })?;
        Ok(Value::Array(lenses))
    }

    fn handle_code_lens_resolve(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let lens = params.clone();
        let open_docs = self.open_docs_snapshot();
        let roots = self.workspace_folders.lock().clone();
        self.on_pool(Priority::Normal, "code-lens-resolve", move || {
            features::code_lens::resolve_code_lens(&lens, &open_docs, &roots)
        })
    }

    fn handle_formatting(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let Some(uri) = uri_from_params(params) else { return Ok(Value::Null) };
        let Some(snapshot) = self.snapshot(&uri) else { return Ok(Value::Null) };
        let edits = self.on_pool(Priority::High, "formatting", move || {
            features::formatting::formatting_edits(&snapshot.text)
        })?;
        Ok(edits.map(Value::Array).unwrap_or(Value::Array(Vec::new())))
    }

    fn handle_rename(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let Some((snapshot, position)) = self.snapshot_and_position(params) else {
            return Ok(Value::Null);
        };
        let new_name =
            params.get("newName").and_then(Value::as_str).unwrap_or_default().to_string();
        let index = Arc::clone(&self.index);
        let open_docs = self.open_docs_snapshot();
        let roots = self.workspace_folders.lock().clone();
        let edit = self.on_pool(Priority::High, "rename", move || {
            features::rename::rename(&snapshot, &index, &open_docs, &roots, position, &new_name)
        })?;
        match edit {
            Some(edit) => Ok(edit),
            None => Err(JsonRpcError::new(
                error_codes::INVALID_PARAMS,
                "position does not resolve to a renameable symbol",
            )),
        }
    }

    fn handle_prepare_rename(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let Some((snapshot, position)) = self.snapshot_and_position(params) else {
            return Ok(Value::Null);
        };
        let index = Arc::clone(&self.index);
        let prepared = self.on_pool(Priority::High, "prepare-rename", move || {
            features::rename::prepare_rename(&snapshot, &index, position)
        })?;
        Ok(prepared.unwrap_or(Value::Null))
    }

    fn handle_folding(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let Some(uri) = uri_from_params(params) else { return Ok(Value::Null) };
        let Some(snapshot) = self.snapshot(&uri) else { return Ok(Value::Null) };
        let ranges = self.on_pool(Priority::Normal, "folding", move || {
            features::folding::folding_ranges(&snapshot)
        })?;
        Ok(Value::Array(ranges))
    }

    fn handle_semantic_tokens(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let Some(uri) = uri_from_params(params) else { return Ok(Value::Null) };
        let Some(snapshot) = self.snapshot(&uri) else { return Ok(Value::Null) };
        let index = Arc::clone(&self.index);
        let data = self.on_pool(Priority::Normal, "semantic-tokens", move || {
            features::semantic_tokens::semantic_tokens(&snapshot, &index)
        })?;
        Ok(json!({ "data": data }))
    }

    fn handle_inlay_hints(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let Some(uri) = uri_from_params(params) else { return Ok(Value::Null) };
        let Some(snapshot) = self.snapshot(&uri) else { return Ok(Value::Null) };
        let range = params.get("range").cloned().unwrap_or(Value::Null);
        let range = ck3_ast::Range::new(
            ck3_ast::Position::new(
                range.pointer("/start/line").and_then(Value::as_u64).unwrap_or(0) as u32,
                range.pointer("/start/character").and_then(Value::as_u64).unwrap_or(0) as u32,
            ),
            ck3_ast::Position::new(
                range.pointer("/end/line").and_then(Value::as_u64).unwrap_or(u32::MAX as u64)
                    as u32,
                range.pointer("/end/character").and_then(Value::as_u64).unwrap_or(0) as u32,
            ),
        );
        let hints = self.on_pool(Priority::Normal, "inlay-hints", move || {
            features::inlay_hints::inlay_hints(&snapshot, range)
        })?;
        Ok(Value::Array(hints))
    }

    fn handle_execute_command(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let command =
            params.get("command").and_then(Value::as_str).unwrap_or_default().to_string();
        let args = params
            .get("arguments")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let roots = self.workspace_folders.lock().clone();
        let ctx = CommandContext {
            documents: &self.documents,
            index: &self.index,
            schemas: &self.schemas,
            orchestrator: &self.orchestrator,
            pool: &self.pool,
            roots: &roots,
        };
        commands::execute(&ctx, &command, &args)
            .map_err(|message| JsonRpcError::new(error_codes::INVALID_PARAMS, message))
    }

    fn snapshot_and_position(&self, params: &Value) -> Option<(DocSnapshot, ck3_ast::Position)> {
        let uri = uri_from_params(params)?;
        let position = position_from_params(params)?;
        Some((self.snapshot(&uri)?, position))
    }
}

impl Default for LspServer {
    fn default() -> Self {
        Self::new()
    }
}
