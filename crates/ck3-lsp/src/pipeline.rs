//! The debounced, version-aware document-update pipeline.
//!
//! Each `didChange` schedules one update task per URI: sleep an adaptive
//! debounce, re-check the version, parse through the content-hashed cache,
//! swap the document's contributions in the index, then publish diagnostics
//! in two stages (syntax immediately, syntax+semantic once the validators
//! finish). A newer version cancels the pending tasks and supersedes their
//! publications.
//!
//! The two stages run at different pool priorities: the parse + syntax
//! publish is HIGH (the user is waiting on it), while the semantic validator
//! pass is re-queued at NORMAL so interactive requests always jump ahead of
//! background validation.
//!
//! Lock order everywhere: documents before index before cache.

use crate::cache::AstCache;
use crate::state::{DocumentState, ServerConfig};
use crate::util::match_path;
use ck3_diagnostics::{Diagnostic, DiagnosticOrchestrator, ValidationContext};
use ck3_index::{DocumentIndex, FileKind, file_kind_for_path};
use ck3_parser::ParseOutcome;
use ck3_pool::{CancellationToken, Priority, PriorityThreadPool, TaskHandle};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Callback that delivers a diagnostics publication to the client.
pub type DiagnosticsPublisher = Arc<dyn Fn(&str, i32, &[Diagnostic]) + Send + Sync>;

/// Debounce duration by document size.
pub fn debounce_for_lines(lines: usize) -> Duration {
    Duration::from_millis(match lines {
        0..=499 => 80,
        500..=1999 => 150,
        2000..=4999 => 250,
        _ => 400,
    })
}

/// The shared update pipeline.
pub struct DocumentPipeline {
    documents: Arc<Mutex<HashMap<String, DocumentState>>>,
    index: Arc<DocumentIndex>,
    schemas: Arc<ck3_schema::SchemaSet>,
    orchestrator: Arc<DiagnosticOrchestrator>,
    pool: Arc<PriorityThreadPool>,
    ast_cache: Arc<AstCache>,
    config: Arc<Mutex<ServerConfig>>,
    publisher: DiagnosticsPublisher,
    /// At most one pending update per URI; superseded tasks are cancelled.
    pending: Mutex<FxHashMap<String, TaskHandle<()>>>,
    /// The NORMAL-priority semantic stage, also at most one per URI.
    pending_semantic: Mutex<FxHashMap<String, TaskHandle<()>>>,
}

impl DocumentPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        documents: Arc<Mutex<HashMap<String, DocumentState>>>,
        index: Arc<DocumentIndex>,
        schemas: Arc<ck3_schema::SchemaSet>,
        orchestrator: Arc<DiagnosticOrchestrator>,
        pool: Arc<PriorityThreadPool>,
        ast_cache: Arc<AstCache>,
        config: Arc<Mutex<ServerConfig>>,
        publisher: DiagnosticsPublisher,
    ) -> Arc<Self> {
        Arc::new(Self {
            documents,
            index,
            schemas,
            orchestrator,
            pool,
            ast_cache,
            config,
            publisher,
            pending: Mutex::new(FxHashMap::default()),
            pending_semantic: Mutex::new(FxHashMap::default()),
        })
    }

    /// Schedule an update for `uri` at its current version, superseding any
    /// pending one. `debounce = false` (didOpen, scans) skips the sleep.
    pub fn schedule_update(self: &Arc<Self>, uri: &str, debounce: bool) {
        let (version, lines) = {
            let documents = self.documents.lock();
            match documents.get(uri) {
                Some(doc) => (doc.version, doc.line_count()),
                None => return,
            }
        };

        let delay = if !debounce {
            Duration::ZERO
        } else {
            match self.config.lock().debounce_override_ms {
                Some(ms) => Duration::from_millis(ms),
                None => debounce_for_lines(lines),
            }
        };

        let pipeline = Arc::clone(self);
        let task_uri = uri.to_string();
        let handle = self.pool.submit(
            move |token| {
                if pipeline.run_parse_stage(&task_uri, version, delay, token) {
                    Self::queue_semantic(&pipeline, &task_uri, version);
                }
            },
            Priority::High,
            &format!("update:{uri}"),
        );

        // Cancellation is idempotent; a completed predecessor ignores it.
        if let Some(previous) = self.pending.lock().insert(uri.to_string(), handle) {
            previous.cancel();
        }
        if let Some(previous) = self.pending_semantic.lock().remove(uri) {
            previous.cancel();
        }
    }

    /// Drop all pipeline state for a closed document.
    pub fn forget(&self, uri: &str) {
        if let Some(handle) = self.pending.lock().remove(uri) {
            handle.cancel();
        }
        if let Some(handle) = self.pending_semantic.lock().remove(uri) {
            handle.cancel();
        }
        self.index.remove(uri);
    }

    /// Phases 1-4 of the update: debounce, parse through the cache, swap the
    /// index contributions, publish the syntax stage. Every phase boundary
    /// re-checks the version and the cancellation token so superseded work
    /// dies quickly. Returns true when the semantic stage should follow.
    fn run_parse_stage(
        &self,
        uri: &str,
        version: i32,
        delay: Duration,
        token: &CancellationToken,
    ) -> bool {
        if !delay.is_zero() && !token.sleep(delay) {
            return false;
        }

        // Phase 1: snapshot the document, bail if the version moved on.
        let source = {
            let documents = self.documents.lock();
            match documents.get(uri) {
                Some(doc) if doc.version == version => doc.text.clone(),
                _ => return false,
            }
        };
        if token.is_cancelled() {
            return false;
        }

        // Phase 2: parse through the content-hash cache.
        let hash = crate::state::content_hash(&source);
        let parse = self.ast_cache.get_or_parse(&hash, &source);

        {
            let mut documents = self.documents.lock();
            match documents.get_mut(uri) {
                Some(doc) if doc.version == version => {
                    doc.parse = Some(Arc::clone(&parse));
                    doc.content_hash = hash;
                }
                _ => return false,
            }
        }
        if token.is_cancelled() {
            return false;
        }

        // Phase 3: swap this document's index contributions.
        let kind = file_kind_for_path(&match_path(uri));
        index_document(&self.index, uri, kind, &parse, &source);
        {
            let mut documents = self.documents.lock();
            if let Some(doc) = documents.get_mut(uri) {
                if doc.version == version {
                    doc.last_indexed_version = version;
                }
            }
        }
        if token.is_cancelled() {
            return false;
        }

        // Phase 4: publish the syntax stage.
        let syntax = self.orchestrator.syntax_stage(&parse);
        (self.publisher)(uri, version, &syntax);

        self.config.lock().validation_enabled
    }

    /// Submit the semantic stage (phase 5) at NORMAL priority so interactive
    /// requests win the queue over background validation, superseding any
    /// pending semantic task for the same URI.
    fn queue_semantic(pipeline: &Arc<Self>, uri: &str, version: i32) {
        let semantic = Arc::clone(pipeline);
        let task_uri = uri.to_string();
        let handle = pipeline.pool.submit(
            move |token| semantic.run_semantic_stage(&task_uri, version, token),
            Priority::Normal,
            &format!("semantic:{uri}"),
        );
        if let Some(previous) = pipeline.pending_semantic.lock().insert(uri.to_string(), handle)
        {
            previous.cancel();
        }
    }

    /// Phase 5: the full validator pipeline, then the combined publication.
    fn run_semantic_stage(&self, uri: &str, version: i32, token: &CancellationToken) {
        let (source, parse) = {
            let documents = self.documents.lock();
            match documents.get(uri) {
                Some(doc) if doc.version == version => (doc.text.clone(), doc.parse.clone()),
                _ => return,
            }
        };
        let parse = match parse {
            Some(parse) => parse,
            None => {
                let hash = crate::state::content_hash(&source);
                self.ast_cache.get_or_parse(&hash, &source)
            }
        };
        if token.is_cancelled() {
            return;
        }

        let path = match_path(uri);
        let kind = file_kind_for_path(&path);
        let ctx = ValidationContext {
            uri,
            path: &path,
            file_kind: kind,
            index: &self.index,
            schemas: &self.schemas,
            source: &source,
        };
        let run = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.orchestrator.run(&parse, &ctx, &|| {
                token.is_cancelled() || self.current_version(uri) != Some(version)
            })
        }));
        let staged = match run {
            Ok(staged) => staged,
            Err(_) => {
                // A validator blew up; the pipeline continues with the
                // syntax stage plus a single marker diagnostic.
                tracing::error!(uri, "validator panicked during semantic analysis");
                let mut combined = self.orchestrator.syntax_stage(&parse);
                combined.push(Diagnostic::new(
                    ck3_ast::Range::default(),
                    ck3_diagnostics::Severity::Information,
                    "CK3000",
                    "ck3-lsp",
                    "internal: validator failure during semantic analysis",
                ));
                (self.publisher)(uri, version, &combined);
                return;
            }
        };
        if token.is_cancelled() || self.current_version(uri) != Some(version) {
            // A newer cycle owns publication now.
            return;
        }
        let combined = filter_style(staged.combined, self.config.lock().style_checks);
        (self.publisher)(uri, version, &combined);
    }

    fn current_version(&self, uri: &str) -> Option<i32> {
        self.documents.lock().get(uri).map(|d| d.version)
    }
}

/// Replace `uri`'s contributions with those extracted from `parse` (or the
/// localization scanner for locale files).
pub fn index_document(
    index: &DocumentIndex,
    uri: &str,
    kind: FileKind,
    parse: &ParseOutcome,
    source: &str,
) {
    let contributions = if kind == FileKind::Localization {
        ck3_index::scan_localization(source)
    } else {
        ck3_index::extract_contributions(&parse.ast, kind)
    };
    index.replace(uri, contributions);
}

fn filter_style(diagnostics: Vec<Diagnostic>, style_enabled: bool) -> Vec<Diagnostic> {
    if style_enabled {
        return diagnostics;
    }
    diagnostics
        .into_iter()
        .filter(|d| !d.code.starts_with("CK38") && !d.code.starts_with("CK39"))
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    struct Harness {
        pipeline: Arc<DocumentPipeline>,
        documents: Arc<Mutex<HashMap<String, DocumentState>>>,
        published: Arc<Mutex<Vec<(String, i32, usize)>>>,
        pool: Arc<PriorityThreadPool>,
    }

    fn harness() -> Harness {
        let documents = Arc::new(Mutex::new(HashMap::new()));
        let published: Arc<Mutex<Vec<(String, i32, usize)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&published);
        let publisher: DiagnosticsPublisher = Arc::new(move |uri, version, diagnostics| {
            sink.lock().push((uri.to_string(), version, diagnostics.len()));
        });
        let pool = Arc::new(PriorityThreadPool::with_workers(2));
        let pipeline = DocumentPipeline::new(
            Arc::clone(&documents),
            Arc::new(DocumentIndex::new()),
            Arc::new(ck3_schema::SchemaSet::load_bundled()),
            Arc::new(DiagnosticOrchestrator::new()),
            Arc::clone(&pool),
            Arc::new(AstCache::new(8)),
            Arc::new(Mutex::new(ServerConfig::default())),
            publisher,
        );
        Harness { pipeline, documents, published, pool }
    }

    fn open(harness: &Harness, uri: &str, text: &str, version: i32) {
        harness.documents.lock().insert(uri.to_string(), DocumentState::new(text, version));
    }

    fn wait_for_publications(harness: &Harness, uri: &str, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let seen =
                harness.published.lock().iter().filter(|(u, _, _)| u == uri).count();
            if seen >= count || Instant::now() > deadline {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn debounce_tiers() {
        assert_eq!(debounce_for_lines(10), Duration::from_millis(80));
        assert_eq!(debounce_for_lines(499), Duration::from_millis(80));
        assert_eq!(debounce_for_lines(500), Duration::from_millis(150));
        assert_eq!(debounce_for_lines(2000), Duration::from_millis(250));
        assert_eq!(debounce_for_lines(5000), Duration::from_millis(400));
        assert_eq!(debounce_for_lines(100_000), Duration::from_millis(400));
    }

    #[test]
    fn update_publishes_two_stages_for_one_version() {
        let harness = harness();
        let uri = "file:///events/a.txt";
        open(&harness, uri, "namespace = m\nm.0001 = { type = character_event\n", 1);
        harness.pipeline.schedule_update(uri, false);
        wait_for_publications(&harness, uri, 2);

        let published = harness.published.lock().clone();
        let for_uri: Vec<_> = published.iter().filter(|(u, _, _)| u == uri).collect();
        assert_eq!(for_uri.len(), 2, "{published:?}");
        assert_eq!(for_uri[0].1, 1);
        assert_eq!(for_uri[1].1, 1);
        // Stage two is a superset of stage one.
        assert!(for_uri[1].2 >= for_uri[0].2);
        // The semantic pass ran as its own NORMAL-priority task, not inline
        // in the HIGH-priority parse task.
        let records = harness.pool.task_records();
        assert!(records.iter().any(|r| r.name.starts_with("update:")));
        assert!(records.iter().any(|r| r.name.starts_with("semantic:")));
        harness.pool.shutdown(true, Duration::from_secs(2));
    }

    #[test]
    fn superseded_version_never_publishes() {
        let harness = harness();
        let uri = "file:///events/b.txt";
        open(&harness, uri, "a = yes", 1);
        harness.pipeline.schedule_update(uri, true);
        // Second edit arrives within the debounce window.
        harness.documents.lock().get_mut(uri).unwrap().replace_content("a = no", 2);
        harness.pipeline.schedule_update(uri, true);

        wait_for_publications(&harness, uri, 2);
        std::thread::sleep(Duration::from_millis(150));
        let published = harness.published.lock().clone();
        assert!(
            published.iter().filter(|(u, _, _)| u == uri).all(|(_, v, _)| *v == 2),
            "{published:?}"
        );
        harness.pool.shutdown(true, Duration::from_secs(2));
    }

    #[test]
    fn forget_drops_index_contributions() {
        let harness = harness();
        let uri = "file:///events/c.txt";
        open(&harness, uri, "namespace = m\nm.0001 = { option = { name = a } }", 1);
        harness.pipeline.schedule_update(uri, false);
        wait_for_publications(&harness, uri, 2);
        harness.pipeline.forget(uri);
        let count = harness
            .pipeline
            .index
            .lookup(ck3_index::SymbolCategory::Events, "m.0001")
            .len();
        assert_eq!(count, 0);
        harness.pool.shutdown(true, Duration::from_secs(2));
    }

    #[test]
    fn cache_reuses_identical_content() {
        let harness = harness();
        let uri_a = "file:///events/d.txt";
        let uri_b = "file:///events/e.txt";
        let text = "namespace = m\nm.0001 = { option = { name = a } }";
        open(&harness, uri_a, text, 1);
        open(&harness, uri_b, text, 1);
        harness.pipeline.schedule_update(uri_a, false);
        wait_for_publications(&harness, uri_a, 2);
        harness.pipeline.schedule_update(uri_b, false);
        wait_for_publications(&harness, uri_b, 2);
        let a = harness.documents.lock().get(uri_a).unwrap().parse.clone().unwrap();
        let b = harness.documents.lock().get(uri_b).unwrap().parse.clone().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        harness.pool.shutdown(true, Duration::from_secs(2));
    }

    #[test]
    fn disabled_validation_only_publishes_syntax() {
        let documents = Arc::new(Mutex::new(HashMap::new()));
        let publications = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&publications);
        let publisher: DiagnosticsPublisher =
            Arc::new(move |_, _, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        let pool = Arc::new(PriorityThreadPool::with_workers(1));
        let config = ServerConfig { validation_enabled: false, ..ServerConfig::default() };
        let pipeline = DocumentPipeline::new(
            Arc::clone(&documents),
            Arc::new(DocumentIndex::new()),
            Arc::new(ck3_schema::SchemaSet::load_bundled()),
            Arc::new(DiagnosticOrchestrator::new()),
            Arc::clone(&pool),
            Arc::new(AstCache::new(8)),
            Arc::new(Mutex::new(config)),
            publisher,
        );
        documents
            .lock()
            .insert("file:///x.txt".to_string(), DocumentState::new("a = yes", 1));
        pipeline.schedule_update("file:///x.txt", false);
        let deadline = Instant::now() + Duration::from_secs(5);
        while publications.load(Ordering::SeqCst) < 1 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(publications.load(Ordering::SeqCst), 1);
        pool.shutdown(true, Duration::from_secs(2));
    }
}
