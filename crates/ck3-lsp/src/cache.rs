//! Content-hashed AST cache.
//!
//! Keyed by the md5 of the source, so re-parses of bit-identical content
//! (undo/redo churn, duplicated files during a scan) return the same
//! `Arc<ParseOutcome>`. Bounded LRU; the default 50 entries cover the files
//! an editing session actually touches.

use ck3_parser::ParseOutcome;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Default cache capacity.
pub const DEFAULT_CAPACITY: usize = 50;

/// Bounded, hash-keyed parse cache.
pub struct AstCache {
    inner: Mutex<LruCache<String, Arc<ParseOutcome>>>,
    hits: std::sync::atomic::AtomicU64,
    misses: std::sync::atomic::AtomicU64,
}

impl AstCache {
    /// Create with an explicit capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            hits: std::sync::atomic::AtomicU64::new(0),
            misses: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Cached parse for `content_hash`, if present.
    pub fn get(&self, content_hash: &str) -> Option<Arc<ParseOutcome>> {
        let found = self.inner.lock().get(content_hash).cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        found
    }

    /// Insert a parse under its hash.
    pub fn put(&self, content_hash: String, parse: Arc<ParseOutcome>) {
        self.inner.lock().put(content_hash, parse);
    }

    /// Cached parse or a fresh one; the fresh result is cached.
    pub fn get_or_parse(&self, content_hash: &str, source: &str) -> Arc<ParseOutcome> {
        if let Some(cached) = self.get(content_hash) {
            return cached;
        }
        let parsed = Arc::new(ck3_parser::parse(source));
        self.put(content_hash.to_string(), Arc::clone(&parsed));
        parsed
    }

    /// `(hits, misses)` counters.
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(std::sync::atomic::Ordering::Relaxed),
            self.misses.load(std::sync::atomic::Ordering::Relaxed),
        )
    }
}
