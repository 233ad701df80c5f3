//! Workspace scanner.
//!
//! Walks the workspace roots for script and locale files, parses them in
//! parallel on the pool at NORMAL priority, and merges every file's
//! contributions into the index. Mod descriptor files (`*.mod`) mark roots
//! but are not themselves indexed.

use crate::util::path_to_uri;
use ck3_index::{DocumentIndex, FileKind, file_kind_for_path};
use ck3_pool::{Priority, PriorityThreadPool, TaskHandle};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Result of one workspace scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Files parsed and merged.
    pub scanned: usize,
    /// Distinct-symbol counts per category after the merge.
    pub counts: BTreeMap<&'static str, usize>,
}

/// Files the scanner considers part of the mod.
pub fn discover_files(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in roots {
        for entry in WalkDir::new(root).follow_links(false).into_iter().flatten() {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if file_kind_for_path(&path.to_string_lossy()) != FileKind::Other {
                files.push(path.to_path_buf());
            }
        }
    }
    files.sort();
    files
}

/// Workspace roots: the given folders plus any directory holding a mod
/// descriptor underneath them (descriptors identify nested mod layouts).
pub fn workspace_roots(folders: &[PathBuf]) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = folders.to_vec();
    for folder in folders {
        for entry in WalkDir::new(folder)
            .max_depth(2)
            .follow_links(false)
            .into_iter()
            .flatten()
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("mod") {
                if let Some(parent) = path.parent() {
                    if !roots.iter().any(|r| r == parent) {
                        tracing::debug!(descriptor = %path.display(), "found mod descriptor");
                        roots.push(parent.to_path_buf());
                    }
                }
            }
        }
    }
    roots
}

/// Scan `roots`, merging everything into `index`. Parses run in parallel on
/// the pool; merging happens on the calling thread so `replace` calls stay
/// serialized per file.
pub fn scan_workspace(
    roots: &[PathBuf],
    index: &DocumentIndex,
    pool: &PriorityThreadPool,
) -> ScanReport {
    let files = discover_files(roots);

    type FileResult = Option<(String, Vec<ck3_index::Contribution>)>;
    let handles: Vec<TaskHandle<FileResult>> = files
        .iter()
        .map(|path| {
            let path = path.clone();
            let label = format!("scan:{}", path.display());
            pool.submit(
                move |token| {
                    if token.is_cancelled() {
                        return None;
                    }
                    scan_file(&path)
                },
                Priority::Normal,
                &label,
            )
        })
        .collect();

    let mut scanned = 0usize;
    for handle in handles {
        if let Ok(Some((uri, contributions))) = handle.wait() {
            index.replace(&uri, contributions);
            scanned += 1;
        }
    }

    ScanReport { scanned, counts: index.stats() }
}

/// Parse one file from disk into its contributions.
pub fn scan_file(path: &Path) -> Option<(String, Vec<ck3_index::Contribution>)> {
    let uri = path_to_uri(path)?;
    let text = std::fs::read_to_string(path).ok()?;
    let kind = file_kind_for_path(&path.to_string_lossy());
    let contributions = if kind == FileKind::Localization {
        ck3_index::scan_localization(&text)
    } else {
        let parse = ck3_parser::parse(&text);
        ck3_index::extract_contributions(&parse.ast, kind)
    };
    Some((uri, contributions))
}
