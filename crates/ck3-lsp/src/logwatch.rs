//! Game-log watcher.
//!
//! Tails `error.log`-style files under a configured directory, classifies
//! appended lines, and forwards them as `window/logMessage` notifications.
//! Polling runs as a LOW-priority pool task and stops cooperatively with
//! the task's cancellation token.

use ck3_pool::{CancellationToken, Priority, PriorityThreadPool, TaskHandle};
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// LSP `MessageType` values.
pub mod message_type {
    pub const ERROR: u8 = 1;
    pub const WARNING: u8 = 2;
    pub const INFO: u8 = 3;
}

/// Sink for classified log lines.
pub type LogSink = Arc<dyn Fn(u8, String) + Send + Sync>;

const POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Classify one log line by its content.
pub fn classify_line(line: &str) -> u8 {
    let lowered = line.to_ascii_lowercase();
    if lowered.contains("error") || lowered.contains("invalid") || lowered.contains("failed") {
        message_type::ERROR
    } else if lowered.contains("warning") || lowered.contains("deprecat") {
        message_type::WARNING
    } else {
        message_type::INFO
    }
}

/// Start tailing `*.log` files under `directory`. Returns the pool handle;
/// cancel it to stop the watcher.
pub fn spawn(pool: &PriorityThreadPool, directory: PathBuf, sink: LogSink) -> TaskHandle<()> {
    let label = format!("logwatch:{}", directory.display());
    pool.submit(
        move |token| watch_loop(&directory, &sink, token),
        Priority::Low,
        &label,
    )
}

fn watch_loop(directory: &Path, sink: &LogSink, token: &CancellationToken) {
    // Start from the current end of each file so stale sessions stay quiet.
    let mut offsets: HashMap<PathBuf, u64> = HashMap::new();
    for path in log_files(directory) {
        let len = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        offsets.insert(path, len);
    }

    while token.sleep(POLL_INTERVAL) {
        for path in log_files(directory) {
            let offset = offsets.entry(path.clone()).or_insert(0);
            let Ok(metadata) = std::fs::metadata(&path) else { continue };
            let len = metadata.len();
            if len < *offset {
                // Truncated (new game session): restart from the top.
                *offset = 0;
            }
            if len == *offset {
                continue;
            }
            if let Some(appended) = read_from(&path, *offset) {
                *offset = len;
                let name =
                    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                for line in appended.lines().filter(|l| !l.trim().is_empty()) {
                    sink(classify_line(line), format!("[{name}] {line}"));
                }
            }
        }
    }
}

fn log_files(directory: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(directory) else { return Vec::new() };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("log"))
        .collect();
    files.sort();
    files
}

fn read_from(path: &Path, offset: u64) -> Option<String> {
    let mut file = std::fs::File::open(path).ok()?;
    file.seek(SeekFrom::Start(offset)).ok()?;
    let mut buffer = String::new();
    file.read_to_string(&mut buffer).ok()?;
    Some(buffer)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use parking_lot::Mutex;
    use std::io::Write;
    use std::time::Instant;

    #[test]
    fn classification_families() {
        assert_eq!(classify_line("[E] Invalid scope for trigger"), message_type::ERROR);
        assert_eq!(classify_line("Warning: deprecated effect"), message_type::WARNING);
        assert_eq!(classify_line("Loading 312 events"), message_type::INFO);
    }

    #[test]
    fn appended_lines_are_forwarded() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("error.log");
        std::fs::write(&log_path, "old line\n").unwrap();

        let seen: Arc<Mutex<Vec<(u8, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_store = Arc::clone(&seen);
        let sink: LogSink = Arc::new(move |level, line| {
            sink_store.lock().push((level, line));
        });

        let pool = PriorityThreadPool::with_workers(1);
        let handle = spawn(&pool, dir.path().to_path_buf(), sink);

        // Give the watcher a poll cycle, then append.
        std::thread::sleep(Duration::from_millis(1100));
        let mut file = std::fs::OpenOptions::new().append(true).open(&log_path).unwrap();
        writeln!(file, "Error: event my_mod.0001 not found").unwrap();
        drop(file);

        let deadline = Instant::now() + Duration::from_secs(5);
        while seen.lock().is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(50));
        }

        handle.cancel();
        pool.shutdown(true, Duration::from_secs(2));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1, "{seen:?}");
        assert_eq!(seen[0].0, message_type::ERROR);
        assert!(seen[0].1.contains("error.log"));
        // The pre-existing line was not replayed.
        assert!(!seen.iter().any(|(_, l)| l.contains("old line")));
    }
}
