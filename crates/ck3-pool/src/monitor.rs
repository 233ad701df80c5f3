//! Per-task monitoring records and aggregate counters.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Lifecycle state of a monitored task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// One task's monitoring record.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    /// Pool-unique task id.
    pub id: u64,
    /// Caller-supplied task name, e.g. `parse:file:///a.txt`.
    pub name: String,
    /// When the task entered the queue.
    pub submitted_at: Instant,
    /// When a worker dequeued it.
    pub started_at: Option<Instant>,
    /// When it finished, failed, or was cancelled.
    pub ended_at: Option<Instant>,
    /// Current lifecycle state.
    pub status: TaskStatus,
    /// Panic payload text for failed tasks.
    pub error: Option<String>,
}

/// Aggregate pool counters at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub queued: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

/// Bounded history of task records plus live counters.
pub struct Monitor {
    records: Mutex<VecDeque<TaskRecord>>,
    capacity: usize,
    queued: AtomicU64,
    active: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

impl Monitor {
    /// Keep at most `capacity` finished records.
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            queued: AtomicU64::new(0),
            active: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_submitted(&self, id: u64, name: &str) {
        self.queued.fetch_add(1, Ordering::Relaxed);
        let mut records = self.records.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(TaskRecord {
            id,
            name: name.to_string(),
            submitted_at: Instant::now(),
            started_at: None,
            ended_at: None,
            status: TaskStatus::Queued,
            error: None,
        });
    }

    pub(crate) fn record_started(&self, id: u64) {
        self.queued.fetch_sub(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::Relaxed);
        self.update(id, |r| {
            r.started_at = Some(Instant::now());
            r.status = TaskStatus::Running;
        });
    }

    pub(crate) fn record_finished(&self, id: u64, status: TaskStatus, error: Option<String>) {
        match status {
            TaskStatus::Completed => self.completed.fetch_add(1, Ordering::Relaxed),
            TaskStatus::Failed => self.failed.fetch_add(1, Ordering::Relaxed),
            _ => self.cancelled.fetch_add(1, Ordering::Relaxed),
        };
        self.active.fetch_sub(1, Ordering::Relaxed);
        self.update(id, |r| {
            r.ended_at = Some(Instant::now());
            r.status = status;
            r.error = error;
        });
    }

    fn update(&self, id: u64, f: impl FnOnce(&mut TaskRecord)) {
        let mut records = self.records.lock();
        if let Some(record) = records.iter_mut().find(|r| r.id == id) {
            f(record);
        }
    }

    /// Snapshot the aggregate counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            queued: self.queued.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }

    /// Snapshot the record history, oldest first.
    pub fn records(&self) -> Vec<TaskRecord> {
        self.records.lock().iter().cloned().collect()
    }
}
