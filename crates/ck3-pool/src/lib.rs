//! Priority-queued worker pool for the CK3 language server.
//!
//! CPU-bound work (parsing, validation, workspace scans) runs here so the
//! protocol loop never blocks. Tasks carry one of four priorities; under
//! contention ready tasks are dequeued in priority order with ties broken by
//! submission order. Errors inside a task are captured on its handle and
//! never take down a worker.

#![deny(unsafe_code)]

mod cancel;
mod monitor;

pub use cancel::CancellationToken;
pub use monitor::{Monitor, PoolStats, TaskRecord, TaskStatus};

use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Task priority; higher runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Speculative work (pre-parsing referenced files).
    Low = 0,
    /// Background maintenance (semantic diagnostics, code lens, scans).
    Normal = 1,
    /// User-initiated actions (references, rename, parse for publish).
    High = 2,
    /// Sub-perceptual-latency operations (document highlight).
    Critical = 3,
}

/// Why a task handle has no value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    /// The task was cancelled before or while running.
    #[error("task was cancelled")]
    Cancelled,
    /// The task panicked; the payload is preserved for logging.
    #[error("task panicked: {0}")]
    Panicked(String),
    /// The pool shut down before the task ran.
    #[error("pool is shut down")]
    Shutdown,
}

struct HandleState<T> {
    slot: Mutex<Option<Result<T, TaskError>>>,
    cvar: Condvar,
    token: CancellationToken,
}

/// Awaitable handle to a submitted task.
pub struct TaskHandle<T> {
    state: Arc<HandleState<T>>,
    id: u64,
}

impl<T> TaskHandle<T> {
    /// Pool-unique id of the underlying task.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The task's cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.state.token.clone()
    }

    /// Request cooperative cancellation.
    pub fn cancel(&self) {
        self.state.token.cancel();
        let guard = self.state.slot.lock();
        drop(guard);
        self.state.cvar.notify_all();
    }

    /// Whether a result (or error) is available.
    pub fn is_finished(&self) -> bool {
        self.state.slot.lock().is_some()
    }

    /// Block until the task finishes and take its result.
    pub fn wait(self) -> Result<T, TaskError> {
        let mut slot = self.state.slot.lock();
        while slot.is_none() {
            self.state.cvar.wait(&mut slot);
        }
        slot.take().unwrap_or(Err(TaskError::Cancelled))
    }

    /// Block up to `timeout`; `None` when the task is still running.
    pub fn wait_timeout(self, timeout: Duration) -> Option<Result<T, TaskError>> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.state.slot.lock();
        while slot.is_none() {
            if self.state.cvar.wait_until(&mut slot, deadline).timed_out() {
                return slot.take();
            }
        }
        slot.take()
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

struct QueuedTask {
    priority: Priority,
    seq: u64,
    job: Job,
    token: CancellationToken,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for QueuedTask {}
impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}
impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Max-heap: higher priority first, then earlier submission.
        self.priority.cmp(&other.priority).then(other.seq.cmp(&self.seq))
    }
}

struct PoolShared {
    queue: Mutex<BinaryHeap<QueuedTask>>,
    cvar: Condvar,
    accepting: AtomicBool,
    terminate: AtomicBool,
    seq: AtomicU64,
    next_id: AtomicU64,
    monitor: Monitor,
}

/// The worker pool.
pub struct PriorityThreadPool {
    shared: Arc<PoolShared>,
    workers: Mutex<Vec<std::thread::JoinHandle<()>>>,
}

impl PriorityThreadPool {
    /// Default worker count: `min(4, cpu_count + 1)`.
    pub fn default_worker_count() -> usize {
        let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        (cpus + 1).min(4)
    }

    /// Create a pool with the default worker count.
    pub fn new() -> Self {
        Self::with_workers(Self::default_worker_count())
    }

    /// Create a pool with an explicit worker count (minimum 1).
    pub fn with_workers(count: usize) -> Self {
        let shared = Arc::new(PoolShared {
            queue: Mutex::new(BinaryHeap::new()),
            cvar: Condvar::new(),
            accepting: AtomicBool::new(true),
            terminate: AtomicBool::new(false),
            seq: AtomicU64::new(0),
            next_id: AtomicU64::new(1),
            monitor: Monitor::new(256),
        });

        let workers = (0..count.max(1))
            .map(|i| {
                let shared = Arc::clone(&shared);
                std::thread::Builder::new()
                    .name(format!("ck3-pool-{i}"))
                    .spawn(move || worker_loop(shared))
            })
            .collect::<Result<Vec<_>, _>>()
            .unwrap_or_default();

        Self { shared, workers: Mutex::new(workers) }
    }

    /// Submit `func` at `priority` under a monitoring `name`.
    ///
    /// The closure receives the task's cancellation token and should check it
    /// at phase boundaries. The returned handle yields the closure's value,
    /// or a [`TaskError`] if it was cancelled or panicked.
    pub fn submit<T, F>(&self, func: F, priority: Priority, name: &str) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(&CancellationToken) -> T + Send + 'static,
    {
        let token = CancellationToken::new();
        let state = Arc::new(HandleState {
            slot: Mutex::new(None),
            cvar: Condvar::new(),
            token: token.clone(),
        });
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = TaskHandle { state: Arc::clone(&state), id };

        if !self.shared.accepting.load(Ordering::Acquire) {
            *state.slot.lock() = Some(Err(TaskError::Shutdown));
            state.cvar.notify_all();
            return handle;
        }

        self.shared.monitor.record_submitted(id, name);

        let shared = Arc::clone(&self.shared);
        let job_token = token.clone();
        let job: Job = Box::new(move || {
            if job_token.is_cancelled() {
                shared.monitor.record_started(id);
                shared.monitor.record_finished(id, TaskStatus::Cancelled, None);
                *state.slot.lock() = Some(Err(TaskError::Cancelled));
                state.cvar.notify_all();
                return;
            }
            shared.monitor.record_started(id);
            let outcome = catch_unwind(AssertUnwindSafe(|| func(&job_token)));
            let result = match outcome {
                Ok(value) if job_token.is_cancelled() => {
                    shared.monitor.record_finished(id, TaskStatus::Cancelled, None);
                    // The task ran to completion despite cancellation; the
                    // value is still delivered so late awaiters can decide.
                    Ok(value)
                }
                Ok(value) => {
                    shared.monitor.record_finished(id, TaskStatus::Completed, None);
                    Ok(value)
                }
                Err(payload) => {
                    let text = panic_text(payload);
                    tracing::error!(task = id, error = %text, "pool task panicked");
                    shared.monitor.record_finished(id, TaskStatus::Failed, Some(text.clone()));
                    Err(TaskError::Panicked(text))
                }
            };
            *state.slot.lock() = Some(result);
            state.cvar.notify_all();
        });

        let seq = self.shared.seq.fetch_add(1, Ordering::Relaxed);
        self.shared.queue.lock().push(QueuedTask { priority, seq, job, token });
        self.shared.cvar.notify_one();
        handle
    }

    /// Aggregate counters.
    pub fn stats(&self) -> PoolStats {
        self.shared.monitor.stats()
    }

    /// Task record history, oldest first.
    pub fn task_records(&self) -> Vec<TaskRecord> {
        self.shared.monitor.records()
    }

    /// Stop the pool.
    ///
    /// With `wait` set, queued and running work is given until `timeout` to
    /// drain; the pool keeps accepting follow-up submissions from running
    /// tasks (staged pipelines queue their next phase mid-task) until the
    /// drain completes or times out. Afterwards (or immediately when `wait`
    /// is false) still-queued tasks are cancelled and running tasks are
    /// signalled. Cancellation of running tasks is cooperative - they are
    /// expected to return at their next phase boundary.
    pub fn shutdown(&self, wait: bool, timeout: Duration) {
        if wait {
            let deadline = Instant::now() + timeout;
            loop {
                let stats = self.shared.monitor.stats();
                if stats.queued == 0 && stats.active == 0 {
                    break;
                }
                if Instant::now() >= deadline {
                    break;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        }
        self.shared.accepting.store(false, Ordering::Release);

        // Cancel whatever is still queued.
        {
            let drained: Vec<QueuedTask> = {
                let mut queue = self.shared.queue.lock();
                queue.drain().collect()
            };
            for task in drained {
                task.token.cancel();
                // Run the wrapper so the handle resolves to Cancelled and the
                // monitor counters stay balanced.
                (task.job)();
            }
        }

        self.shared.terminate.store(true, Ordering::Release);
        {
            let _guard = self.shared.queue.lock();
            self.shared.cvar.notify_all();
        }

        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            let _ = worker.join();
        }
    }
}

impl Default for PriorityThreadPool {
    fn default() -> Self {
        Self::new()
    }
}

fn worker_loop(shared: Arc<PoolShared>) {
    loop {
        let task = {
            let mut queue = shared.queue.lock();
            loop {
                if let Some(task) = queue.pop() {
                    break task;
                }
                if shared.terminate.load(Ordering::Acquire) {
                    return;
                }
                shared.cvar.wait(&mut queue);
            }
        };
        (task.job)();
    }
}

fn panic_text(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn submit_and_wait_returns_value() {
        let pool = PriorityThreadPool::with_workers(2);
        let handle = pool.submit(|_| 21 * 2, Priority::High, "answer");
        assert_eq!(handle.wait(), Ok(42));
        pool.shutdown(true, Duration::from_secs(1));
    }

    #[test]
    fn priority_order_under_contention() {
        // One worker pinned by a gate so queued tasks drain strictly by priority.
        let pool = PriorityThreadPool::with_workers(1);
        let gate = Arc::new(AtomicBool::new(false));
        let order = Arc::new(Mutex::new(Vec::new()));

        let gate_in_task = Arc::clone(&gate);
        let blocker = pool.submit(
            move |_| {
                while !gate_in_task.load(Ordering::Acquire) {
                    std::thread::sleep(Duration::from_millis(1));
                }
            },
            Priority::Critical,
            "gate",
        );

        let mut handles = Vec::new();
        for (priority, tag) in [
            (Priority::Low, "low"),
            (Priority::Normal, "normal"),
            (Priority::Critical, "critical"),
            (Priority::High, "high"),
        ] {
            let order = Arc::clone(&order);
            handles.push(pool.submit(
                move |_| order.lock().push(tag),
                priority,
                tag,
            ));
        }

        gate.store(true, Ordering::Release);
        blocker.wait().unwrap();
        for handle in handles {
            handle.wait().unwrap();
        }
        assert_eq!(*order.lock(), vec!["critical", "high", "normal", "low"]);
        pool.shutdown(true, Duration::from_secs(1));
    }

    #[test]
    fn fifo_within_a_priority() {
        let pool = PriorityThreadPool::with_workers(1);
        let gate = Arc::new(AtomicBool::new(false));
        let order = Arc::new(Mutex::new(Vec::new()));

        let gate_in_task = Arc::clone(&gate);
        let blocker = pool.submit(
            move |_| {
                while !gate_in_task.load(Ordering::Acquire) {
                    std::thread::sleep(Duration::from_millis(1));
                }
            },
            Priority::Critical,
            "gate",
        );

        let mut handles = Vec::new();
        for i in 0..5usize {
            let order = Arc::clone(&order);
            handles.push(pool.submit(move |_| order.lock().push(i), Priority::Normal, "n"));
        }
        gate.store(true, Ordering::Release);
        blocker.wait().unwrap();
        for handle in handles {
            handle.wait().unwrap();
        }
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
        pool.shutdown(true, Duration::from_secs(1));
    }

    #[test]
    fn panics_are_captured_not_fatal() {
        let pool = PriorityThreadPool::with_workers(1);
        let bad = pool.submit(|_| -> usize { panic!("boom") }, Priority::High, "bad");
        match bad.wait() {
            Err(TaskError::Panicked(text)) => assert!(text.contains("boom")),
            other => panic!("expected panic capture, got {other:?}"),
        }
        // The worker survived and still runs tasks.
        let ok = pool.submit(|_| 7, Priority::High, "ok");
        assert_eq!(ok.wait(), Ok(7));
        assert_eq!(pool.stats().failed, 1);
        pool.shutdown(true, Duration::from_secs(1));
    }

    #[test]
    fn cancelled_before_run_resolves_cancelled() {
        let pool = PriorityThreadPool::with_workers(1);
        let gate = Arc::new(AtomicBool::new(false));
        let gate_in_task = Arc::clone(&gate);
        let blocker = pool.submit(
            move |_| {
                while !gate_in_task.load(Ordering::Acquire) {
                    std::thread::sleep(Duration::from_millis(1));
                }
            },
            Priority::Critical,
            "gate",
        );

        let ran = Arc::new(AtomicUsize::new(0));
        let ran_in_task = Arc::clone(&ran);
        let victim = pool.submit(
            move |_| {
                ran_in_task.fetch_add(1, Ordering::SeqCst);
            },
            Priority::Low,
            "victim",
        );
        victim.cancel();
        gate.store(true, Ordering::Release);
        blocker.wait().unwrap();
        assert_eq!(victim.wait(), Err(TaskError::Cancelled));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        pool.shutdown(true, Duration::from_secs(1));
    }

    #[test]
    fn shutdown_rejects_new_work() {
        let pool = PriorityThreadPool::with_workers(1);
        pool.shutdown(true, Duration::from_millis(100));
        let handle = pool.submit(|_| 1, Priority::High, "late");
        assert_eq!(handle.wait(), Err(TaskError::Shutdown));
    }

    #[test]
    fn shutdown_wait_drains_follow_up_submissions() {
        // A running task may queue its next phase; a waiting shutdown must
        // let that phase run instead of rejecting it mid-drain.
        let pool = Arc::new(PriorityThreadPool::with_workers(1));
        let finished = Arc::new(AtomicBool::new(false));

        let inner_pool = Arc::clone(&pool);
        let inner_flag = Arc::clone(&finished);
        pool.submit(
            move |_| {
                std::thread::sleep(Duration::from_millis(20));
                inner_pool.submit(
                    move |_| inner_flag.store(true, Ordering::SeqCst),
                    Priority::Normal,
                    "follow-up",
                );
            },
            Priority::High,
            "parent",
        );

        pool.shutdown(true, Duration::from_secs(2));
        assert!(finished.load(Ordering::SeqCst));
    }

    #[test]
    fn default_worker_count_is_bounded() {
        let n = PriorityThreadPool::default_worker_count();
        assert!((1..=4).contains(&n));
    }
}
