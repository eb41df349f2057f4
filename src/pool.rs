use super::{
    errors::SpawnError,
    result::SpawnResult,
    handle::{
        Task,
        JoinHandle,
    },
    model::PoolMetrics,
    queue::JobQueue,
};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
};
use crossbeam::channel;
use tracing::{debug, trace, warn};


/// Pool sizing and elasticity configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub initial_threads: usize,
    pub max_threads: usize,
    pub elastic: bool,
}

impl Default for Config {
    fn default() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            initial_threads: num_cpus,
            max_threads: num_cpus * 4,
            elastic: false,
        }
    }
}

impl Config {
    /// Exactly `threads` workers for the lifetime of the pool.
    pub fn fixed(threads: usize) -> Self {
        Self {
            initial_threads: threads,
            max_threads: threads,
            elastic: false,
        }
    }

    /// Start with `initial` workers, burst up to `max` under load and
    /// contract back toward `initial` afterwards.
    pub fn elastic(initial: usize, max: usize) -> Self {
        Self {
            initial_threads: initial,
            max_threads: max,
            elastic: true,
        }
    }
}


pub type ThreadPool = Arc<ThreadPoolInner>;

/// Worker-thread pool over one shared FIFO queue
pub struct ThreadPoolInner {
    queue: Arc<JobQueue>,
    shared: Arc<WorkerShared>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
    config: Config,
}

/// Counters the workers keep updating after the pool handle is gone.
/// Workers capture this block and the queue, never the pool itself, so
/// dropping the last pool handle can still join them.
struct WorkerShared {
    idle_workers: AtomicUsize,
    live_workers: AtomicUsize,
    next_worker_id: AtomicUsize,
    total_spawned: AtomicUsize,
    completed_tasks: AtomicUsize,
    failed_tasks: AtomicUsize,
}

impl WorkerShared {
    fn new() -> Self {
        Self {
            idle_workers: AtomicUsize::new(0),
            live_workers: AtomicUsize::new(0),
            next_worker_id: AtomicUsize::new(0),
            total_spawned: AtomicUsize::new(0),
            completed_tasks: AtomicUsize::new(0),
            failed_tasks: AtomicUsize::new(0),
        }
    }

    /// Fetch-execute loop run by every worker thread.
    ///
    /// A worker only evaluates the stop condition between tasks: `pop`
    /// returns `None` strictly after the queue is closed and drained, so
    /// nothing already enqueued is ever abandoned.
    fn worker_loop(&self, queue: &JobQueue, initial_threads: usize, elastic: bool) {
        loop {
            let task = match queue.pop() {
                Some(task) => task,
                None => break,
            };

            self.idle_workers.fetch_sub(1, Ordering::SeqCst);
            task();

            // Shrink heuristic carried over as-is: any worker may leave right
            // after finishing a task while others sit idle and the pool is
            // above its initial size, even before a burst fully drains.
            if elastic
                && self.idle_workers.load(Ordering::SeqCst) > 0
                && self.live_workers.load(Ordering::SeqCst) > initial_threads
            {
                self.live_workers.fetch_sub(1, Ordering::SeqCst);
                trace!("idle worker exiting, pool above initial size");
                return;
            }

            self.idle_workers.fetch_add(1, Ordering::SeqCst);
        }

        // Stop path: this worker was counted idle while waiting.
        self.idle_workers.fetch_sub(1, Ordering::SeqCst);
        self.live_workers.fetch_sub(1, Ordering::SeqCst);
        trace!("worker exiting, queue closed and drained");
    }
}

impl ThreadPoolInner {
    /// Fixed-size pool with `initial_threads` workers.
    pub fn new(initial_threads: usize) -> Result<ThreadPool, SpawnError> {
        Self::with_config(Config::fixed(initial_threads))
    }

    pub fn with_config(config: Config) -> Result<ThreadPool, SpawnError> {
        assert!(config.initial_threads > 0, "pool must start with at least one worker");
        assert!(
            config.max_threads >= config.initial_threads,
            "pool maximum size cannot be below its initial size"
        );

        let pool = Arc::new(ThreadPoolInner {
            queue: Arc::new(JobQueue::new()),
            shared: Arc::new(WorkerShared::new()),
            workers: Mutex::new(Vec::new()),
            config: config.clone(),
        });

        // Spawn failure here is fatal: join whatever did start and bail.
        if let Err(err) = pool.add_workers(config.initial_threads) {
            pool.shutdown();
            return Err(err);
        }

        debug!(
            workers = config.initial_threads,
            max = config.max_threads,
            elastic = config.elastic,
            "pool started"
        );
        Ok(pool)
    }

    /// Submit a task and get a handle to its eventual result.
    ///
    /// The handle is returned immediately; the value, or the panic captured
    /// while running the task, is delivered when a worker finishes it.
    pub fn submit<F, T>(&self, f: F) -> Result<JoinHandle<T>, SpawnError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if !self.queue.is_running() {
            return Err(SpawnError::PoolStopped);
        }
        self.grow_if_busy();

        let (tx, rx) = channel::bounded::<SpawnResult<T>>(1);
        let shared = Arc::clone(&self.shared);

        let task: Task = Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(f))
                .map_err(|payload| SpawnError::Panic(panic_message(payload)));
            if result.is_ok() {
                shared.completed_tasks.fetch_add(1, Ordering::Relaxed);
            } else {
                shared.failed_tasks.fetch_add(1, Ordering::Relaxed);
            }
            // Receiver may already be gone, nobody has to observe a result.
            let _ = tx.send(result);
        });

        match self.queue.push(task) {
            Ok(()) => {
                self.shared.total_spawned.fetch_add(1, Ordering::Relaxed);
                Ok(JoinHandle::new(rx))
            }
            Err(_) => Err(SpawnError::PoolStopped),
        }
    }

    /// Fire-and-forget submission.
    ///
    /// Unlike [`submit`](Self::submit), a stopped pool makes this a silent
    /// no-op rather than an error.
    pub fn submit_detached<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.queue.is_running() {
            return;
        }
        self.grow_if_busy();

        let shared = Arc::clone(&self.shared);
        let task: Task = Box::new(move || {
            match panic::catch_unwind(AssertUnwindSafe(f)) {
                Ok(()) => shared.completed_tasks.fetch_add(1, Ordering::Relaxed),
                Err(_) => shared.failed_tasks.fetch_add(1, Ordering::Relaxed),
            };
        });

        if self.queue.push(task).is_ok() {
            self.shared.total_spawned.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Apply `f` to every element, one task each.
    ///
    /// The returned handles match the input order, independent of the order
    /// in which the tasks actually complete.
    pub fn submit_all<T, R, F, I>(&self, f: F, items: I) -> Result<Vec<JoinHandle<R>>, SpawnError>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
    {
        let f = Arc::new(f);
        let items = items.into_iter();
        let mut handles = Vec::with_capacity(items.size_hint().0);

        for item in items {
            let f = Arc::clone(&f);
            handles.push(self.submit(move || f(item))?);
        }

        Ok(handles)
    }

    /// Workers currently blocked waiting for a task. Best-effort snapshot.
    #[inline]
    pub fn idle_count(&self) -> usize {
        self.shared.idle_workers.load(Ordering::SeqCst)
    }

    /// Workers currently alive. Best-effort snapshot, never above the
    /// configured maximum.
    #[inline]
    pub fn worker_count(&self) -> usize {
        self.shared.live_workers.load(Ordering::SeqCst)
    }

    pub fn queued_tasks(&self) -> usize {
        self.queue.len()
    }

    pub fn is_running(&self) -> bool {
        self.queue.is_running()
    }

    #[inline]
    pub fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            workers: self.shared.live_workers.load(Ordering::Relaxed),
            idle_workers: self.shared.idle_workers.load(Ordering::Relaxed),
            queued_tasks: self.queue.len(),
            total_spawned: self.shared.total_spawned.load(Ordering::Relaxed),
            completed_tasks: self.shared.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.shared.failed_tasks.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting work, finish everything already queued, join every
    /// worker. Safe to call more than once; later calls find nothing to join.
    pub fn shutdown(&self) {
        self.queue.close();

        let handles = {
            let mut workers = self.workers.lock().unwrap();
            std::mem::take(&mut *workers)
        };

        if !handles.is_empty() {
            debug!(workers = handles.len(), "shutting down pool");
        }
        for handle in handles {
            if handle.join().is_err() {
                // Task panics are caught inside the task wrapper, so this
                // only fires if a worker itself died.
                warn!("worker thread terminated abnormally");
            }
        }
    }

    /// Grow-on-submit heuristic: one extra worker when nobody is idle and
    /// there is headroom. A spawn failure here degrades capacity but the
    /// submission itself still goes through on the existing workers.
    fn grow_if_busy(&self) {
        if self.config.elastic
            && self.shared.idle_workers.load(Ordering::SeqCst) < 1
            && self.shared.live_workers.load(Ordering::SeqCst) < self.config.max_threads
        {
            if let Err(err) = self.add_workers(1) {
                debug!(%err, "could not grow pool");
            }
        }
    }

    /// Spawn up to `n` additional workers, never exceeding the configured
    /// maximum. The worker-list lock serializes growth decisions.
    fn add_workers(&self, n: usize) -> Result<(), SpawnError> {
        let mut workers = self.workers.lock().unwrap();
        if !self.queue.is_running() {
            return Err(SpawnError::PoolStopped);
        }

        // Reap handles of workers that already shrank away.
        workers.retain(|handle| !handle.is_finished());

        for _ in 0..n {
            if self.shared.live_workers.load(Ordering::SeqCst) >= self.config.max_threads {
                break;
            }

            let queue = Arc::clone(&self.queue);
            let shared = Arc::clone(&self.shared);
            let initial_threads = self.config.initial_threads;
            let elastic = self.config.elastic;
            let id = self.shared.next_worker_id.fetch_add(1, Ordering::Relaxed);

            // Counted before the thread runs so concurrent growth checks see
            // it; rolled back if the spawn fails.
            self.shared.live_workers.fetch_add(1, Ordering::SeqCst);
            self.shared.idle_workers.fetch_add(1, Ordering::SeqCst);

            let spawned = thread::Builder::new()
                .name(format!("workpool-worker-{}", id))
                .spawn(move || {
                    trace!(id, "worker started");
                    shared.worker_loop(&queue, initial_threads, elastic);
                });

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    self.shared.live_workers.fetch_sub(1, Ordering::SeqCst);
                    self.shared.idle_workers.fetch_sub(1, Ordering::SeqCst);
                    return Err(SpawnError::WorkerSpawn(err.to_string()));
                }
            }
        }

        Ok(())
    }
}

impl Drop for ThreadPoolInner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
