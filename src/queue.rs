use super::handle::Task;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// FIFO buffer of pending tasks shared by the submission side and the workers.
///
/// Every access to the sequence goes through one mutex; the condvar carries
/// both "task available" and "queue closed" events. Waiters re-check the
/// predicate after each wakeup under the lock, so a notification can never
/// be lost.
pub struct JobQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

struct QueueState {
    jobs: VecDeque<Task>,
    running: bool,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                running: true,
            }),
            available: Condvar::new(),
        }
    }

    /// Append a task at the tail and wake one waiting worker.
    ///
    /// Hands the task back when the queue has been closed, so the caller
    /// decides between an error and a silent drop.
    pub fn push(&self, task: Task) -> Result<(), Task> {
        let mut state = self.state.lock().unwrap();
        if !state.running {
            return Err(task);
        }
        state.jobs.push_back(task);
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    /// Take the oldest task, blocking while the queue is empty and running.
    ///
    /// Returns `None` only once the queue is closed AND fully drained, so a
    /// close never discards queued work.
    pub fn pop(&self) -> Option<Task> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(task) = state.jobs.pop_front() {
                return Some(task);
            }
            if !state.running {
                return None;
            }
            state = self.available.wait(state).unwrap();
        }
    }

    /// Stop accepting tasks and wake every waiting worker.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.running = false;
        drop(state);
        self.available.notify_all();
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().jobs.is_empty()
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}
