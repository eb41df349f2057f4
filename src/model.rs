#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub workers: usize,
    pub idle_workers: usize,
    pub queued_tasks: usize,
    pub total_spawned: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
}

impl PoolMetrics {
    pub fn utilization(&self) -> f64 {
        if self.workers == 0 {
            return 0.0;
        }
        (self.workers - self.idle_workers.min(self.workers)) as f64 / self.workers as f64
    }

    pub fn queue_pressure(&self) -> f64 {
        self.queued_tasks as f64
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.completed_tasks + self.failed_tasks;
        if total == 0 {
            return 1.0;
        }
        self.completed_tasks as f64 / total as f64
    }
}
