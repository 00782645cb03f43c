use serde::{Deserialize, Serialize};

/// Consistent view of the queue taken under a single lock.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct JobStatistics {
    pub pending: usize,
    pub running: usize,
    pub paused: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Mean overall progress in `[0, 100]` over every held job.
    pub overall_progress: f64,
    pub max_concurrent_jobs: usize,
    pub is_paused: bool,
}

impl JobStatistics {
    pub fn total(&self) -> usize {
        self.pending + self.running + self.paused + self.completed + self.failed + self.cancelled
    }
}
