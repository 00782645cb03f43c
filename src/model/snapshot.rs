use crate::model::job::backup_job::BackupJob;
use crate::model::schedule::backup_schedule::BackupSchedule;
use serde::{Deserialize, Serialize};

/// A held job plus the enqueue sequence that fixes its place in its tier.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QueuedJob {
    pub sequence: u64,
    pub job: BackupJob,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct QueueSnapshot {
    pub entries: Vec<QueuedJob>,
    pub next_sequence: u64,
}

/// The unit handed to the persistence collaborator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ManagerSnapshot {
    pub queue: QueueSnapshot,
    pub max_concurrent_jobs: usize,
    pub is_paused: bool,
    pub schedules: Vec<BackupSchedule>,
}
