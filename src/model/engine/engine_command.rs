use crate::model::job::backup_job::{BackupJob, JobOperation, SourceDescriptor};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Descriptor handed to the external engine for one run of a job.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub job_id: Uuid,
    pub operation: JobOperation,
    pub source: SourceDescriptor,
    pub options: EngineOptions,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Continue from the engine's own checkpoint instead of starting over.
    pub resume: bool,
}

impl EngineCommand {
    pub fn for_job(job: &BackupJob, resume: bool) -> Self {
        Self {
            job_id: job.id(),
            operation: job.operation(),
            source: job.source().clone(),
            options: EngineOptions { resume },
        }
    }
}
