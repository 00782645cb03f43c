use crate::model::job::backup_job::JobFailure;
use crate::model::job::job_progress::JobProgress;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Progress(JobProgress),
    Completed,
    Failed(JobFailure),
}

impl EngineEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}
