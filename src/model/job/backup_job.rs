use crate::model::job::job_progress::JobProgress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Admission order: `High` is served before `Normal`, `Normal` before `Low`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JobPriority {
    High,
    Normal,
    Low,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Pending, running and paused jobs still own their source.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Running | Self::Paused)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOperation {
    Backup,
    Restore,
    Verify,
}

impl JobOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Backup => "backup",
            Self::Restore => "restore",
            Self::Verify => "verify",
        }
    }
}

/// Repository plus the paths a job works on. Two active jobs may not share one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceDescriptor {
    pub repository: String,
    pub paths: Vec<PathBuf>,
}

impl SourceDescriptor {
    pub fn new(repository: impl Into<String>, paths: Vec<PathBuf>) -> Self {
        Self {
            repository: repository.into(),
            paths,
        }
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.repository)?;
        for path in &self.paths {
            write!(f, " {}", path.display())?;
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The engine reported the failure itself.
    Engine,
    ProcessExited,
    /// The event stream ended before a terminal event.
    StreamClosed,
    Launch,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl JobFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BackupJob {
    pub(crate) id: Uuid,
    pub(crate) priority: JobPriority,
    pub(crate) status: JobStatus,
    pub(crate) progress: JobProgress,
    pub(crate) error: Option<JobFailure>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
    pub(crate) retry_count: u32,
    pub(crate) operation: JobOperation,
    pub(crate) source: SourceDescriptor,
    pub(crate) schedule_id: Option<Uuid>,
}

impl BackupJob {
    pub fn new(operation: JobOperation, source: SourceDescriptor, priority: JobPriority) -> Self {
        Self {
            id: Uuid::new_v4(),
            priority,
            status: JobStatus::Pending,
            progress: JobProgress::default(),
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            retry_count: 0,
            operation,
            source,
            schedule_id: None,
        }
    }

    /// Ad hoc backup of a single changed path, as raised by a filesystem watcher.
    pub fn for_path(repository: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::new(
            JobOperation::Backup,
            SourceDescriptor::new(repository, vec![path.into()]),
            JobPriority::Normal,
        )
    }

    pub fn with_schedule(mut self, schedule_id: Uuid) -> Self {
        self.schedule_id = Some(schedule_id);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn priority(&self) -> JobPriority {
        self.priority
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn progress(&self) -> &JobProgress {
        &self.progress
    }

    pub fn error(&self) -> Option<&JobFailure> {
        self.error.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn operation(&self) -> JobOperation {
        self.operation
    }

    pub fn source(&self) -> &SourceDescriptor {
        &self.source
    }

    pub fn schedule_id(&self) -> Option<Uuid> {
        self.schedule_id
    }

    /// Replaces the progress counters. Counters whose processed value exceeds
    /// the total are rejected and the previous progress is kept.
    pub fn set_progress(&mut self, progress: JobProgress) -> bool {
        if !progress.is_within_bounds() {
            return false;
        }
        self.progress = progress;
        true
    }
}
