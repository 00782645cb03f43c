use crate::model::job::backup_job::JobStatus;
use macros::traceable;
use uuid::Uuid;

traceable! {
    JobError {
        #[no_source]
        #[error("Job already queued: {id}")]
        DuplicateJob { id: Uuid } => tracing::Level::WARN,

        #[no_source]
        #[error("Source {descriptor} is already being handled by job {id}")]
        DuplicateSource { id: Uuid, descriptor: String } => tracing::Level::WARN,

        #[no_source]
        #[error("Job not found: {id}")]
        JobNotFound { id: Uuid } => tracing::Level::WARN,

        #[no_source]
        #[error("Concurrency limit of {limit} running jobs reached")]
        ConcurrencyLimitExceeded { limit: usize } => tracing::Level::WARN,

        #[no_source]
        #[error("Job {id} already retried {attempts} times")]
        RetryLimitExceeded { id: Uuid, attempts: u32 } => tracing::Level::WARN,

        #[no_source]
        #[error("Job {id} cannot move from {from:?} to {to:?}")]
        InvalidTransition { id: Uuid, from: JobStatus, to: JobStatus } => tracing::Level::DEBUG,

        #[no_source]
        #[error("Rejected out-of-range progress for job {id}")]
        InvalidProgress { id: Uuid } => tracing::Level::WARN,

        #[no_source]
        #[error("Invalid concurrency limit: {value}")]
        InvalidConcurrencyLimit { value: usize } => tracing::Level::WARN,
    }
}
