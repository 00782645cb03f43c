use macros::loggable;
use uuid::Uuid;

loggable! {
    JobLog {
        #[error("Job {id} queued")]
        Enqueued { id: Uuid } => tracing::Level::INFO,

        #[error("Job {id} started")]
        Started { id: Uuid } => tracing::Level::INFO,

        #[error("Job {id} completed")]
        Completed { id: Uuid } => tracing::Level::INFO,

        #[error("Job {id} failed: {message}")]
        Failed { id: Uuid, message: String } => tracing::Level::WARN,

        #[error("Job {id} cancelled")]
        Cancelled { id: Uuid } => tracing::Level::INFO,

        #[error("Job {id} paused")]
        Paused { id: Uuid } => tracing::Level::INFO,

        #[error("Job {id} resumed")]
        Resumed { id: Uuid } => tracing::Level::INFO,

        #[error("Job {id} requeued for attempt {attempt}")]
        Retried { id: Uuid, attempt: u32 } => tracing::Level::INFO,

        #[error("Job {id} removed")]
        Removed { id: Uuid } => tracing::Level::INFO,

        /// Silent no-op on a transition the state machine does not allow.
        #[error("Ignored transition of job {id} from {from} to {to}")]
        TransitionIgnored { id: Uuid, from: String, to: String } => tracing::Level::DEBUG,

        #[error("Job {id} stays paused, no free slot")]
        ResumeDeferred { id: Uuid } => tracing::Level::WARN,

        #[error("Dropped stale engine event for job {id}")]
        StaleEvent { id: Uuid } => tracing::Level::TRACE,
    }
}
