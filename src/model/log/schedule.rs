use macros::loggable;
use uuid::Uuid;

loggable! {
    ScheduleLog {
        #[error("Schedule {id} triggered job {job_id}")]
        Triggered { id: Uuid, job_id: Uuid } => tracing::Level::INFO,

        #[error("Schedule {id} skipped, previous run still active")]
        SkippedActive { id: Uuid } => tracing::Level::WARN,

        #[error("Schedule {id} next run at {next}")]
        Advanced { id: Uuid, next: String } => tracing::Level::DEBUG,

        #[error("Schedule {id} has no upcoming trigger")]
        NoNextRun { id: Uuid } => tracing::Level::WARN,

        #[error("Schedule timer stopped")]
        TimerStopped => tracing::Level::INFO,
    }
}
