use macros::loggable;

loggable! {
    SystemLog {
        #[error("Initializing")]
        Initializing => tracing::Level::INFO,

        #[error("Initialization completed")]
        InitializeComplete => tracing::Level::INFO,

        #[error("Online now")]
        Online => tracing::Level::INFO,

        #[error("Termination in process")]
        Terminating => tracing::Level::INFO,

        #[error("Termination completed")]
        TerminateComplete => tracing::Level::INFO,

        #[error("Restored {jobs} jobs and {schedules} schedules from snapshot")]
        SnapshotRestored { jobs: usize, schedules: usize } => tracing::Level::INFO,

        #[error("No snapshot found, starting empty")]
        SnapshotMissing => tracing::Level::INFO,

        #[error("Snapshot saved")]
        SnapshotSaved => tracing::Level::DEBUG,
    }
}
