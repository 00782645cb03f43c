use macros::traceable;
use std::path::PathBuf;

traceable! {
    SystemError {
        #[error("Configuration not found: {path:?}: {err}")]
        ConfigNotFound { path: PathBuf } => tracing::Level::ERROR,

        #[error("Invalid configuration: {err}")]
        InvalidConfig => tracing::Level::ERROR,

        #[no_source]
        #[error("Invalid configuration field: {field}")]
        InvalidConfigField { field: String } => tracing::Level::ERROR,

        #[no_source]
        #[error("Unknown time zone: {name}")]
        InvalidTimeZone { name: String } => tracing::Level::ERROR,

        #[error("Failed to initialize logging: {err}")]
        LoggingInitFailed => tracing::Level::ERROR,

        #[no_source]
        #[error("Failed to send shutdown signal")]
        ShutdownSignalFailed => tracing::Level::ERROR,

        #[error("Task panicked: {err}")]
        ThreadPanic => tracing::Level::ERROR,
    }
}
