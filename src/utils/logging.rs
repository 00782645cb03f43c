use crate::model::error::Error;
use crate::model::error::io::IOError;
use crate::model::error::system::SystemError;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

const LOG_FILE_PREFIX: &str = "jobsphere.log";
const DEFAULT_FILTER: &str = "info";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

pub struct Logging;

impl Logging {
    /// Installs the global subscriber: stdout plus a daily rolling file in
    /// `directory`. `RUST_LOG` overrides the default `info` filter. Calling it
    /// again is a no-op.
    pub fn initialize(directory: &Path) -> Result<(), Error> {
        if LOG_GUARD.get().is_some() {
            return Ok(());
        }

        fs::create_dir_all(directory)
            .map_err(|err| IOError::create_directory_failed(directory, err))?;
        let file_appender = rolling::daily(directory, LOG_FILE_PREFIX);
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let stdout_layer = fmt::layer().with_writer(std::io::stdout);
        let file_layer = fmt::layer().with_ansi(false).with_writer(file_writer);

        let subscriber = Registry::default()
            .with(env_filter)
            .with(stdout_layer)
            .with(file_layer);
        tracing::subscriber::set_global_default(subscriber)
            .map_err(SystemError::logging_init_failed)?;
        let _ = LOG_GUARD.set(guard);

        log_panics::init();
        Ok(())
    }
}
