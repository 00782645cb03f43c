use crate::core::app_config::AppConfig;
use crate::core::engine::subprocess_engine::SubprocessEngine;
use crate::core::job::execution_manager::{ExecutionManager, ManagerSettings};
use crate::core::persistence::snapshot_store::FileSnapshotStore;
use crate::core::persistence::snapshot_writer::SnapshotWriter;
use crate::core::schedule::schedule_manager::ScheduleManager;
use crate::core::schedule::schedule_timer::ScheduleTimer;
use crate::interface::backup_engine::BackupEngine;
use crate::interface::runnable::Runnable;
use crate::interface::snapshot_store::SnapshotStore;
use crate::model::config::Config;
use crate::model::error::Error;
use crate::model::error::system::SystemError;
use crate::model::log::system::SystemLog;
use crate::utils::logging::Logging;
use macros::log;
use std::sync::Arc;
use tokio::signal;

/// Composition root. Owns every long-lived component; nothing is global.
pub struct System {
    app_config: Arc<AppConfig>,
    execution_manager: Arc<ExecutionManager>,
    schedule_manager: Arc<ScheduleManager>,
    schedule_timer: Arc<ScheduleTimer>,
    snapshot_writer: Arc<SnapshotWriter>,
}

impl System {
    pub async fn initialize() -> Result<Self, Error> {
        let app_config = Arc::new(AppConfig::new()?);
        Logging::initialize(&app_config.log_directory)?;
        log!(SystemLog::Initializing);

        let config: &Config = &app_config;
        let engine: Arc<dyn BackupEngine> = Arc::new(SubprocessEngine::new(config.engine.clone()));
        let execution_manager = Arc::new(ExecutionManager::new(
            engine,
            ManagerSettings::from(config),
        ));
        let schedule_manager = Arc::new(ScheduleManager::new(
            execution_manager.clone(),
            app_config.time_zone(),
        ));
        let store: Arc<dyn SnapshotStore> =
            Arc::new(FileSnapshotStore::new(config.snapshot_path.clone()));
        let snapshot_writer = Arc::new(SnapshotWriter::new(
            execution_manager.clone(),
            schedule_manager.clone(),
            store,
            app_config.snapshot_duration(),
        ));
        snapshot_writer.restore().await?;
        let schedule_timer = Arc::new(ScheduleTimer::new(
            schedule_manager.clone(),
            app_config.default_wakeup_duration(),
        ));

        log!(SystemLog::InitializeComplete);
        Ok(System {
            app_config,
            execution_manager,
            schedule_manager,
            schedule_timer,
            snapshot_writer,
        })
    }

    pub fn app_config(&self) -> Arc<AppConfig> {
        self.app_config.clone()
    }

    /// Entry point for host lifecycle hooks and filesystem watchers.
    pub fn execution_manager(&self) -> Arc<ExecutionManager> {
        self.execution_manager.clone()
    }

    pub fn schedule_manager(&self) -> Arc<ScheduleManager> {
        self.schedule_manager.clone()
    }

    /// Runs the schedule timer and periodic snapshots until Ctrl-C.
    pub async fn run(&self) -> Result<(), Error> {
        let (timer_shutdown_tx, timer_handle) = self.schedule_timer.clone().run();
        let (writer_shutdown_tx, writer_handle) = self.snapshot_writer.clone().run();
        log!(SystemLog::Online);

        let signal = signal::ctrl_c().await;

        timer_shutdown_tx
            .send(())
            .map_err(|_| SystemError::ShutdownSignalFailed)?;
        writer_shutdown_tx
            .send(())
            .map_err(|_| SystemError::ShutdownSignalFailed)?;
        timer_handle.await.map_err(SystemError::thread_panic)?;
        writer_handle.await.map_err(SystemError::thread_panic)?;

        signal.map_err(|_| SystemError::ShutdownSignalFailed)?;
        Ok(())
    }

    /// Stops engine runs and writes a final snapshot. Jobs that were running
    /// are recorded as such and resume on the next start.
    pub async fn terminate(&self) {
        log!(SystemLog::Terminating);
        self.execution_manager.shutdown().await;
        if let Err(err) = self.snapshot_writer.save().await {
            log!(err);
        }
        log!(SystemLog::TerminateComplete);
    }
}
