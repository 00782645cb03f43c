use crate::core::job::execution_manager::ExecutionManager;
use crate::interface::backup_engine::{BackupEngine, EngineHandle};
use crate::model::engine::engine_command::EngineCommand;
use crate::model::engine::engine_event::EngineEvent;
use crate::model::job::backup_job::{FailureKind, JobFailure};
use futures::StreamExt;
use macros::log;
use std::sync::Arc;
use uuid::Uuid;

/// One engine run the manager decided to launch. The generation tells this
/// run apart from earlier runs of the same job.
#[derive(Debug, Clone, PartialEq)]
pub struct RunLaunch {
    pub job_id: Uuid,
    pub generation: u64,
    pub command: EngineCommand,
}

/// Drives a single engine run and forwards its events to the manager.
pub struct ExecutionRunner {
    manager: Arc<ExecutionManager>,
    engine: Arc<dyn BackupEngine>,
    launch: RunLaunch,
}

impl ExecutionRunner {
    pub fn new(
        manager: Arc<ExecutionManager>,
        engine: Arc<dyn BackupEngine>,
        launch: RunLaunch,
    ) -> Self {
        ExecutionRunner {
            manager,
            engine,
            launch,
        }
    }

    pub async fn run(self) {
        let RunLaunch {
            job_id,
            generation,
            command,
        } = self.launch;

        let EngineHandle { mut events, stop } = match self.engine.launch(command).await {
            Ok(handle) => handle,
            Err(err) => {
                log!(err);
                let failure = JobFailure::new(FailureKind::Launch, err.to_string());
                self.manager
                    .apply_event(job_id, generation, EngineEvent::Failed(failure))
                    .await;
                return;
            }
        };

        if !self.manager.attach_run(job_id, generation, stop).await {
            return;
        }

        while let Some(event) = events.next().await {
            let terminal = event.is_terminal();
            let current = self.manager.apply_event(job_id, generation, event).await;
            if terminal || !current {
                return;
            }
        }

        let failure = JobFailure::new(
            FailureKind::StreamClosed,
            "engine event stream ended without a result",
        );
        self.manager
            .apply_event(job_id, generation, EngineEvent::Failed(failure))
            .await;
    }
}
