use crate::core::job::execution_manager::ExecutionManager;
use crate::interface::backup_engine::{BackupEngine, EngineHandle};
use crate::model::engine::engine_command::EngineCommand;
use crate::model::engine::engine_event::EngineEvent;
use crate::model::error::Error;
use crate::model::error::engine::EngineError;
use crate::model::job::backup_job::{BackupJob, JobStatus};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// One launched run, handed to the test so it can play the engine's part.
pub struct ScriptedRun {
    pub command: EngineCommand,
    pub events: mpsc::UnboundedSender<EngineEvent>,
    pub stopped: oneshot::Receiver<()>,
}

pub struct ScriptedEngine {
    launched_tx: mpsc::UnboundedSender<ScriptedRun>,
}

impl ScriptedEngine {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ScriptedRun>) {
        let (launched_tx, launched_rx) = mpsc::unbounded_channel();
        (Arc::new(ScriptedEngine { launched_tx }), launched_rx)
    }
}

#[async_trait]
impl BackupEngine for ScriptedEngine {
    async fn launch(&self, command: EngineCommand) -> Result<EngineHandle, Error> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();
        let _ = self.launched_tx.send(ScriptedRun {
            command,
            events: event_tx,
            stopped: stop_rx,
        });
        Ok(EngineHandle {
            events: UnboundedReceiverStream::new(event_rx).boxed(),
            stop: stop_tx,
        })
    }
}

pub struct FailingEngine;

#[async_trait]
impl BackupEngine for FailingEngine {
    async fn launch(&self, _command: EngineCommand) -> Result<EngineHandle, Error> {
        Err(EngineError::spawn_failed("missing-engine", "No such file or directory").into())
    }
}

pub async fn next_run(runs: &mut mpsc::UnboundedReceiver<ScriptedRun>) -> ScriptedRun {
    tokio::time::timeout(WAIT_LIMIT, runs.recv())
        .await
        .expect("engine was never launched")
        .expect("engine channel closed")
}

pub async fn wait_for_job(
    manager: &ExecutionManager,
    id: Uuid,
    mut condition: impl FnMut(&BackupJob) -> bool,
) -> BackupJob {
    let result = tokio::time::timeout(WAIT_LIMIT, async {
        loop {
            if let Some(job) = manager.job(id).await {
                if condition(&job) {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    result.unwrap_or_else(|_| panic!("job {id} never reached the expected state"))
}

pub async fn wait_for_status(manager: &ExecutionManager, id: Uuid, status: JobStatus) -> BackupJob {
    wait_for_job(manager, id, |job| job.status() == status).await
}
