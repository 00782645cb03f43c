use crate::model::engine::engine_command::EngineCommand;
use crate::model::engine::engine_event::EngineEvent;
use crate::model::error::Error;
use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::sync::oneshot;

pub type EngineEventStream = BoxStream<'static, EngineEvent>;

/// A launched engine run: its event stream plus the signal that stops it.
pub struct EngineHandle {
    pub events: EngineEventStream,
    pub stop: oneshot::Sender<()>,
}

/// The out-of-process tool that performs the actual backup work.
#[async_trait]
pub trait BackupEngine: Send + Sync + 'static {
    async fn launch(&self, command: EngineCommand) -> Result<EngineHandle, Error>;
}
