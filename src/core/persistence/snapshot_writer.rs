use crate::core::job::execution_manager::ExecutionManager;
use crate::core::schedule::schedule_manager::ScheduleManager;
use crate::interface::runnable::Runnable;
use crate::interface::snapshot_store::SnapshotStore;
use crate::model::error::Error;
use crate::model::log::system::SystemLog;
use crate::model::snapshot::ManagerSnapshot;
use async_trait::async_trait;
use macros::log;
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio::sync::oneshot::Receiver;
use tokio::time::{MissedTickBehavior, interval};

/// Collects queue and schedules into one snapshot and hands it to the store,
/// on demand and every `period` while running.
pub struct SnapshotWriter {
    execution_manager: Arc<ExecutionManager>,
    schedule_manager: Arc<ScheduleManager>,
    store: Arc<dyn SnapshotStore>,
    period: Duration,
}

impl SnapshotWriter {
    pub fn new(
        execution_manager: Arc<ExecutionManager>,
        schedule_manager: Arc<ScheduleManager>,
        store: Arc<dyn SnapshotStore>,
        period: Duration,
    ) -> Self {
        SnapshotWriter {
            execution_manager,
            schedule_manager,
            store,
            period,
        }
    }

    pub async fn collect(&self) -> ManagerSnapshot {
        self.execution_manager
            .snapshot(self.schedule_manager.get_all_schedules())
            .await
    }

    pub async fn save(&self) -> Result<(), Error> {
        let snapshot = self.collect().await;
        self.store.save(&snapshot).await?;
        log!(SystemLog::SnapshotSaved);
        Ok(())
    }

    /// Loads the last snapshot into both managers. Returns `false` when there
    /// was nothing to load.
    pub async fn restore(&self) -> Result<bool, Error> {
        let Some(snapshot) = self.store.load().await? else {
            log!(SystemLog::SnapshotMissing);
            return Ok(false);
        };
        let jobs = snapshot.queue.entries.len();
        let schedules = snapshot.schedules.len();
        self.schedule_manager.restore(snapshot.schedules.clone());
        self.execution_manager.restore(snapshot).await?;
        log!(SystemLog::SnapshotRestored { jobs, schedules });
        Ok(true)
    }
}

#[async_trait]
impl Runnable for SnapshotWriter {
    async fn run_impl(self: Arc<Self>, mut shutdown_rx: Receiver<()>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            select! {
                biased;
                _ = &mut shutdown_rx => { break; }
                _ = ticker.tick() => {}
            }
            if let Err(err) = self.save().await {
                log!(err);
            }
        }
    }
}
