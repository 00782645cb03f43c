use crate::core::schedule::schedule_manager::ScheduleManager;
use crate::interface::runnable::Runnable;
use crate::model::log::schedule::ScheduleLog;
use async_trait::async_trait;
use chrono::Utc;
use macros::log;
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio::sync::Notify;
use tokio::sync::oneshot::Receiver;
use tokio::time::sleep;

pub struct ScheduleTimer {
    schedule_manager: Arc<ScheduleManager>,
    default_wakeup_time: Duration,
    refresh_notify: Arc<Notify>,
}

impl ScheduleTimer {
    pub fn new(schedule_manager: Arc<ScheduleManager>, default_wakeup_time: Duration) -> Self {
        let refresh_notify = schedule_manager.refresh_notify();
        ScheduleTimer {
            schedule_manager,
            default_wakeup_time,
            refresh_notify,
        }
    }

    /// Time until the earliest trigger, never longer than the default wakeup
    /// so wall-clock jumps are noticed.
    fn sleep_duration(&self) -> Duration {
        match self.schedule_manager.earliest_next_run() {
            Some(next_run_time) => (next_run_time - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO)
                .min(self.default_wakeup_time),
            None => self.default_wakeup_time,
        }
    }
}

#[async_trait]
impl Runnable for ScheduleTimer {
    async fn run_impl(self: Arc<Self>, mut shutdown_rx: Receiver<()>) {
        loop {
            let sleep_time = self.sleep_duration();
            select! {
                biased;
                _ = &mut shutdown_rx => { break; }
                _ = self.refresh_notify.notified() => { continue; }
                _ = sleep(sleep_time) => {}
            }
            self.schedule_manager
                .execute_ready_schedules(Utc::now())
                .await;
        }
        log!(ScheduleLog::TimerStopped);
    }
}
