use crate::core::job::execution_runner::{ExecutionRunner, RunLaunch};
use crate::core::job::job_queue::JobQueue;
use crate::core::job::progress_aggregator::ProgressAggregator;
use crate::core::job::state_machine::{Transition, attempt_transition};
use crate::interface::backup_engine::BackupEngine;
use crate::model::config::Config;
use crate::model::engine::engine_command::EngineCommand;
use crate::model::engine::engine_event::EngineEvent;
use crate::model::error::Error;
use crate::model::error::job::JobError;
use crate::model::job::backup_job::*;
use crate::model::job::job_progress::JobProgress;
use crate::model::job::job_statistics::JobStatistics;
use crate::model::job::queue_event::QueueEvent;
use crate::model::log::job::JobLog;
use crate::model::schedule::backup_schedule::BackupSchedule;
use crate::model::snapshot::ManagerSnapshot;
use macros::log;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast, oneshot};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerSettings {
    pub max_concurrent_jobs: usize,
    pub max_retry_attempts: u32,
    /// Run admission right after `enqueue` and `retry` as well.
    pub admit_on_enqueue: bool,
}

impl From<&Config> for ManagerSettings {
    fn from(config: &Config) -> Self {
        ManagerSettings {
            max_concurrent_jobs: config.max_concurrent_jobs,
            max_retry_attempts: config.max_retry_attempts,
            admit_on_enqueue: config.admit_on_enqueue,
        }
    }
}

struct ActiveRun {
    generation: u64,
    stop: Option<oneshot::Sender<()>>,
}

impl ActiveRun {
    fn stop(self) {
        if let Some(stop) = self.stop {
            // The run may already be gone.
            let _ = stop.send(());
        }
    }
}

struct ManagerState {
    queue: JobQueue,
    max_concurrent_jobs: usize,
    is_paused: bool,
    admit_on_enqueue: bool,
    runs: HashMap<Uuid, ActiveRun>,
    next_generation: u64,
}

impl ManagerState {
    fn status_of(&self, id: Uuid) -> Result<JobStatus, Error> {
        self.queue
            .find(id)
            .map(BackupJob::status)
            .ok_or_else(|| JobError::job_not_found(id).into())
    }

    fn has_free_slot(&self) -> bool {
        self.queue.count(JobStatus::Running) < self.max_concurrent_jobs
    }

    fn ids_with(&self, status: JobStatus) -> Vec<Uuid> {
        self.queue
            .iter()
            .filter(|job| job.status() == status)
            .map(BackupJob::id)
            .collect()
    }

    fn is_current(&self, id: Uuid, generation: u64) -> bool {
        self.runs
            .get(&id)
            .is_some_and(|run| run.generation == generation)
    }

    /// Moves the job to running and books a new engine run for it.
    fn launch(&mut self, id: Uuid, transition: Transition) -> Option<RunLaunch> {
        let resume = transition == Transition::Resume;
        let job = self.queue.find_mut(id)?;
        if !attempt_transition(job, transition) {
            return None;
        }
        let command = EngineCommand::for_job(job, resume);

        let generation = self.next_generation;
        self.next_generation += 1;
        let previous = self.runs.insert(
            id,
            ActiveRun {
                generation,
                stop: None,
            },
        );
        if let Some(previous) = previous {
            previous.stop();
        }

        if resume {
            log!(JobLog::Resumed { id });
        } else {
            log!(JobLog::Started { id });
        }
        Some(RunLaunch {
            job_id: id,
            generation,
            command,
        })
    }

    fn release(&mut self, id: Uuid) {
        if let Some(run) = self.runs.remove(&id) {
            run.stop();
        }
    }

    /// Starts pending jobs in queue order while slots are free.
    fn admit(&mut self) -> Vec<RunLaunch> {
        let mut launches = Vec::new();
        if self.is_paused {
            return launches;
        }
        while self.has_free_slot() {
            let Some(id) = self.queue.peek().map(BackupJob::id) else {
                break;
            };
            match self.launch(id, Transition::Start) {
                Some(launch) => launches.push(launch),
                None => break,
            }
        }
        launches
    }

    /// Leaves the running set: pause or any terminal transition.
    fn settle(&mut self, id: Uuid, transition: Transition) -> Vec<RunLaunch> {
        let Some(job) = self.queue.find_mut(id) else {
            return Vec::new();
        };
        if !attempt_transition(job, transition.clone()) {
            return Vec::new();
        }
        match transition {
            Transition::Complete => log!(JobLog::Completed { id }),
            Transition::Cancel => log!(JobLog::Cancelled { id }),
            Transition::Pause => log!(JobLog::Paused { id }),
            Transition::Fail(failure) => log!(JobLog::Failed {
                id,
                message: failure.message,
            }),
            Transition::Start | Transition::Resume | Transition::Retry => {}
        }
        self.release(id);
        self.admit()
    }

    fn update_progress(&mut self, id: Uuid, progress: JobProgress) {
        let Some(job) = self.queue.find_mut(id) else {
            return;
        };
        if job.status() != JobStatus::Running {
            return;
        }
        job.set_progress(progress.clamped());
    }

    /// Resumes paused jobs in queue order while slots are free.
    fn resume_paused(&mut self, ids: Vec<Uuid>) -> Vec<RunLaunch> {
        let mut launches = Vec::new();
        for id in ids {
            if !self.has_free_slot() {
                log!(JobLog::ResumeDeferred { id });
                continue;
            }
            launches.extend(self.launch(id, Transition::Resume));
        }
        launches
    }

    fn stop_all_runs(&mut self) {
        for (_, run) in self.runs.drain() {
            run.stop();
        }
    }
}

/// Sole owner of job state. Every mutation happens under one lock; engine
/// runs report back through [`ExecutionRunner`].
pub struct ExecutionManager {
    engine: Arc<dyn BackupEngine>,
    settings: ManagerSettings,
    state: Mutex<ManagerState>,
}

impl ExecutionManager {
    pub fn new(engine: Arc<dyn BackupEngine>, settings: ManagerSettings) -> Self {
        ExecutionManager {
            engine,
            settings,
            state: Mutex::new(ManagerState {
                queue: JobQueue::new(),
                max_concurrent_jobs: settings.max_concurrent_jobs,
                is_paused: false,
                admit_on_enqueue: settings.admit_on_enqueue,
                runs: HashMap::new(),
                next_generation: 0,
            }),
        }
    }

    fn spawn_runs(self: &Arc<Self>, launches: impl IntoIterator<Item = RunLaunch>) {
        for launch in launches {
            let runner = ExecutionRunner::new(self.clone(), self.engine.clone(), launch);
            tokio::spawn(runner.run());
        }
    }

    pub async fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.state.lock().await.queue.subscribe()
    }

    pub async fn enqueue(self: &Arc<Self>, job: BackupJob) -> Result<Uuid, Error> {
        let id = job.id();
        let launches = {
            let mut state = self.state.lock().await;
            state.queue.enqueue(job)?;
            log!(JobLog::Enqueued { id });
            if state.admit_on_enqueue {
                state.admit()
            } else {
                Vec::new()
            }
        };
        self.spawn_runs(launches);
        Ok(id)
    }

    /// Starts a pending job now. Jobs in any other state are left alone.
    pub async fn start(self: &Arc<Self>, id: Uuid) -> Result<(), Error> {
        let launch = {
            let mut state = self.state.lock().await;
            let status = state.status_of(id)?;
            if status == JobStatus::Pending && !state.has_free_slot() {
                Err(JobError::concurrency_limit_exceeded(
                    state.max_concurrent_jobs,
                ))?
            }
            state.launch(id, Transition::Start)
        };
        self.spawn_runs(launch);
        Ok(())
    }

    /// Ignored unless the job exists and is running. Processed counters are
    /// clamped to their totals.
    pub async fn update_progress(&self, id: Uuid, progress: JobProgress) {
        self.state.lock().await.update_progress(id, progress);
    }

    pub async fn record_error(self: &Arc<Self>, id: Uuid, failure: JobFailure) -> Result<(), Error> {
        let launches = {
            let mut state = self.state.lock().await;
            state.status_of(id)?;
            state.settle(id, Transition::Fail(failure))
        };
        self.spawn_runs(launches);
        Ok(())
    }

    pub async fn complete(self: &Arc<Self>, id: Uuid) -> Result<(), Error> {
        let launches = {
            let mut state = self.state.lock().await;
            state.status_of(id)?;
            state.settle(id, Transition::Complete)
        };
        self.spawn_runs(launches);
        Ok(())
    }

    /// Cancelling a job that already finished changes nothing.
    pub async fn cancel(self: &Arc<Self>, id: Uuid) -> Result<(), Error> {
        let launches = {
            let mut state = self.state.lock().await;
            state.status_of(id)?;
            state.settle(id, Transition::Cancel)
        };
        self.spawn_runs(launches);
        Ok(())
    }

    pub async fn retry(self: &Arc<Self>, id: Uuid, max_attempts: u32) -> Result<(), Error> {
        let launches = {
            let mut state = self.state.lock().await;
            let job = state
                .queue
                .find_mut(id)
                .ok_or_else(|| JobError::job_not_found(id))?;
            if job.status() == JobStatus::Failed && job.retry_count >= max_attempts {
                Err(JobError::retry_limit_exceeded(id, job.retry_count))?
            }
            if !attempt_transition(job, Transition::Retry) {
                return Ok(());
            }
            job.retry_count += 1;
            log!(JobLog::Retried {
                id,
                attempt: job.retry_count,
            });
            state.queue.requeue(id)?;
            if state.admit_on_enqueue {
                state.admit()
            } else {
                Vec::new()
            }
        };
        self.spawn_runs(launches);
        Ok(())
    }

    /// [`retry`](Self::retry) with the configured attempt limit.
    pub async fn retry_job(self: &Arc<Self>, id: Uuid) -> Result<(), Error> {
        self.retry(id, self.settings.max_retry_attempts).await
    }

    pub async fn pause(self: &Arc<Self>, id: Uuid) -> Result<(), Error> {
        let launches = {
            let mut state = self.state.lock().await;
            state.status_of(id)?;
            state.settle(id, Transition::Pause)
        };
        self.spawn_runs(launches);
        Ok(())
    }

    pub async fn resume(self: &Arc<Self>, id: Uuid) -> Result<(), Error> {
        let launch = {
            let mut state = self.state.lock().await;
            let status = state.status_of(id)?;
            if status == JobStatus::Paused && !state.has_free_slot() {
                Err(JobError::concurrency_limit_exceeded(
                    state.max_concurrent_jobs,
                ))?
            }
            state.launch(id, Transition::Resume)
        };
        self.spawn_runs(launch);
        Ok(())
    }

    /// Pauses every running job and holds admission until `resume_all`.
    pub async fn pause_all(&self) {
        let mut state = self.state.lock().await;
        state.is_paused = true;
        for id in state.ids_with(JobStatus::Running) {
            let Some(job) = state.queue.find_mut(id) else {
                continue;
            };
            if attempt_transition(job, Transition::Pause) {
                log!(JobLog::Paused { id });
                state.release(id);
            }
        }
    }

    pub async fn resume_all(self: &Arc<Self>) {
        let launches = {
            let mut state = self.state.lock().await;
            state.is_paused = false;
            let paused = state.ids_with(JobStatus::Paused);
            let mut launches = state.resume_paused(paused);
            launches.extend(state.admit());
            launches
        };
        self.spawn_runs(launches);
    }

    /// Drops a job from the queue, cancelling it first if it is still active.
    pub async fn remove(self: &Arc<Self>, id: Uuid) -> Result<BackupJob, Error> {
        let (job, launches) = {
            let mut state = self.state.lock().await;
            let mut launches = Vec::new();
            if state.status_of(id)?.is_active() {
                launches = state.settle(id, Transition::Cancel);
            }
            let job = state.queue.remove(id)?;
            log!(JobLog::Removed { id });
            launches.extend(state.admit());
            (job, launches)
        };
        self.spawn_runs(launches);
        Ok(job)
    }

    pub async fn admit_pending(self: &Arc<Self>) {
        let launches = self.state.lock().await.admit();
        self.spawn_runs(launches);
    }

    /// Lowering the limit never stops jobs that are already running.
    pub async fn set_max_concurrent_jobs(self: &Arc<Self>, value: usize) -> Result<(), Error> {
        if value == 0 {
            Err(JobError::invalid_concurrency_limit(value))?
        }
        let launches = {
            let mut state = self.state.lock().await;
            state.max_concurrent_jobs = value;
            state.admit()
        };
        self.spawn_runs(launches);
        Ok(())
    }

    pub async fn max_concurrent_jobs(&self) -> usize {
        self.state.lock().await.max_concurrent_jobs
    }

    pub async fn is_paused(&self) -> bool {
        self.state.lock().await.is_paused
    }

    pub async fn jobs(&self) -> Vec<BackupJob> {
        self.state.lock().await.queue.jobs()
    }

    pub async fn job(&self, id: Uuid) -> Option<BackupJob> {
        self.state.lock().await.queue.find(id).cloned()
    }

    pub async fn statistics(&self) -> JobStatistics {
        let state = self.state.lock().await;
        let queue = &state.queue;
        JobStatistics {
            pending: queue.count(JobStatus::Pending),
            running: queue.count(JobStatus::Running),
            paused: queue.count(JobStatus::Paused),
            completed: queue.count(JobStatus::Completed),
            failed: queue.count(JobStatus::Failed),
            cancelled: queue.count(JobStatus::Cancelled),
            overall_progress: ProgressAggregator::queue_progress(queue.iter()),
            max_concurrent_jobs: state.max_concurrent_jobs,
            is_paused: state.is_paused,
        }
    }

    pub async fn clear_finished(&self) -> Vec<Uuid> {
        self.state.lock().await.queue.remove_finished()
    }

    /// Signals every engine run to stop. Job statuses are kept as they are
    /// so the next snapshot still records what was running.
    pub async fn shutdown(&self) {
        self.state.lock().await.stop_all_runs();
    }

    pub async fn snapshot(&self, schedules: Vec<BackupSchedule>) -> ManagerSnapshot {
        let state = self.state.lock().await;
        ManagerSnapshot {
            queue: state.queue.snapshot(),
            max_concurrent_jobs: state.max_concurrent_jobs,
            is_paused: state.is_paused,
            schedules,
        }
    }

    /// Replaces the queue and its settings. Jobs saved while running lost
    /// their engine run with the previous process; they come back paused and
    /// are resumed unless the snapshot itself was paused.
    pub async fn restore(self: &Arc<Self>, snapshot: ManagerSnapshot) -> Result<(), Error> {
        if snapshot.max_concurrent_jobs == 0 {
            Err(JobError::invalid_concurrency_limit(
                snapshot.max_concurrent_jobs,
            ))?
        }
        let launches = {
            let mut state = self.state.lock().await;
            state.stop_all_runs();
            state.queue.restore(snapshot.queue);
            state.max_concurrent_jobs = snapshot.max_concurrent_jobs;
            state.is_paused = snapshot.is_paused;

            let interrupted = state.ids_with(JobStatus::Running);
            for id in &interrupted {
                if let Some(job) = state.queue.find_mut(*id) {
                    attempt_transition(job, Transition::Pause);
                }
            }

            if state.is_paused {
                Vec::new()
            } else {
                let mut launches = state.resume_paused(interrupted);
                if state.admit_on_enqueue {
                    launches.extend(state.admit());
                }
                launches
            }
        };
        self.spawn_runs(launches);
        Ok(())
    }

    /// Stores the stop signal of a freshly launched run. A run that was
    /// superseded while launching is stopped right away.
    pub(crate) async fn attach_run(
        &self,
        id: Uuid,
        generation: u64,
        stop: oneshot::Sender<()>,
    ) -> bool {
        let mut state = self.state.lock().await;
        match state.runs.get_mut(&id) {
            Some(run) if run.generation == generation => {
                run.stop = Some(stop);
                true
            }
            _ => {
                let _ = stop.send(());
                log!(JobLog::StaleEvent { id });
                false
            }
        }
    }

    /// Applies an engine event. Returns `false` once the run is no longer the
    /// job's current one; such events are dropped.
    pub(crate) async fn apply_event(
        self: &Arc<Self>,
        id: Uuid,
        generation: u64,
        event: EngineEvent,
    ) -> bool {
        let launches = {
            let mut state = self.state.lock().await;
            if !state.is_current(id, generation) {
                log!(JobLog::StaleEvent { id });
                return false;
            }
            match event {
                EngineEvent::Progress(progress) => {
                    state.update_progress(id, progress);
                    Vec::new()
                }
                EngineEvent::Completed => state.settle(id, Transition::Complete),
                EngineEvent::Failed(failure) => state.settle(id, Transition::Fail(failure)),
            }
        };
        self.spawn_runs(launches);
        true
    }
}
