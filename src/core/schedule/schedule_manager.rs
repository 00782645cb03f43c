use crate::core::job::execution_manager::ExecutionManager;
use crate::core::schedule::schedule_engine::ScheduleEngine;
use crate::model::error::Error;
use crate::model::error::job::JobError;
use crate::model::error::schedule::ScheduleError;
use crate::model::log::schedule::ScheduleLog;
use crate::model::schedule::backup_schedule::*;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use dashmap::DashMap;
use macros::log;
use std::sync::Arc;
use tokio::sync::Notify;
use uuid::Uuid;

// Bounds the catch-up loop after a long sleep or a clock jump.
const MAX_ADVANCE_STEPS: usize = 10_000;

pub struct ScheduleManager {
    execution_manager: Arc<ExecutionManager>,
    time_zone: Tz,
    schedules: DashMap<Uuid, BackupSchedule>,
    refresh_notify: Arc<Notify>,
}

impl ScheduleManager {
    pub fn new(execution_manager: Arc<ExecutionManager>, time_zone: Tz) -> Self {
        ScheduleManager {
            execution_manager,
            time_zone,
            schedules: DashMap::new(),
            refresh_notify: Arc::new(Notify::new()),
        }
    }

    /// Signalled whenever a change may move the earliest trigger.
    pub fn refresh_notify(&self) -> Arc<Notify> {
        self.refresh_notify.clone()
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    /// Loads persisted schedules. Active schedules without a trigger time get
    /// one computed from now.
    pub fn restore(&self, schedules: Vec<BackupSchedule>) {
        let now = Utc::now();
        self.schedules.clear();
        for mut schedule in schedules {
            if schedule.state == ScheduleState::Active && schedule.next_run_time.is_none() {
                schedule.next_run_time = self.compute_next(&schedule, now);
            }
            self.schedules.insert(schedule.uuid, schedule);
        }
        self.refresh_notify.notify_one();
    }

    /// Ordered by creation time.
    pub fn get_all_schedules(&self) -> Vec<BackupSchedule> {
        let mut schedules = self
            .schedules
            .iter()
            .map(|entry| entry.value().clone())
            .collect::<Vec<_>>();
        schedules.sort_by_key(|schedule| (schedule.created_at, schedule.uuid));
        schedules
    }

    pub fn get_schedule(&self, uuid: Uuid) -> Option<BackupSchedule> {
        self.schedules.get(&uuid).map(|entry| entry.value().clone())
    }

    pub fn create_schedule(&self, mut schedule: BackupSchedule) -> Result<Uuid, Error> {
        ScheduleEngine::validate(&schedule)?;
        let now = Utc::now();
        schedule.next_run_time = match schedule.state {
            ScheduleState::Active => self.compute_next(&schedule, now),
            ScheduleState::Paused | ScheduleState::Disabled => None,
        };
        schedule.updated_at = now;
        let uuid = schedule.uuid;
        self.schedules.insert(uuid, schedule);
        self.refresh_notify.notify_one();
        Ok(uuid)
    }

    pub fn modify_schedule(&self, mut schedule: BackupSchedule) -> Result<(), Error> {
        if !self.schedules.contains_key(&schedule.uuid) {
            Err(ScheduleError::schedule_not_found(schedule.uuid))?
        }
        ScheduleEngine::validate(&schedule)?;
        let now = Utc::now();
        schedule.next_run_time = match schedule.state {
            ScheduleState::Active => self.compute_next(&schedule, now),
            ScheduleState::Paused | ScheduleState::Disabled => None,
        };
        schedule.updated_at = now;
        self.schedules.insert(schedule.uuid, schedule);
        self.refresh_notify.notify_one();
        Ok(())
    }

    pub fn remove_schedule(&self, uuid: Uuid) -> Result<BackupSchedule, Error> {
        let (_, schedule) = self
            .schedules
            .remove(&uuid)
            .ok_or_else(|| ScheduleError::schedule_not_found(uuid))?;
        self.refresh_notify.notify_one();
        Ok(schedule)
    }

    /// Re-activating never replays triggers missed while inactive.
    pub fn activate_schedule(&self, uuid: Uuid) -> Result<(), Error> {
        self.set_state(uuid, ScheduleState::Active)
    }

    pub fn pause_schedule(&self, uuid: Uuid) -> Result<(), Error> {
        self.set_state(uuid, ScheduleState::Paused)
    }

    pub fn disable_schedule(&self, uuid: Uuid) -> Result<(), Error> {
        self.set_state(uuid, ScheduleState::Disabled)
    }

    pub fn earliest_next_run(&self) -> Option<DateTime<Utc>> {
        self.schedules
            .iter()
            .filter(|entry| entry.state == ScheduleState::Active)
            .filter_map(|entry| entry.next_run_time)
            .min()
    }

    /// Enqueues one job per due active schedule and moves each of them past
    /// `now`. A schedule whose previous job is still active is skipped for
    /// this occurrence. Returns the ids of the jobs enqueued.
    pub async fn execute_ready_schedules(&self, now: DateTime<Utc>) -> Vec<Uuid> {
        let due = self
            .get_all_schedules()
            .into_iter()
            .filter(|schedule| schedule.state == ScheduleState::Active)
            .filter(|schedule| schedule.next_run_time.is_some_and(|next| next <= now))
            .collect::<Vec<_>>();

        let mut enqueued = Vec::new();
        for schedule in due {
            match self.execution_manager.enqueue(schedule.to_job()).await {
                Ok(job_id) => {
                    log!(ScheduleLog::Triggered {
                        id: schedule.uuid,
                        job_id,
                    });
                    enqueued.push(job_id);
                }
                Err(Error::Job(JobError::DuplicateJob { .. } | JobError::DuplicateSource { .. })) => {
                    log!(ScheduleLog::SkippedActive { id: schedule.uuid });
                }
                Err(err) => log!(err),
            }

            if let Some(mut entry) = self.schedules.get_mut(&schedule.uuid) {
                let next = self.advance_past(&entry, now);
                entry.last_run_time = Some(now);
                entry.next_run_time = next;
                if let Some(next) = next {
                    log!(ScheduleLog::Advanced {
                        id: schedule.uuid,
                        next: next.to_rfc3339(),
                    });
                }
            }
        }
        enqueued
    }

    fn set_state(&self, uuid: Uuid, state: ScheduleState) -> Result<(), Error> {
        let mut entry = self
            .schedules
            .get_mut(&uuid)
            .ok_or_else(|| ScheduleError::schedule_not_found(uuid))?;
        let now = Utc::now();
        entry.next_run_time = match state {
            ScheduleState::Active => self.compute_next(&entry, now),
            ScheduleState::Paused | ScheduleState::Disabled => None,
        };
        entry.state = state;
        entry.updated_at = now;
        drop(entry);
        self.refresh_notify.notify_one();
        Ok(())
    }

    /// `None` leaves the schedule without a trigger until it is modified.
    fn compute_next(
        &self,
        schedule: &BackupSchedule,
        after: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let next = ScheduleEngine::next_run_time(schedule, after, &self.time_zone);
        if next.is_none() {
            log!(ScheduleLog::NoNextRun { id: schedule.uuid });
        }
        next
    }

    /// Steps from the previous trigger so `customHours` keeps its phase.
    fn advance_past(
        &self,
        schedule: &BackupSchedule,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let mut next = schedule.next_run_time.unwrap_or(now);
        for _ in 0..MAX_ADVANCE_STEPS {
            if next > now {
                return Some(next);
            }
            next = self.compute_next(schedule, next)?;
        }
        self.compute_next(schedule, now)
    }
}
