use crate::model::job::backup_job::*;
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    Active,
    Paused,
    Disabled,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalKind {
    Daily,
    Weekly,
    Monthly,
    CustomHours(u32),
}

/// Whole-hour window `[start, end)`. `end < start` wraps past midnight.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: u8,
    pub end: u8,
}

impl TimeWindow {
    pub fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    pub fn wraps_midnight(&self) -> bool {
        self.end < self.start
    }

    pub fn contains_hour(&self, hour: u32) -> bool {
        let start = u32::from(self.start);
        let end = u32::from(self.end);
        if self.wraps_midnight() {
            hour >= start || hour < end
        } else {
            hour >= start && hour < end
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BackupSchedule {
    pub uuid: Uuid,
    pub name: String,
    pub state: ScheduleState,
    pub interval: IntervalKind,
    pub time_of_day: NaiveTime,
    pub weekdays: Vec<Weekday>,
    pub month_days: BTreeSet<u32>,
    pub time_window: Option<TimeWindow>,
    pub priority: JobPriority,
    pub operation: JobOperation,
    pub source: SourceDescriptor,
    pub last_run_time: Option<DateTime<Utc>>,
    pub next_run_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BackupSchedule {
    pub fn new(
        name: impl Into<String>,
        interval: IntervalKind,
        time_of_day: NaiveTime,
        source: SourceDescriptor,
    ) -> Self {
        let now = Utc::now();
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            state: ScheduleState::Active,
            interval,
            time_of_day,
            weekdays: Vec::new(),
            month_days: BTreeSet::new(),
            time_window: None,
            priority: JobPriority::Normal,
            operation: JobOperation::Backup,
            source,
            last_run_time: None,
            next_run_time: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_weekdays(mut self, weekdays: impl IntoIterator<Item = Weekday>) -> Self {
        self.weekdays = weekdays.into_iter().collect();
        self
    }

    pub fn with_month_days(mut self, days: impl IntoIterator<Item = u32>) -> Self {
        self.month_days = days.into_iter().collect();
        self
    }

    pub fn with_time_window(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    pub fn with_priority(mut self, priority: JobPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_operation(mut self, operation: JobOperation) -> Self {
        self.operation = operation;
        self
    }

    pub fn to_job(&self) -> BackupJob {
        BackupJob::new(self.operation, self.source.clone(), self.priority).with_schedule(self.uuid)
    }
}
