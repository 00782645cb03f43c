use crate::model::error::job::JobError;
use crate::model::error::Error;
use crate::model::job::backup_job::*;
use crate::model::job::queue_event::QueueEvent;
use crate::model::snapshot::{QueueSnapshot, QueuedJob};
use tokio::sync::broadcast;
use uuid::Uuid;

const EVENT_CAPACITY: usize = 256;

/// Every job the manager tracks, ordered by priority and then by enqueue
/// sequence. Terminal jobs stay until they are removed explicitly.
pub struct JobQueue {
    entries: Vec<QueuedJob>,
    next_sequence: u64,
    event_tx: broadcast::Sender<QueueEvent>,
}

impl JobQueue {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        JobQueue {
            entries: Vec::new(),
            next_sequence: 0,
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.event_tx.subscribe()
    }

    pub fn enqueue(&mut self, job: BackupJob) -> Result<(), Error> {
        self.check_duplicate(&job)?;
        let id = job.id();
        let sequence = self.take_sequence();
        self.insert(QueuedJob { sequence, job });
        self.notify(QueueEvent::JobAdded(id));
        Ok(())
    }

    /// Removes and returns the highest-priority pending job.
    pub fn dequeue_next(&mut self) -> Option<BackupJob> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.job.status == JobStatus::Pending)?;
        let entry = self.entries.remove(index);
        self.notify(QueueEvent::JobRemoved(entry.job.id));
        Some(entry.job)
    }

    pub fn peek(&self) -> Option<&BackupJob> {
        self.entries
            .iter()
            .map(|entry| &entry.job)
            .find(|job| job.status == JobStatus::Pending)
    }

    pub fn find(&self, id: Uuid) -> Option<&BackupJob> {
        self.entries
            .iter()
            .map(|entry| &entry.job)
            .find(|job| job.id == id)
    }

    pub(crate) fn find_mut(&mut self, id: Uuid) -> Option<&mut BackupJob> {
        self.entries
            .iter_mut()
            .map(|entry| &mut entry.job)
            .find(|job| job.id == id)
    }

    pub fn remove(&mut self, id: Uuid) -> Result<BackupJob, Error> {
        let index = self
            .position(id)
            .ok_or_else(|| JobError::job_not_found(id))?;
        let entry = self.entries.remove(index);
        self.notify(QueueEvent::JobRemoved(id));
        Ok(entry.job)
    }

    /// Moves a job behind every other job of its tier, as if newly enqueued.
    pub fn requeue(&mut self, id: Uuid) -> Result<(), Error> {
        let index = self
            .position(id)
            .ok_or_else(|| JobError::job_not_found(id))?;
        let mut entry = self.entries.remove(index);
        entry.sequence = self.take_sequence();
        self.insert(entry);
        Ok(())
    }

    pub fn remove_finished(&mut self) -> Vec<Uuid> {
        let (finished, kept): (Vec<_>, Vec<_>) = self
            .entries
            .drain(..)
            .partition(|entry| entry.job.status.is_terminal());
        self.entries = kept;
        let removed = finished
            .into_iter()
            .map(|entry| entry.job.id)
            .collect::<Vec<_>>();
        for id in &removed {
            self.notify(QueueEvent::JobRemoved(*id));
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, status: JobStatus) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.job.status == status)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackupJob> {
        self.entries.iter().map(|entry| &entry.job)
    }

    pub fn jobs(&self) -> Vec<BackupJob> {
        self.iter().cloned().collect()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            entries: self.entries.clone(),
            next_sequence: self.next_sequence,
        }
    }

    /// Replaces the contents with a snapshot. The stored sequences are kept
    /// so ties inside a priority tier resolve exactly as before.
    pub fn restore(&mut self, snapshot: QueueSnapshot) {
        let previous = self
            .entries
            .drain(..)
            .map(|entry| entry.job.id)
            .collect::<Vec<_>>();
        for id in previous {
            self.notify(QueueEvent::JobRemoved(id));
        }

        let mut entries = snapshot.entries;
        entries.sort_by_key(|entry| (entry.job.priority, entry.sequence));
        let highest = entries.iter().map(|entry| entry.sequence + 1).max();
        self.next_sequence = highest.map_or(snapshot.next_sequence, |highest| {
            highest.max(snapshot.next_sequence)
        });
        self.entries = entries;

        for entry in &self.entries {
            self.notify(QueueEvent::JobAdded(entry.job.id));
        }
    }

    fn check_duplicate(&self, job: &BackupJob) -> Result<(), Error> {
        if self.position(job.id).is_some() {
            Err(JobError::duplicate_job(job.id))?
        }
        let holder = self
            .iter()
            .find(|held| held.status.is_active() && held.source == job.source);
        if let Some(holder) = holder {
            Err(JobError::duplicate_source(holder.id, job.source.to_string()))?
        }
        Ok(())
    }

    fn position(&self, id: Uuid) -> Option<usize> {
        self.entries.iter().position(|entry| entry.job.id == id)
    }

    fn take_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    fn insert(&mut self, entry: QueuedJob) {
        let key = (entry.job.priority, entry.sequence);
        let index = self
            .entries
            .partition_point(|held| (held.job.priority, held.sequence) <= key);
        self.entries.insert(index, entry);
    }

    fn notify(&self, event: QueueEvent) {
        // Nobody listening is fine.
        let _ = self.event_tx.send(event);
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for JobQueue {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries && self.next_sequence == other.next_sequence
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("entries", &self.entries)
            .field("next_sequence", &self.next_sequence)
            .finish()
    }
}
