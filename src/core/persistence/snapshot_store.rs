use crate::interface::snapshot_store::SnapshotStore;
use crate::model::error::Error;
use crate::model::error::io::IOError;
use crate::model::error::misc::MiscError;
use crate::model::snapshot::ManagerSnapshot;
use async_trait::async_trait;
use bincode::config;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

/// Keeps the snapshot in a single bincode file. Writes go to `<path>.tmp`
/// first and are renamed into place, so a crash mid-write keeps the last
/// complete snapshot.
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSnapshotStore { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn save(&self, snapshot: &ManagerSnapshot) -> Result<(), Error> {
        let bytes = bincode::serde::encode_to_vec(snapshot, config::standard())
            .map_err(MiscError::serialize_error)?;

        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| IOError::create_directory_failed(parent, err))?;
        }

        let temp_path = self.temp_path();
        fs::write(&temp_path, bytes)
            .await
            .map_err(|err| IOError::write_file_failed(&temp_path, err))?;
        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|err| IOError::rename_file_failed(&temp_path, &self.path, err))?;
        Ok(())
    }

    async fn load(&self) -> Result<Option<ManagerSnapshot>, Error> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => Err(IOError::read_file_failed(&self.path, err))?,
        };
        let (snapshot, _) =
            bincode::serde::decode_from_slice::<ManagerSnapshot, _>(&bytes, config::standard())
                .map_err(MiscError::deserialize_error)?;
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job::job_queue::JobQueue;
    use crate::model::job::backup_job::*;
    use crate::model::job::job_progress::JobProgress;
    use crate::model::schedule::backup_schedule::*;
    use chrono::{NaiveTime, Weekday};
    use tempfile::tempdir;

    fn snapshot() -> ManagerSnapshot {
        let mut queue = JobQueue::new();
        let mut running = BackupJob::for_path("repo", "/a");
        running.status = JobStatus::Running;
        running.set_progress(JobProgress::new(10, 4, 100, 40).with_estimate(30));
        queue.enqueue(running).unwrap();
        queue
            .enqueue(BackupJob::new(
                JobOperation::Verify,
                SourceDescriptor::new("repo", vec!["/b".into()]),
                JobPriority::High,
            ))
            .unwrap();

        let schedule = BackupSchedule::new(
            "weekly",
            IntervalKind::Weekly,
            NaiveTime::from_hms_opt(3, 30, 0).unwrap(),
            SourceDescriptor::new("repo", vec!["/home".into()]),
        )
        .with_weekdays([Weekday::Mon, Weekday::Thu])
        .with_time_window(TimeWindow::new(22, 6));

        ManagerSnapshot {
            queue: queue.snapshot(),
            max_concurrent_jobs: 3,
            is_paused: true,
            schedules: vec![schedule],
        }
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let directory = tempdir().unwrap();
        let store = FileSnapshotStore::new(directory.path().join("snapshot.bin"));
        assert_eq!(store.load().await, Ok(None));
    }

    #[tokio::test]
    async fn saved_snapshot_loads_back() {
        let directory = tempdir().unwrap();
        let path = directory.path().join("state").join("snapshot.bin");
        let store = FileSnapshotStore::new(&path);
        let snapshot = snapshot();

        store.save(&snapshot).await.unwrap();

        assert_eq!(store.load().await, Ok(Some(snapshot)));
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn save_replaces_previous_snapshot() {
        let directory = tempdir().unwrap();
        let store = FileSnapshotStore::new(directory.path().join("snapshot.bin"));
        let mut snapshot = snapshot();
        store.save(&snapshot).await.unwrap();

        snapshot.is_paused = false;
        snapshot.schedules.clear();
        store.save(&snapshot).await.unwrap();

        assert_eq!(store.load().await, Ok(Some(snapshot)));
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let directory = tempdir().unwrap();
        let path = directory.path().join("snapshot.bin");
        std::fs::write(&path, [0xff, 0xff, 0xff]).unwrap();
        let store = FileSnapshotStore::new(&path);

        assert!(matches!(
            store.load().await,
            Err(Error::Misc(MiscError::DeserializeError { .. }))
        ));
    }
}
