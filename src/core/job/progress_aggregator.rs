use crate::model::job::backup_job::BackupJob;
use crate::model::job::job_progress::JobProgress;

/// Turns raw counters into percentages in `[0, 100]`.
pub struct ProgressAggregator;

impl ProgressAggregator {
    pub fn file_progress(progress: &JobProgress) -> f64 {
        Self::percentage(progress.processed_files, progress.total_files)
    }

    pub fn byte_progress(progress: &JobProgress) -> f64 {
        Self::percentage(progress.processed_bytes, progress.total_bytes)
    }

    /// Unweighted mean of the file and byte percentages.
    pub fn overall_progress(progress: &JobProgress) -> f64 {
        (Self::file_progress(progress) + Self::byte_progress(progress)) / 2.0
    }

    /// Mean over every held job; jobs that have not started count as 0.
    pub fn queue_progress<'a>(jobs: impl IntoIterator<Item = &'a BackupJob>) -> f64 {
        let (sum, count) = jobs.into_iter().fold((0.0, 0usize), |(sum, count), job| {
            (sum + Self::overall_progress(job.progress()), count + 1)
        });
        if count == 0 { 0.0 } else { sum / count as f64 }
    }

    fn percentage(processed: u64, total: u64) -> f64 {
        if total == 0 {
            return 0.0;
        }
        (processed as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::job::backup_job::*;

    fn job_with(progress: JobProgress) -> BackupJob {
        let mut job = BackupJob::for_path("repo", "/data");
        assert!(job.set_progress(progress));
        job
    }

    #[test]
    fn averages_file_and_byte_progress() {
        let progress = JobProgress::new(100, 50, 1000, 250);
        assert_eq!(ProgressAggregator::file_progress(&progress), 50.0);
        assert_eq!(ProgressAggregator::byte_progress(&progress), 25.0);
        assert_eq!(ProgressAggregator::overall_progress(&progress), 37.5);
    }

    #[test]
    fn zero_totals_contribute_nothing() {
        let empty = JobProgress::default();
        assert_eq!(ProgressAggregator::overall_progress(&empty), 0.0);

        let bytes_only = JobProgress::new(0, 0, 200, 200);
        assert_eq!(ProgressAggregator::file_progress(&bytes_only), 0.0);
        assert_eq!(ProgressAggregator::overall_progress(&bytes_only), 50.0);
    }

    #[test]
    fn overflowing_counters_stay_within_bounds() {
        let overflowing = JobProgress::new(10, 20, 10, 30);
        assert_eq!(ProgressAggregator::overall_progress(&overflowing), 100.0);
    }

    #[test]
    fn queue_progress_counts_unstarted_jobs_as_zero() {
        let done = job_with(JobProgress::new(10, 10, 100, 100));
        let half = job_with(JobProgress::new(10, 5, 100, 50));
        let waiting = BackupJob::for_path("repo", "/other");

        let progress = ProgressAggregator::queue_progress([&done, &half, &waiting]);
        assert_eq!(progress, 50.0);
    }

    #[test]
    fn empty_queue_has_zero_progress() {
        assert_eq!(ProgressAggregator::queue_progress(Vec::<&BackupJob>::new()), 0.0);
    }
}
