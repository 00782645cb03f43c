use crate::model::job::backup_job::*;
use crate::model::log::job::JobLog;
use chrono::Utc;
use macros::log;

/// A requested lifecycle step. `Retry` is the only way out of `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Start,
    Pause,
    Resume,
    Complete,
    Fail(JobFailure),
    Cancel,
    Retry,
}

impl Transition {
    pub fn target(&self) -> JobStatus {
        match self {
            Self::Start | Self::Resume => JobStatus::Running,
            Self::Pause => JobStatus::Paused,
            Self::Complete => JobStatus::Completed,
            Self::Fail(_) => JobStatus::Failed,
            Self::Cancel => JobStatus::Cancelled,
            Self::Retry => JobStatus::Pending,
        }
    }

    fn allowed_from(&self, status: JobStatus) -> bool {
        use JobStatus::*;
        match self {
            Self::Start => status == Pending,
            Self::Pause => status == Running,
            Self::Resume => status == Paused,
            Self::Complete => status == Running,
            Self::Fail(_) | Self::Cancel => matches!(status, Pending | Running | Paused),
            Self::Retry => status == Failed,
        }
    }
}

/// Applies `transition` to `job` if the lifecycle allows it.
///
/// Disallowed transitions leave the job untouched and are only logged; this
/// is the single place where that policy lives. On success the status and
/// every field tied to it (timestamps, error) change together.
pub fn attempt_transition(job: &mut BackupJob, transition: Transition) -> bool {
    let from = job.status;
    if !transition.allowed_from(from) {
        log!(JobLog::TransitionIgnored {
            id: job.id,
            from: format!("{from:?}"),
            to: format!("{:?}", transition.target()),
        });
        return false;
    }

    let now = Utc::now();
    job.status = transition.target();
    match transition {
        Transition::Start => {
            job.started_at.get_or_insert(now);
        }
        Transition::Fail(failure) => {
            job.error = Some(failure);
        }
        Transition::Retry => {
            job.error = None;
            job.completed_at = None;
        }
        Transition::Pause | Transition::Resume | Transition::Complete | Transition::Cancel => {}
    }
    if job.status.is_terminal() {
        job.completed_at = Some(now);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_in(status: JobStatus) -> BackupJob {
        let mut job = BackupJob::for_path("repo", "/data");
        job.status = status;
        job
    }

    #[test]
    fn start_sets_started_at_once() {
        let mut job = job_in(JobStatus::Pending);
        assert!(attempt_transition(&mut job, Transition::Start));
        let started_at = job.started_at();
        assert!(started_at.is_some());

        assert!(attempt_transition(&mut job, Transition::Pause));
        assert!(attempt_transition(&mut job, Transition::Resume));
        assert_eq!(job.started_at(), started_at);
        assert_eq!(job.status(), JobStatus::Running);
    }

    #[test]
    fn terminal_transitions_set_completed_at() {
        for transition in [
            Transition::Complete,
            Transition::Cancel,
            Transition::Fail(JobFailure::new(FailureKind::Engine, "boom")),
        ] {
            let mut job = job_in(JobStatus::Running);
            assert!(attempt_transition(&mut job, transition));
            assert!(job.status().is_terminal());
            assert!(job.completed_at().is_some());
        }
    }

    #[test]
    fn disallowed_transitions_leave_job_unchanged() {
        let cases = [
            (JobStatus::Pending, Transition::Complete),
            (JobStatus::Pending, Transition::Pause),
            (JobStatus::Paused, Transition::Start),
            (JobStatus::Completed, Transition::Cancel),
            (JobStatus::Cancelled, Transition::Resume),
            (JobStatus::Failed, Transition::Start),
            (JobStatus::Failed, Transition::Resume),
            (JobStatus::Running, Transition::Retry),
        ];
        for (status, transition) in cases {
            let mut job = job_in(status);
            let before = job.clone();
            assert!(!attempt_transition(&mut job, transition));
            assert_eq!(job, before);
        }
    }

    #[test]
    fn error_is_present_only_while_failed() {
        let mut job = job_in(JobStatus::Running);
        let failure = JobFailure::new(FailureKind::ProcessExited, "exit status 2");
        assert!(attempt_transition(&mut job, Transition::Fail(failure.clone())));
        assert_eq!(job.error(), Some(&failure));

        assert!(attempt_transition(&mut job, Transition::Retry));
        assert_eq!(job.status(), JobStatus::Pending);
        assert!(job.error().is_none());
        assert!(job.completed_at().is_none());
    }

    #[test]
    fn failure_can_be_forced_from_pending_and_paused() {
        for status in [JobStatus::Pending, JobStatus::Paused] {
            let mut job = job_in(status);
            let failure = JobFailure::new(FailureKind::Launch, "missing binary");
            assert!(attempt_transition(&mut job, Transition::Fail(failure)));
            assert_eq!(job.status(), JobStatus::Failed);
        }
    }
}
