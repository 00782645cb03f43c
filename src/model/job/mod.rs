pub mod backup_job;
pub mod job_progress;
pub mod job_statistics;
pub mod queue_event;
