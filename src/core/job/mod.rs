pub mod execution_manager;
pub mod execution_runner;
pub mod job_queue;
pub mod progress_aggregator;
pub mod state_machine;
