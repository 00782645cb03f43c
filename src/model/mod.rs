pub mod config;
pub mod engine;
pub mod error;
pub mod job;
pub mod log;
pub mod schedule;
pub mod snapshot;
