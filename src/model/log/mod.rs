pub mod job;
pub mod schedule;
pub mod system;
