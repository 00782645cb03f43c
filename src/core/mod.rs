pub mod app_config;
pub mod engine;
pub mod job;
pub mod persistence;
pub mod schedule;
pub mod system;
