pub mod schedule_engine;
pub mod schedule_manager;
pub mod schedule_timer;
