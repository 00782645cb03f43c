pub mod backup_engine;
pub mod runnable;
pub mod snapshot_store;
