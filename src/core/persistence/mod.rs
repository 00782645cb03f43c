pub mod snapshot_store;
pub mod snapshot_writer;
