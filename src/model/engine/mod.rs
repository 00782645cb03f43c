pub mod engine_command;
pub mod engine_event;
