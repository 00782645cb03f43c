use macros::traceable;
use uuid::Uuid;

traceable! {
    ScheduleError {
        #[no_source]
        #[error("Invalid schedule definition: {field} = {value}")]
        InvalidScheduleDefinition { field: String, value: String } => tracing::Level::WARN,

        #[no_source]
        #[error("Schedule not found: {id}")]
        ScheduleNotFound { id: Uuid } => tracing::Level::WARN,
    }
}
