use macros::traceable;

traceable! {
    MiscError {
        #[error("Failed to serialize data: {err}")]
        SerializeError => tracing::Level::ERROR,

        #[error("Failed to deserialize data: {err}")]
        DeserializeError => tracing::Level::ERROR,
    }
}
