use macros::traceable;

traceable! {
    EngineError {
        #[error("Failed to spawn engine process {program}: {err}")]
        SpawnFailed { program: String } => tracing::Level::ERROR,

        #[no_source]
        #[error("Engine process {program} has no stdout pipe")]
        StdoutUnavailable { program: String } => tracing::Level::ERROR,

        #[error("Malformed engine event line: {line}: {err}")]
        MalformedEvent { line: String } => tracing::Level::WARN,
    }
}
