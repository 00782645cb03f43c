use macros::traceable;
use std::path::PathBuf;

traceable! {
    IOError {
        #[error("Failed to read file: {path:?}: {err}")]
        ReadFileFailed { path: PathBuf } => tracing::Level::ERROR,

        #[error("Failed to write file: {path:?}: {err}")]
        WriteFileFailed { path: PathBuf } => tracing::Level::ERROR,

        #[error("Failed to create directory: {path:?}: {err}")]
        CreateDirectoryFailed { path: PathBuf } => tracing::Level::ERROR,

        #[error("Failed to rename file: From {src:?} To {dst:?}: {err}")]
        RenameFileFailed { src: PathBuf, dst: PathBuf } => tracing::Level::ERROR,
    }
}
