pub mod engine;
pub mod io;
pub mod job;
pub mod misc;
pub mod schedule;
pub mod system;

use crate::model::error::engine::EngineError;
use crate::model::error::io::IOError;
use crate::model::error::job::JobError;
use crate::model::error::misc::MiscError;
use crate::model::error::schedule::ScheduleError;
use crate::model::error::system::SystemError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum Error {
    #[error(transparent)]
    Engine(EngineError),
    #[error(transparent)]
    IO(IOError),
    #[error(transparent)]
    Job(JobError),
    #[error(transparent)]
    Misc(MiscError),
    #[error(transparent)]
    Schedule(ScheduleError),
    #[error(transparent)]
    System(SystemError),
}

impl Error {
    pub fn level(&self) -> tracing::Level {
        match self {
            Self::Engine(error) => error.level(),
            Self::IO(error) => error.level(),
            Self::Job(error) => error.level(),
            Self::Misc(error) => error.level(),
            Self::Schedule(error) => error.level(),
            Self::System(error) => error.level(),
        }
    }
}

impl From<EngineError> for Error {
    fn from(error: EngineError) -> Self {
        Self::Engine(error)
    }
}

impl From<IOError> for Error {
    fn from(error: IOError) -> Self {
        Self::IO(error)
    }
}

impl From<JobError> for Error {
    fn from(error: JobError) -> Self {
        Self::Job(error)
    }
}

impl From<MiscError> for Error {
    fn from(error: MiscError) -> Self {
        Self::Misc(error)
    }
}

impl From<ScheduleError> for Error {
    fn from(error: ScheduleError) -> Self {
        Self::Schedule(error)
    }
}

impl From<SystemError> for Error {
    fn from(error: SystemError) -> Self {
        Self::System(error)
    }
}
