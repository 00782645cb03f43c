use crate::interface::backup_engine::{BackupEngine, EngineHandle};
use crate::model::config::EngineConfig;
use crate::model::engine::engine_command::EngineCommand;
use crate::model::engine::engine_event::EngineEvent;
use crate::model::error::Error;
use crate::model::error::engine::EngineError;
use crate::model::job::backup_job::{FailureKind, JobFailure};
use crate::model::job::job_progress::JobProgress;
use async_trait::async_trait;
use futures::StreamExt;
use macros::log;
use serde::Deserialize;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::select;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

const EVENT_BUFFER: usize = 64;

/// One line of the engine's stdout protocol.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum EngineLine {
    Progress {
        total_files: u64,
        processed_files: u64,
        total_bytes: u64,
        processed_bytes: u64,
        #[serde(default)]
        current_item: Option<String>,
        #[serde(default)]
        estimated_seconds_remaining: Option<u64>,
    },
    Completed,
    Error {
        message: String,
    },
}

impl From<EngineLine> for EngineEvent {
    fn from(line: EngineLine) -> Self {
        match line {
            EngineLine::Progress {
                total_files,
                processed_files,
                total_bytes,
                processed_bytes,
                current_item,
                estimated_seconds_remaining,
            } => EngineEvent::Progress(JobProgress {
                total_files,
                processed_files,
                total_bytes,
                processed_bytes,
                current_item,
                estimated_seconds_remaining,
            }),
            EngineLine::Completed => EngineEvent::Completed,
            EngineLine::Error { message } => {
                EngineEvent::Failed(JobFailure::new(FailureKind::Engine, message))
            }
        }
    }
}

/// Runs the external backup tool as a child process:
/// `program [arguments..] <operation> --repo <repository> [--resume] -- <paths..>`.
///
/// The run is stopped when the stop signal fires or its sender is dropped.
pub struct SubprocessEngine {
    config: EngineConfig,
}

impl SubprocessEngine {
    pub fn new(config: EngineConfig) -> Self {
        SubprocessEngine { config }
    }

    fn command(&self, command: &EngineCommand) -> Command {
        let mut process = Command::new(&self.config.program);
        process
            .args(&self.config.arguments)
            .arg(command.operation.as_str())
            .arg("--repo")
            .arg(&command.source.repository);
        if command.options.resume {
            process.arg("--resume");
        }
        process
            .arg("--")
            .args(&command.source.paths)
            .envs(&self.config.environment)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        process
    }

    fn parse_line(line: &str) -> Option<EngineEvent> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str::<EngineLine>(line) {
            Ok(parsed) => Some(parsed.into()),
            Err(err) => {
                log!(EngineError::malformed_event(line, err));
                None
            }
        }
    }

    async fn supervise(
        mut child: Child,
        stdout: ChildStdout,
        event_tx: mpsc::Sender<EngineEvent>,
        mut stop_rx: oneshot::Receiver<()>,
    ) {
        let mut lines = BufReader::new(stdout).lines();
        let mut reported = false;

        while !reported {
            select! {
                biased;
                _ = &mut stop_rx => {
                    let _ = child.kill().await;
                    return;
                }
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            let Some(event) = Self::parse_line(&line) else {
                                continue;
                            };
                            reported = event.is_terminal();
                            if event_tx.send(event).await.is_err() {
                                let _ = child.kill().await;
                                return;
                            }
                        }
                        Ok(None) => break,
                        Err(err) => {
                            log!(EngineError::malformed_event("<unreadable>", err));
                            break;
                        }
                    }
                }
            }
        }

        let status = select! {
            biased;
            _ = &mut stop_rx => {
                let _ = child.kill().await;
                return;
            }
            status = child.wait() => status,
        };
        if !reported {
            let _ = event_tx.send(Self::exit_event(status)).await;
        }
    }

    fn exit_event(status: std::io::Result<ExitStatus>) -> EngineEvent {
        match status {
            Ok(status) if status.success() => EngineEvent::Completed,
            Ok(status) => EngineEvent::Failed(JobFailure::new(
                FailureKind::ProcessExited,
                format!("engine exited with {status}"),
            )),
            Err(err) => EngineEvent::Failed(JobFailure::new(
                FailureKind::ProcessExited,
                format!("failed to wait for engine: {err}"),
            )),
        }
    }
}

#[async_trait]
impl BackupEngine for SubprocessEngine {
    async fn launch(&self, command: EngineCommand) -> Result<EngineHandle, Error> {
        let program = self.config.program.clone();
        let mut child = self
            .command(&command)
            .spawn()
            .map_err(|err| EngineError::spawn_failed(program.clone(), err))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::stdout_unavailable(program))?;

        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (stop_tx, stop_rx) = oneshot::channel();
        tokio::spawn(Self::supervise(child, stdout, event_tx, stop_rx));

        Ok(EngineHandle {
            events: ReceiverStream::new(event_rx).boxed(),
            stop: stop_tx,
        })
    }
}
