//! The external orchestration call.
//!
//! [`Orchestrator`] is the seam between this crate and the runtime that
//! actually drives the model. [`ClaudeCli`] runs the `claude` executable in
//! streaming JSON mode and turns its stdout into a stream of
//! [`SessionEvent`]s.

use crate::config::OrchestratorConfig;
use crate::session::events::SessionEvent;
use async_trait::async_trait;
use futures::stream::{self, Stream};
use serde::Serialize;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Environment variable the runtime reads its output token limit from.
const MAX_TOKENS_ENV: &str = "CLAUDE_CODE_MAX_OUTPUT_TOKENS";

/// Single-pass, forward-only sequence of events from one call.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<SessionEvent, OrchestratorError>> + Send>>;

/// Options passed through to the runtime unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub append_system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Session to continue instead of starting a new one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    pub prompt: String,
    pub options: QueryOptions,
}

impl QueryRequest {
    pub fn new(prompt: impl Into<String>, options: QueryOptions) -> Self {
        Self {
            prompt: prompt.into(),
            options,
        }
    }
}

/// Failure of the external call itself.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Failed to start `{command}`: {source}. Is it installed and on PATH?")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read output of `{command}`: {source}")]
    Read {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Exit {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Orchestrator unavailable: {0}")]
    Unavailable(String),
}

/// Starts one streamed conversation turn-set with the runtime.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn query(&self, request: QueryRequest) -> Result<EventStream, OrchestratorError>;
}

/// Runs the `claude` CLI with `--output-format stream-json`.
pub struct ClaudeCli {
    config: OrchestratorConfig,
}

impl ClaudeCli {
    pub fn new(config: OrchestratorConfig) -> Self {
        info!("Using orchestrator command: {}", config.command);
        Self { config }
    }

    /// Build the process invocation for a request.
    ///
    /// The prompt goes last, after `--`, so a prompt starting with `-` is
    /// never read as an option.
    fn build_command(&self, request: &QueryRequest) -> Command {
        let mut cmd = Command::new(&self.config.command);
        cmd.arg("-p")
            .arg("--output-format")
            .arg("stream-json")
            .arg("--verbose");

        let options = &request.options;
        if let Some(max_turns) = options.max_turns {
            cmd.arg("--max-turns").arg(max_turns.to_string());
        }
        if let Some(ref append) = options.append_system_prompt {
            cmd.arg("--append-system-prompt").arg(append);
        }
        if let Some(ref session_id) = options.resume {
            cmd.arg("--resume").arg(session_id);
        }
        if let Some(ref model) = self.config.model {
            cmd.arg("--model").arg(model);
        }
        if let Some(max_tokens) = options.max_tokens {
            cmd.env(MAX_TOKENS_ENV, max_tokens.to_string());
        }
        cmd.args(&self.config.extra_args);
        cmd.arg("--").arg(&request.prompt);

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        cmd
    }
}

#[async_trait]
impl Orchestrator for ClaudeCli {
    async fn query(&self, request: QueryRequest) -> Result<EventStream, OrchestratorError> {
        let command = self.config.command.clone();
        debug!(
            "Spawning {} (resume: {:?}, max_turns: {:?})",
            command, request.options.resume, request.options.max_turns
        );

        let mut child = self
            .build_command(&request)
            .spawn()
            .map_err(|source| OrchestratorError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            OrchestratorError::Unavailable(format!("no stdout from `{}`", command))
        })?;

        // Drain stderr concurrently so a chatty child never blocks on a full pipe.
        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut buf).await;
            }
            buf
        });

        let state = LineReader {
            command,
            lines: BufReader::new(stdout).lines(),
            child: Some(child),
            stderr_task: Some(stderr_task),
            finished: false,
        };

        Ok(Box::pin(stream::unfold(state, next_event)))
    }
}

/// Decoder state threaded through `stream::unfold`.
struct LineReader {
    command: String,
    lines: Lines<BufReader<ChildStdout>>,
    child: Option<Child>,
    stderr_task: Option<JoinHandle<String>>,
    finished: bool,
}

impl LineReader {
    async fn collect_stderr(&mut self) -> String {
        match self.stderr_task.take() {
            Some(task) => task.await.unwrap_or_default().trim().to_string(),
            None => String::new(),
        }
    }
}

async fn next_event(
    mut state: LineReader,
) -> Option<(Result<SessionEvent, OrchestratorError>, LineReader)> {
    if state.finished {
        return None;
    }

    loop {
        match state.lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match SessionEvent::from_line(line) {
                    Ok(event) => return Some((Ok(event), state)),
                    Err(e) => {
                        warn!("Skipping undecodable line from {}: {}", state.command, e);
                        continue;
                    }
                }
            }
            Ok(None) => {
                state.finished = true;
                let mut child = state.child.take()?;
                let status = match child.wait().await {
                    Ok(status) => status,
                    Err(source) => {
                        let command = state.command.clone();
                        return Some((Err(OrchestratorError::Read { command, source }), state));
                    }
                };

                if status.success() {
                    debug!("{} finished", state.command);
                    return None;
                }

                let stderr = state.collect_stderr().await;
                let err = OrchestratorError::Exit {
                    command: state.command.clone(),
                    status,
                    stderr,
                };
                return Some((Err(err), state));
            }
            Err(source) => {
                state.finished = true;
                let command = state.command.clone();
                return Some((Err(OrchestratorError::Read { command, source }), state));
            }
        }
    }
}
