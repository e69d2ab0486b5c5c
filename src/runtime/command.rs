#![allow(clippy::result_large_err)] // Runner returns AppError so spawn failures keep their runtime context.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

const OUTPUT_CAPTURE_LIMIT_BYTES: usize = 1_048_576;

/// A single external program invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandExecutionRequest {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

impl CommandExecutionRequest {
    pub fn new<P: Into<String>>(program: P) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg<A: Into<String>>(mut self, arg: A) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Shell-like rendering used for debug logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| {
                if part.contains(char::is_whitespace) {
                    format!("'{}'", part)
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandExecutionOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandExecutionOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Spawns external programs. Swapped for a recording fake in tests.
#[async_trait]
pub trait CommandRunner: Send + Sync + 'static {
    async fn run(
        &self,
        request: &CommandExecutionRequest,
    ) -> Result<CommandExecutionOutput, AppError>;
}

pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        request: &CommandExecutionRequest,
    ) -> Result<CommandExecutionOutput, AppError> {
        tracing::debug!(command = %request.display(), "spawning");

        let mut command = Command::new(&request.program);
        command
            .args(&request.args)
            .envs(&request.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &request.cwd {
            command.current_dir(cwd);
        }

        let output = command.output().await.map_err(|err| {
            AppError::new(
                ErrorCategory::RuntimeError,
                format!("failed to execute {}: {}", request.program, err),
            )
            .with_code("RT-001")
            .with_context("command", request.display())
        })?;

        Ok(CommandExecutionOutput {
            stdout: limit_bytes(&output.stdout),
            stderr: limit_bytes(&output.stderr),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

fn limit_bytes(bytes: &[u8]) -> String {
    let start = bytes.len().saturating_sub(OUTPUT_CAPTURE_LIMIT_BYTES);
    String::from_utf8_lossy(&bytes[start..]).into_owned()
}

/// Keep the last `lines` lines of `text`, trimmed.
pub fn tail_lines(text: &str, lines: usize) -> String {
    let collected: Vec<&str> = text.trim_end().lines().collect();
    let start = collected.len().saturating_sub(lines);
    collected[start..].join("\n")
}
