#![allow(clippy::result_large_err)]

use super::{CommandExecutionRequest, CommandRunner};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;

/// Numeric identity of the invoking host user.
///
/// The base image creates its build user with these ids so that archives
/// written to the bind-mounted target directory are owned by the host user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostIdentity {
    pub uid: u32,
    pub gid: u32,
}

impl HostIdentity {
    pub async fn resolve(runner: &dyn CommandRunner) -> Result<Self, AppError> {
        let uid = query_id(runner, "-u").await?;
        let gid = query_id(runner, "-g").await?;
        Ok(Self { uid, gid })
    }
}

async fn query_id(runner: &dyn CommandRunner, flag: &str) -> Result<u32, AppError> {
    let output = runner
        .run(&CommandExecutionRequest::new("id").arg(flag))
        .await?;
    if !output.success() {
        return Err(AppError::new(
            ErrorCategory::ConfigurationError,
            format!("`id {}` exited with {}", flag, output.exit_code),
        )
        .with_code("CFG-010")
        .with_context("stderr", output.stderr.trim()));
    }
    output.stdout.trim().parse::<u32>().map_err(|err| {
        AppError::new(
            ErrorCategory::ConfigurationError,
            format!("`id {}` printed a non-numeric id: {}", flag, err),
        )
        .with_code("CFG-010")
    })
}
