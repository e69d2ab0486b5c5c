//! Container runtime capability used by the image and package builders.
//!
//! Builders only talk to [`ContainerRuntime`]; [`DockerRuntime`] is the
//! production implementation and drives any Docker-compatible CLI.

#![allow(clippy::result_large_err)]

pub mod command;
pub mod docker;
pub mod identity;

pub use command::{
    CommandExecutionOutput, CommandExecutionRequest, CommandRunner, TokioCommandRunner,
};
pub use docker::DockerRuntime;
pub use identity::HostIdentity;

use crate::core::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Metadata about an image already present in the runtime's store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub id: String,
    pub created: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageBuildRequest {
    pub tag: String,
    /// Directory holding the Dockerfile.
    pub context_dir: PathBuf,
    pub build_args: BTreeMap<String, String>,
    pub no_cache: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindMount {
    pub host_path: PathBuf,
    pub container_path: String,
    pub read_only: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContainerRunRequest {
    pub image: String,
    pub name: String,
    pub user: Option<String>,
    pub mounts: Vec<BindMount>,
    pub env: BTreeMap<String, String>,
    pub drop_all_capabilities: bool,
    pub add_capabilities: Vec<String>,
    pub security_opts: Vec<String>,
    pub remove_on_exit: bool,
    pub command: Vec<String>,
}

/// Operations this tool needs from a container runtime.
///
/// Implementations return `Err` only when the runtime itself cannot be
/// invoked; a build or container that ran and exited non-zero is reported
/// through [`CommandExecutionOutput::exit_code`].
#[async_trait]
pub trait ContainerRuntime: Send + Sync + 'static {
    /// Human-readable runtime name used in logs.
    fn name(&self) -> &str;

    async fn inspect_image(&self, tag: &str) -> Result<Option<ImageInfo>, AppError>;

    async fn image_exists(&self, tag: &str) -> Result<bool, AppError> {
        Ok(self.inspect_image(tag).await?.is_some())
    }

    async fn build_image(
        &self,
        request: &ImageBuildRequest,
    ) -> Result<CommandExecutionOutput, AppError>;

    async fn run_container(
        &self,
        request: &ContainerRunRequest,
    ) -> Result<CommandExecutionOutput, AppError>;
}
