#![allow(clippy::result_large_err)]

use super::{
    CommandExecutionOutput, CommandExecutionRequest, CommandRunner, ContainerRunRequest,
    ContainerRuntime, ImageBuildRequest, ImageInfo, TokioCommandRunner,
};
use crate::core::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

const INSPECT_FORMAT: &str = "{{.Id}}|{{.Created}}";

/// Drives `docker` (or a CLI-compatible replacement such as `podman`).
pub struct DockerRuntime {
    program: String,
    runner: Arc<dyn CommandRunner>,
}

impl DockerRuntime {
    pub fn new<P: Into<String>>(program: P) -> Self {
        Self {
            program: program.into(),
            runner: Arc::new(TokioCommandRunner),
        }
    }

    pub fn with_runner<P: Into<String>>(program: P, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    fn command(&self) -> CommandExecutionRequest {
        CommandExecutionRequest::new(self.program.clone())
    }

    pub(crate) fn build_command(&self, request: &ImageBuildRequest) -> CommandExecutionRequest {
        let mut cmd = self.command().arg("build").arg("-t").arg(request.tag.clone());
        if request.no_cache {
            cmd = cmd.arg("--no-cache");
        }
        for (key, value) in &request.build_args {
            cmd = cmd.arg("--build-arg").arg(format!("{}={}", key, value));
        }
        cmd.arg(request.context_dir.display().to_string())
    }

    pub(crate) fn run_command(&self, request: &ContainerRunRequest) -> CommandExecutionRequest {
        let mut cmd = self.command().arg("run");
        if request.remove_on_exit {
            cmd = cmd.arg("--rm");
        }
        cmd = cmd.arg("--name").arg(request.name.clone());
        if request.drop_all_capabilities {
            cmd = cmd.arg("--cap-drop=all");
        }
        for cap in &request.add_capabilities {
            cmd = cmd.arg(format!("--cap-add={}", cap));
        }
        for opt in &request.security_opts {
            cmd = cmd.arg(format!("--security-opt={}", opt));
        }
        if let Some(user) = &request.user {
            cmd = cmd.arg(format!("--user={}", user));
        }
        for mount in &request.mounts {
            let mut spec = format!(
                "{}:{}",
                mount.host_path.display(),
                mount.container_path
            );
            if mount.read_only {
                spec.push_str(":ro");
            }
            cmd = cmd.arg("-v").arg(spec);
        }
        for (key, value) in &request.env {
            cmd = cmd.arg("-e").arg(format!("{}={}", key, value));
        }
        cmd.arg(request.image.clone()).args(request.command.iter().cloned())
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    fn name(&self) -> &str {
        &self.program
    }

    async fn inspect_image(&self, tag: &str) -> Result<Option<ImageInfo>, AppError> {
        let cmd = self
            .command()
            .args(["image", "inspect", "--format", INSPECT_FORMAT, tag]);
        let output = self.runner.run(&cmd).await?;
        if !output.success() {
            tracing::debug!(tag, stderr = %output.stderr.trim(), "image not present");
            return Ok(None);
        }
        Ok(parse_inspect_line(output.stdout.trim()))
    }

    async fn build_image(
        &self,
        request: &ImageBuildRequest,
    ) -> Result<CommandExecutionOutput, AppError> {
        let cmd = self.build_command(request);
        tracing::debug!(command = %cmd.display(), "building image");
        self.runner.run(&cmd).await
    }

    async fn run_container(
        &self,
        request: &ContainerRunRequest,
    ) -> Result<CommandExecutionOutput, AppError> {
        let cmd = self.run_command(request);
        tracing::debug!(container = %request.name, image = %request.image, "running container");
        self.runner.run(&cmd).await
    }
}

fn parse_inspect_line(line: &str) -> Option<ImageInfo> {
    let first = line.lines().next()?.trim();
    if first.is_empty() {
        return None;
    }
    let (id, created) = match first.split_once('|') {
        Some((id, created)) => (id.trim(), parse_created(created.trim())),
        None => (first, None),
    };
    Some(ImageInfo {
        id: id.to_string(),
        created,
    })
}

/// Docker prints RFC 3339; podman prints `2024-05-01 10:00:00.123 +0000 UTC`.
fn parse_created(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    let trimmed = raw.strip_suffix(" UTC").unwrap_or(raw);
    DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f %z")
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}
