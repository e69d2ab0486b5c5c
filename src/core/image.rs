//! Base image management.
//!
//! The base image carries asdf and a build user whose numeric ids match the
//! host user. It is tagged `<repository>:<user>` and reused across runs until
//! a rebuild is forced.

#![allow(clippy::result_large_err)]

use crate::core::config::{ConfigValidator, ImageConfig};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::runtime::command::tail_lines;
use crate::runtime::{ContainerRuntime, HostIdentity, ImageBuildRequest, ImageInfo};
use asdf_to_deb_types::ImageRef;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const STDERR_TAIL_LINES: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageSettings {
    pub repository: String,
    pub base: String,
    pub asdf_version: String,
    pub max_age: Duration,
}

impl ImageSettings {
    pub fn from_config(config: &ImageConfig) -> Result<Self, AppError> {
        let max_age = ConfigValidator::max_image_age(config)?;
        Ok(Self {
            repository: config.repository.clone(),
            base: config.base.clone(),
            asdf_version: config.asdf_version.clone(),
            max_age,
        })
    }

    pub fn tag_for(&self, user: &str) -> String {
        format!("{}:{}", self.repository, user)
    }
}

impl Default for ImageSettings {
    fn default() -> Self {
        // Defaults always parse.
        Self::from_config(&ImageConfig::default()).unwrap_or_else(|_| Self {
            repository: "asdf-to-deb".to_string(),
            base: "debian:unstable".to_string(),
            asdf_version: "v0.10.2".to_string(),
            max_age: Duration::from_secs(7 * 24 * 3600),
        })
    }
}

pub struct ImageBuilder {
    runtime: Arc<dyn ContainerRuntime>,
    settings: ImageSettings,
    identity: HostIdentity,
}

impl ImageBuilder {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        settings: ImageSettings,
        identity: HostIdentity,
    ) -> Self {
        Self {
            runtime,
            settings,
            identity,
        }
    }

    /// Return the base image for `container_user`, building it when it is
    /// missing or `force_rebuild` is set.
    pub async fn ensure_base_image(
        &self,
        force_rebuild: bool,
        container_user: &str,
    ) -> Result<ImageRef, AppError> {
        ConfigValidator::validate_user(container_user)?;
        let tag = self.settings.tag_for(container_user);

        if force_rebuild {
            tracing::info!(tag = %tag, "rebuild of base image requested");
        } else if let Some(info) = self.runtime.inspect_image(&tag).await? {
            self.warn_if_stale(&tag, &info);
            tracing::info!(tag = %tag, id = %info.id, "reusing base image");
            return Ok(ImageRef {
                tag,
                id: Some(info.id),
                rebuilt: false,
            });
        } else {
            tracing::info!(tag = %tag, "base image not found, building");
        }

        self.build(tag, container_user, force_rebuild).await
    }

    async fn build(
        &self,
        tag: String,
        container_user: &str,
        no_cache: bool,
    ) -> Result<ImageRef, AppError> {
        let context = tempfile::Builder::new()
            .prefix("asdf-to-deb-image")
            .tempdir()?;
        std::fs::write(
            context.path().join("Dockerfile"),
            render_dockerfile(&self.settings),
        )?;

        let mut build_args = BTreeMap::new();
        build_args.insert("ASDF_USER".to_string(), container_user.to_string());
        build_args.insert("BUILD_UID".to_string(), self.identity.uid.to_string());
        build_args.insert("BUILD_GID".to_string(), self.identity.gid.to_string());

        let request = ImageBuildRequest {
            tag: tag.clone(),
            context_dir: context.path().to_path_buf(),
            build_args,
            no_cache,
        };

        let started = std::time::Instant::now();
        let output = self.runtime.build_image(&request).await?;
        if !output.success() {
            return Err(AppError::new(
                ErrorCategory::ImageBuildError,
                format!(
                    "{} build of {} exited with code {}",
                    self.runtime.name(),
                    tag,
                    output.exit_code
                ),
            )
            .with_code("IMG-001")
            .with_context("stderr", tail_lines(&output.stderr, STDERR_TAIL_LINES))
            .with_suggestion("Re-run with -d to see the full runtime command"));
        }
        tracing::info!(
            tag = %tag,
            elapsed = %humantime::format_duration(Duration::from_secs(started.elapsed().as_secs())),
            "base image built"
        );

        let id = self.runtime.inspect_image(&tag).await?.map(|info| info.id);
        Ok(ImageRef {
            tag,
            id,
            rebuilt: true,
        })
    }

    fn warn_if_stale(&self, tag: &str, info: &ImageInfo) {
        let Some(created) = info.created else {
            return;
        };
        let Ok(age) = (Utc::now() - created).to_std() else {
            return;
        };
        if age > self.settings.max_age {
            tracing::warn!(
                tag = %tag,
                age = %humantime::format_duration(Duration::from_secs(age.as_secs())),
                "base image is older than {}; pass -b to rebuild it",
                humantime::format_duration(self.settings.max_age)
            );
        }
    }
}

/// Dockerfile for the base image. User and ids arrive as build args.
pub fn render_dockerfile(settings: &ImageSettings) -> String {
    format!(
        r#"FROM {base}

ARG ASDF_USER=asdf
ARG BUILD_UID=1000
ARG BUILD_GID=1000

RUN apt-get update \
 && DEBIAN_FRONTEND=noninteractive apt-get install -y --no-install-recommends \
      bash ca-certificates curl git build-essential fakeroot dpkg-dev unzip xz-utils \
 && rm -rf /var/lib/apt/lists/*

RUN (getent group "$BUILD_GID" || groupadd -g "$BUILD_GID" "$ASDF_USER") \
 && useradd -m -o -u "$BUILD_UID" -g "$BUILD_GID" -s /bin/bash "$ASDF_USER"

USER $ASDF_USER
WORKDIR /home/$ASDF_USER

RUN git clone --depth 1 --branch {asdf_version} https://github.com/asdf-vm/asdf.git "$HOME/.asdf" \
 && echo '. "$HOME/.asdf/asdf.sh"' >> "$HOME/.bashrc" \
 && echo '. "$HOME/.asdf/completions/asdf.bash"' >> "$HOME/.bashrc"

SHELL ["/bin/bash", "-l", "-c"]
"#,
        base = settings.base,
        asdf_version = settings.asdf_version,
    )
}
