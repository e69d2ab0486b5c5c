//! A fully resolved run: which tools, where, how wide, and in which image.

#![allow(clippy::result_large_err)]

use crate::core::config::{AppConfig, ConfigValidator};
use crate::core::coordinator::BuildCoordinator;
use crate::core::error::AppError;
use crate::core::image::{ImageBuilder, ImageSettings};
use crate::core::package::PackageBuilder;
use crate::core::registry::ToolRegistry;
use crate::core::report::BuildReport;
use crate::core::types::ErrorCategory;
use crate::runtime::{ContainerRuntime, HostIdentity};
use asdf_to_deb_types::{ToolSpec, VersionSpec};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Values given on the command line; `None` falls back to configuration.
#[derive(Debug, Clone, Default)]
pub struct PlanOverrides {
    pub tool: Option<ToolSpec>,
    pub version: Option<String>,
    pub force_rebuild: bool,
    pub container_user: Option<String>,
    pub target_dir: Option<PathBuf>,
    pub parallelism: Option<usize>,
    pub runtime: Option<String>,
    pub report_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildPlan {
    pub tools: Vec<ToolSpec>,
    pub version: VersionSpec,
    pub force_rebuild: bool,
    pub container_user: String,
    pub target_dir: PathBuf,
    pub parallelism: usize,
    pub runtime: String,
    pub maintainer: String,
    pub image: ImageSettings,
    pub report_path: Option<PathBuf>,
}

impl BuildPlan {
    /// Merge CLI overrides over configuration. Relative paths resolve against `cwd`.
    pub fn resolve(
        overrides: PlanOverrides,
        config: &AppConfig,
        cwd: &Path,
    ) -> Result<Self, AppError> {
        let mut effective = config.clone();
        if let Some(user) = overrides.container_user {
            effective.build.user = user;
        }
        if let Some(parallelism) = overrides.parallelism {
            effective.build.parallel = parallelism;
        }
        if let Some(runtime) = overrides.runtime {
            effective.build.runtime = runtime;
        }
        if let Some(target_dir) = overrides.target_dir {
            effective.build.target_dir = target_dir;
        }
        ConfigValidator::validate(&effective)?;

        let registry = ToolRegistry::new(effective.tools.clone())?;
        let tools = registry.select(overrides.tool)?;

        Ok(BuildPlan {
            tools,
            version: VersionSpec::from_option(overrides.version.as_deref()),
            force_rebuild: overrides.force_rebuild,
            container_user: effective.build.user,
            target_dir: absolutize(cwd, &effective.build.target_dir),
            parallelism: effective.build.parallel,
            runtime: effective.build.runtime,
            maintainer: effective.build.maintainer,
            image: ImageSettings::from_config(&effective.image)?,
            report_path: overrides.report_path.map(|path| absolutize(cwd, &path)),
        })
    }

    /// Prepare the target directory, ensure the base image, build every tool.
    ///
    /// Configuration and image failures are returned as errors before any
    /// package build starts; package failures only show up in the report.
    /// The JSON report is written separately by [`BuildPlan::write_report`].
    pub async fn execute(
        &self,
        runtime: Arc<dyn ContainerRuntime>,
        identity: HostIdentity,
    ) -> Result<BuildReport, AppError> {
        let started_at = Utc::now();
        let target_dir = prepare_target_dir(&self.target_dir)?;

        let image = ImageBuilder::new(Arc::clone(&runtime), self.image.clone(), identity)
            .ensure_base_image(self.force_rebuild, &self.container_user)
            .await?;

        let builder = Arc::new(PackageBuilder::new(
            runtime,
            image.clone(),
            self.maintainer.clone(),
        ));
        let results = BuildCoordinator::new(builder)
            .run_all(
                &self.tools,
                self.parallelism,
                &self.version,
                &target_dir,
                &self.container_user,
            )
            .await;

        Ok(BuildReport {
            image,
            started_at,
            finished_at: Utc::now(),
            results,
        })
    }

    /// Write the JSON report when `--report` was given.
    pub fn write_report(&self, report: &BuildReport) -> Result<(), AppError> {
        if let Some(path) = &self.report_path {
            report.write_json(path)?;
            tracing::info!(report = %path.display(), "wrote build report");
        }
        Ok(())
    }
}

fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Create the target directory and return its canonical path for bind mounts.
pub fn prepare_target_dir(path: &Path) -> Result<PathBuf, AppError> {
    std::fs::create_dir_all(path)
        .and_then(|_| path.canonicalize())
        .map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigurationError,
                format!("target directory {} is not usable: {}", path.display(), e),
            )
            .with_code("CFG-030")
        })
}
