#![allow(clippy::result_large_err)]

use crate::{
    cli::args::BuildArgs,
    core::{AppError, BuildPlan, BuildReport, ConfigLoader, ErrorCategory, PlanOverrides},
    logging::{self, LoggingConfig},
    runtime::{ContainerRuntime, DockerRuntime, HostIdentity, TokioCommandRunner},
};
use std::{env, path::Path, sync::Arc};

/// Convert parsed arguments into plan overrides.
pub fn overrides_from_args(args: &BuildArgs) -> PlanOverrides {
    PlanOverrides {
        tool: args.tool(),
        version: args.version_pin.clone(),
        force_rebuild: args.rebuild_image,
        container_user: args.user.clone(),
        target_dir: args.target_dir.clone(),
        parallelism: args.parallel,
        runtime: args.runtime.clone(),
        report_path: args.report.clone(),
    }
}

/// Load configuration, set up logging, then run the full build.
pub async fn build(args: BuildArgs) -> Result<u8, AppError> {
    let cwd = env::current_dir()?;
    let loaded = ConfigLoader::load(args.config.as_deref(), &cwd)?;

    let logging_config =
        LoggingConfig::resolve(&loaded.config.logging, args.debug).map_err(|e| {
            AppError::new(ErrorCategory::ConfigurationError, e.to_string()).with_code("CFG-040")
        })?;
    let log_base = loaded
        .source
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or(cwd.as_path())
        .to_path_buf();
    let _guard = logging::init(&logging_config, &log_base)?;
    match &loaded.source {
        Some(source) => tracing::debug!(config = %source.display(), "loaded configuration"),
        None => tracing::debug!("no configuration file found, using defaults"),
    }

    let plan = BuildPlan::resolve(overrides_from_args(&args), &loaded.config, &cwd)?;
    tracing::info!(
        tools = plan.tools.len(),
        runtime = %plan.runtime,
        target_dir = %plan.target_dir.display(),
        "starting asdf-to-deb run"
    );

    let runner = Arc::new(TokioCommandRunner);
    let runtime: Arc<dyn ContainerRuntime> =
        Arc::new(DockerRuntime::with_runner(plan.runtime.clone(), runner.clone()));
    let identity = HostIdentity::resolve(runner.as_ref()).await?;

    let report = plan.execute(runtime, identity).await?;
    print_summary(&report);
    plan.write_report(&report)?;
    Ok(report.exit_code())
}

fn print_summary(report: &BuildReport) {
    print!("{}", report.render_summary());
    if report.success() {
        tracing::info!(packages = report.results.len(), "all packages built");
    } else {
        tracing::warn!(failed = report.failed_count(), "some packages failed to build");
    }
}
