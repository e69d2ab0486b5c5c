//! Bounded fan-out of package builds.

use crate::core::package::PackageBuilder;
use asdf_to_deb_types::{BuildRequest, BuildResult, ToolSpec, VersionSpec};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub struct BuildCoordinator {
    builder: Arc<PackageBuilder>,
}

impl BuildCoordinator {
    pub fn new(builder: Arc<PackageBuilder>) -> Self {
        Self { builder }
    }

    /// Build every tool with at most `parallelism` containers in flight.
    ///
    /// Returns exactly one result per tool, in input order. A worker that
    /// panics is reported as a failed build rather than dropped.
    pub async fn run_all(
        &self,
        specs: &[ToolSpec],
        parallelism: usize,
        version: &VersionSpec,
        target_dir: &Path,
        container_user: &str,
    ) -> Vec<BuildResult> {
        let parallelism = parallelism.max(1);
        tracing::info!(
            tools = specs.len(),
            parallelism,
            version = %version,
            target_dir = %target_dir.display(),
            "dispatching package builds"
        );

        let semaphore = Arc::new(Semaphore::new(parallelism));
        let mut join_set = JoinSet::new();
        let mut slot_by_task = HashMap::with_capacity(specs.len());

        for (slot, tool) in specs.iter().enumerate() {
            let request = BuildRequest {
                tool: tool.clone(),
                version: version.clone(),
                target_dir: target_dir.to_path_buf(),
                container_user: container_user.to_string(),
            };
            let builder = Arc::clone(&self.builder);
            let semaphore = Arc::clone(&semaphore);
            let handle = join_set.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => builder.build_package(&request).await,
                    Err(err) => BuildResult::not_started(
                        request.tool.name.clone(),
                        format!("no build slot available: {}", err),
                    ),
                };
                (slot, result)
            });
            slot_by_task.insert(handle.id(), slot);
        }

        let mut slots: Vec<Option<BuildResult>> = vec![None; specs.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((slot, result)) => {
                    tracing::debug!(
                        tool = %result.tool_name,
                        exit_code = result.exit_code,
                        "build finished"
                    );
                    slots[slot] = Some(result);
                }
                Err(err) => {
                    let slot = slot_by_task.get(&err.id()).copied();
                    tracing::error!(error = %err, "build worker aborted");
                    if let Some(slot) = slot {
                        slots[slot] = Some(BuildResult::not_started(
                            specs[slot].name.clone(),
                            format!("build worker aborted: {}", err),
                        ));
                    }
                }
            }
        }

        slots
            .into_iter()
            .zip(specs)
            .map(|(result, spec)| {
                result.unwrap_or_else(|| {
                    BuildResult::not_started(spec.name.clone(), "build produced no result")
                })
            })
            .collect()
    }
}

/// True when no build exited non-zero.
pub fn overall_success(results: &[BuildResult]) -> bool {
    results.iter().all(BuildResult::succeeded)
}
