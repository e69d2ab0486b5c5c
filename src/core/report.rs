#![allow(clippy::result_large_err)]

use crate::core::coordinator::overall_success;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use asdf_to_deb_types::{BuildResult, ImageRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// Process exit code when every build succeeded.
pub const EXIT_SUCCESS: u8 = 0;
/// Process exit code when at least one package build failed.
pub const EXIT_BUILD_FAILED: u8 = 1;
/// Process exit code for configuration, runtime, or image errors.
pub const EXIT_FATAL: u8 = 2;

/// Everything one run produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildReport {
    pub image: ImageRef,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<BuildResult>,
}

impl BuildReport {
    pub fn success(&self) -> bool {
        overall_success(&self.results)
    }

    pub fn succeeded_count(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.succeeded_count()
    }

    pub fn exit_code(&self) -> u8 {
        if self.success() {
            EXIT_SUCCESS
        } else {
            EXIT_BUILD_FAILED
        }
    }

    /// Human-readable summary: one line per tool plus a tally.
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        for result in &self.results {
            let version = result.resolved_version.as_deref().unwrap_or("?");
            if result.succeeded() {
                let artifact = result
                    .artifact
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "no artifact reported".to_string());
                let _ = writeln!(out, "ok      {} {} -> {}", result.tool_name, version, artifact);
            } else {
                let _ = writeln!(
                    out,
                    "FAILED  {} (exit code {})",
                    result.tool_name, result.exit_code
                );
                if let Some(tail) = &result.stderr_tail {
                    for line in tail.lines() {
                        let _ = writeln!(out, "        | {}", line);
                    }
                }
            }
        }
        let _ = writeln!(
            out,
            "{} succeeded, {} failed",
            self.succeeded_count(),
            self.failed_count()
        );
        out
    }

    pub fn write_json(&self, path: &Path) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            AppError::new(ErrorCategory::InternalError, e.to_string()).with_code("RPT-001")
        })?;
        let write_failed = |e: std::io::Error| {
            AppError::new(
                ErrorCategory::IoError,
                format!("failed to write report {}: {}", path.display(), e),
            )
            .with_code("RPT-002")
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_failed)?;
        }
        std::fs::write(path, json).map_err(write_failed)
    }
}
