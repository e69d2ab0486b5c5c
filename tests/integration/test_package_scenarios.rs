#[path = "../support/fake_runtime.rs"]
mod fake_runtime;

use asdf_to_deb::core::config::AppConfig;
use asdf_to_deb::core::plan::{BuildPlan, PlanOverrides};
use asdf_to_deb::core::report::{BuildReport, EXIT_BUILD_FAILED, EXIT_SUCCESS};
use asdf_to_deb::core::types::ErrorCategory;
use asdf_to_deb::runtime::HostIdentity;
use asdf_to_deb::types::ToolSpec;
use fake_runtime::{FakeRuntime, LATEST_RESOLVES_TO};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

const IDENTITY: HostIdentity = HostIdentity {
    uid: 1000,
    gid: 1000,
};

fn registry_config(tools: &[&str]) -> AppConfig {
    let mut config = AppConfig::default();
    config.tools = tools.iter().map(|name| ToolSpec::new(*name)).collect();
    config
}

fn plan(temp: &TempDir, config: &AppConfig, overrides: PlanOverrides) -> BuildPlan {
    BuildPlan::resolve(overrides, config, temp.path()).unwrap()
}

#[tokio::test]
async fn test_registry_run_writes_every_package() {
    let temp = TempDir::new().unwrap();
    let runtime = Arc::new(FakeRuntime::new());
    let plan = plan(&temp, &registry_config(&["fx", "golang_ci"]), PlanOverrides::default());

    let report = plan.execute(runtime.clone(), IDENTITY).await.unwrap();

    assert_eq!(report.exit_code(), EXIT_SUCCESS);
    assert!(report.image.rebuilt);
    let debs = temp.path().join("debs").canonicalize().unwrap();
    let expected = [
        debs.join(format!("fx_{}_amd64.deb", LATEST_RESOLVES_TO)),
        debs.join(format!("golang-ci_{}_amd64.deb", LATEST_RESOLVES_TO)),
    ];
    for (result, path) in report.results.iter().zip(expected.iter()) {
        assert_eq!(result.artifact.as_ref(), Some(path));
        assert!(path.is_file());
        assert_eq!(result.resolved_version.as_deref(), Some(LATEST_RESOLVES_TO));
    }
}

#[tokio::test]
async fn test_single_tool_with_pinned_version_and_repo() {
    let temp = TempDir::new().unwrap();
    let runtime = Arc::new(FakeRuntime::new());
    let overrides = PlanOverrides {
        tool: Some(ToolSpec::with_repo(
            "golangci-lint",
            "https://github.com/hypnoglow/asdf-golangci-lint",
        )),
        version: Some("1.55.2".to_string()),
        target_dir: Some(PathBuf::from("out")),
        ..PlanOverrides::default()
    };
    let plan = plan(&temp, &registry_config(&["fx"]), overrides);

    let report = plan.execute(runtime.clone(), IDENTITY).await.unwrap();

    assert_eq!(report.results.len(), 1);
    let artifact = report.results[0].artifact.clone().unwrap();
    assert!(artifact.ends_with("out/golangci-lint_1.55.2_amd64.deb"));

    let runs = runtime.runs.lock().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(
        runs[0].env["TOOL_PLUGIN_REPO"],
        "https://github.com/hypnoglow/asdf-golangci-lint"
    );
    assert_eq!(runs[0].env["TOOL_VERSION"], "1.55.2");
    assert_eq!(runs[0].user.as_deref(), Some("asdf"));
    assert_eq!(runs[0].image, "asdf-to-deb:asdf");
}

#[tokio::test]
async fn test_failed_tool_reports_exit_code_and_stderr_tail() {
    let temp = TempDir::new().unwrap();
    let runtime = Arc::new(FakeRuntime::new().failing("nosuchtool"));
    let plan = plan(
        &temp,
        &registry_config(&["fx", "nosuchtool"]),
        PlanOverrides::default(),
    );

    let report = plan.execute(runtime, IDENTITY).await.unwrap();

    assert_eq!(report.exit_code(), EXIT_BUILD_FAILED);
    let failed = &report.results[1];
    assert_eq!(failed.exit_code, 1);
    assert!(failed.artifact.is_none());
    assert!(failed
        .stderr_tail
        .as_deref()
        .unwrap()
        .contains("No such plugin"));
    assert!(report.results[0].succeeded());
}

#[tokio::test]
async fn test_unstartable_container_is_a_failed_result() {
    let temp = TempDir::new().unwrap();
    let runtime = Arc::new(FakeRuntime::new().unstartable("fx"));
    let plan = plan(&temp, &registry_config(&["fx", "jq"]), PlanOverrides::default());

    let report = plan.execute(runtime, IDENTITY).await.unwrap();

    assert_eq!(report.results[0].exit_code, -1);
    assert!(report.results[1].succeeded());
    assert_eq!(report.exit_code(), EXIT_BUILD_FAILED);
}

#[tokio::test]
async fn test_clean_exit_without_markers_keeps_success() {
    let temp = TempDir::new().unwrap();
    let runtime = Arc::new(FakeRuntime::new().silent("fx"));
    let plan = plan(&temp, &registry_config(&["fx"]), PlanOverrides::default());

    let report = plan.execute(runtime, IDENTITY).await.unwrap();

    assert_eq!(report.exit_code(), EXIT_SUCCESS);
    assert!(report.results[0].artifact.is_none());
}

#[tokio::test]
async fn test_image_failure_stops_before_package_builds() {
    let temp = TempDir::new().unwrap();
    let runtime = Arc::new(FakeRuntime::new().with_build_exit(1));
    let plan = plan(&temp, &registry_config(&["fx"]), PlanOverrides::default());

    let err = plan.execute(runtime.clone(), IDENTITY).await.unwrap_err();

    assert_eq!(err.category, ErrorCategory::ImageBuildError);
    assert_eq!(runtime.run_count(), 0);
}

#[tokio::test]
async fn test_json_report_is_written() {
    let temp = TempDir::new().unwrap();
    let runtime = Arc::new(FakeRuntime::new());
    let overrides = PlanOverrides {
        report_path: Some(PathBuf::from("reports/run.json")),
        ..PlanOverrides::default()
    };
    let plan = plan(&temp, &registry_config(&["fx"]), overrides);

    let report = plan.execute(runtime, IDENTITY).await.unwrap();
    assert!(!temp.path().join("reports").exists());
    plan.write_report(&report).unwrap();

    let text = std::fs::read_to_string(temp.path().join("reports/run.json")).unwrap();
    let parsed: BuildReport = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, report);
}

#[tokio::test]
async fn test_custom_user_selects_matching_image_and_container_user() {
    let temp = TempDir::new().unwrap();
    let runtime = Arc::new(FakeRuntime::new());
    let overrides = PlanOverrides {
        container_user: Some("builder".to_string()),
        ..PlanOverrides::default()
    };
    let plan = plan(&temp, &registry_config(&["fx"]), overrides);

    let report = plan.execute(runtime.clone(), IDENTITY).await.unwrap();

    assert_eq!(report.image.tag, "asdf-to-deb:builder");
    assert_eq!(
        runtime.runs.lock().unwrap()[0].user.as_deref(),
        Some("builder")
    );
}

#[tokio::test]
async fn test_unwritable_report_keeps_build_results() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("blocker"), "not a directory").unwrap();
    let runtime = Arc::new(FakeRuntime::new());
    let overrides = PlanOverrides {
        report_path: Some(PathBuf::from("blocker/run.json")),
        ..PlanOverrides::default()
    };
    let plan = plan(&temp, &registry_config(&["fx"]), overrides);

    let report = plan.execute(runtime, IDENTITY).await.unwrap();
    assert_eq!(report.results.len(), 1);
    assert!(report.results[0].succeeded());
    assert!(report.render_summary().contains("1 succeeded, 0 failed"));

    let err = plan.write_report(&report).unwrap_err();
    assert_eq!(err.code, "RPT-002");
    assert_eq!(err.category, ErrorCategory::IoError);
}
