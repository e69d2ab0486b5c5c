//! Drives the real binary against a shell script standing in for docker.

#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FAKE_DOCKER: &str = r#"#!/bin/sh
state="$(dirname "$0")"
echo "$*" >> "$state/calls.log"
case "$1" in
  image)
    if [ -f "$state/image" ]; then
      echo "sha256:e2e|2030-01-01T00:00:00Z"
      exit 0
    fi
    echo "Error: No such image" >&2
    exit 1
    ;;
  build)
    touch "$state/image"
    exit 0
    ;;
  run)
    shift
    out=""
    tool=""
    version=""
    while [ $# -gt 0 ]; do
      case "$1" in
        -v) out="${2%%:*}"; shift 2 ;;
        -e)
          case "$2" in
            TOOL_NAME=*) tool="${2#TOOL_NAME=}" ;;
            TOOL_VERSION=*) version="${2#TOOL_VERSION=}" ;;
          esac
          shift 2
          ;;
        *) shift ;;
      esac
    done
    if [ "$tool" = "broken" ]; then
      echo "No such plugin in plugin repository: broken" >&2
      exit 1
    fi
    if [ "$version" = "latest" ]; then
      version="1.0.0"
    fi
    file="${tool}_${version}_amd64.deb"
    : > "$out/$file"
    echo "ASDF_TO_DEB_VERSION=$version"
    echo "ASDF_TO_DEB_ARTIFACT=$file"
    exit 0
    ;;
esac
exit 2
"#;

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new(config: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("bin")).unwrap();
        let docker = dir.path().join("bin").join("docker");
        fs::write(&docker, FAKE_DOCKER).unwrap();
        fs::set_permissions(&docker, fs::Permissions::from_mode(0o755)).unwrap();
        fs::write(dir.path().join("asdf-to-deb.toml"), config).unwrap();
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn docker(&self) -> PathBuf {
        self.path().join("bin").join("docker")
    }

    fn calls(&self) -> String {
        fs::read_to_string(self.path().join("bin").join("calls.log")).unwrap_or_default()
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("asdf-to-deb"));
        cmd.current_dir(self.path())
            .env("XDG_CONFIG_HOME", self.path().join("xdg"))
            .env_remove("RUST_LOG")
            .env_remove("ASDF_TO_DEB_TARGET_DIR")
            .env_remove("ASDF_TO_DEB_PARALLEL")
            .env_remove("ASDF_TO_DEB_USER")
            .env_remove("ASDF_TO_DEB_RUNTIME")
            .env_remove("ASDF_TO_DEB_IMAGE_REPOSITORY")
            .arg("--runtime")
            .arg(self.docker());
        cmd
    }
}

const REGISTRY: &str = r#"
[[tools]]
name = "fx"

[[tools]]
name = "broken"
"#;

#[test]
fn test_registry_run_reports_partial_failure() {
    let sandbox = Sandbox::new(REGISTRY);

    sandbox
        .command()
        .arg("-p")
        .arg("2")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("ok      fx 1.0.0 ->"))
        .stdout(predicate::str::contains("FAILED  broken (exit code 1)"))
        .stdout(predicate::str::contains("1 succeeded, 1 failed"));

    assert!(sandbox.path().join("debs").join("fx_1.0.0_amd64.deb").is_file());
    let calls = sandbox.calls();
    assert!(calls.contains("build -t asdf-to-deb:asdf"));
    assert!(calls.contains("--cap-drop=all"));
}

#[test]
fn test_single_tool_succeeds_and_reuses_image() {
    let sandbox = Sandbox::new(REGISTRY);

    sandbox
        .command()
        .args(["fx", "-v", "2.5.0", "-t", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fx 2.5.0"));
    assert!(sandbox.path().join("out").join("fx_2.5.0_amd64.deb").is_file());

    sandbox.command().arg("fx").assert().success();
    assert_eq!(sandbox.calls().matches("build -t").count(), 1);
}

#[test]
fn test_rebuild_flag_bypasses_cache() {
    let sandbox = Sandbox::new(REGISTRY);
    sandbox.command().arg("fx").assert().success();
    sandbox.command().args(["fx", "-b"]).assert().success();

    let calls = sandbox.calls();
    assert_eq!(calls.matches("build -t").count(), 2);
    assert!(calls.contains("--no-cache"));
}

#[test]
fn test_json_report_flag() {
    let sandbox = Sandbox::new(REGISTRY);
    sandbox
        .command()
        .args(["fx", "--report", "report.json"])
        .assert()
        .success();

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(sandbox.path().join("report.json")).unwrap())
            .unwrap();
    assert_eq!(report["results"][0]["tool_name"], "fx");
    assert_eq!(report["results"][0]["exit_code"], 0);
}

#[test]
fn test_empty_registry_is_fatal() {
    let sandbox = Sandbox::new("");
    sandbox
        .command()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("CFG-020"));
    assert!(sandbox.calls().is_empty());
}

#[test]
fn test_zero_parallelism_is_fatal() {
    let sandbox = Sandbox::new(REGISTRY);
    sandbox.command().args(["-p", "0"]).assert().code(2);
}

#[test]
fn test_root_user_is_rejected() {
    let sandbox = Sandbox::new(REGISTRY);
    sandbox
        .command()
        .args(["fx", "-u", "root"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("root"));
}

#[test]
fn test_missing_runtime_is_fatal() {
    let sandbox = Sandbox::new(REGISTRY);
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("asdf-to-deb"));
    cmd.current_dir(sandbox.path())
        .env("XDG_CONFIG_HOME", sandbox.path().join("xdg"))
        .args(["fx", "--runtime", "/nonexistent/docker"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("RT-001"));
}

#[test]
fn test_failed_image_build_is_fatal() {
    let sandbox = Sandbox::new(REGISTRY);
    let failing = sandbox.path().join("bin").join("failing-docker");
    fs::write(
        &failing,
        "#!/bin/sh\ncase \"$1\" in\n  image) exit 1 ;;\n  build) echo 'E: broken mirror' >&2; exit 100 ;;\nesac\nexit 0\n",
    )
    .unwrap();
    fs::set_permissions(&failing, fs::Permissions::from_mode(0o755)).unwrap();

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("asdf-to-deb"));
    cmd.current_dir(sandbox.path())
        .env("XDG_CONFIG_HOME", sandbox.path().join("xdg"))
        .arg("fx")
        .arg("--runtime")
        .arg(&failing)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("IMG-001"))
        .stderr(predicate::str::contains("broken mirror"));
}

#[test]
fn test_tool_name_with_whitespace_is_fatal() {
    let sandbox = Sandbox::new(REGISTRY);
    sandbox
        .command()
        .arg("fx ")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("CFG-021"));
    assert!(sandbox.calls().is_empty());
}

#[test]
fn test_unwritable_report_still_prints_summary() {
    let sandbox = Sandbox::new(REGISTRY);
    fs::write(sandbox.path().join("blocker"), "not a directory").unwrap();

    sandbox
        .command()
        .args(["fx", "--report", "blocker/run.json"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("ok      fx 1.0.0 ->"))
        .stdout(predicate::str::contains("1 succeeded, 0 failed"))
        .stderr(predicate::str::contains("RPT-002"));
    assert!(sandbox.path().join("debs").join("fx_1.0.0_amd64.deb").is_file());
}
