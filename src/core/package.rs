//! One containerized asdf install + `dpkg-deb` packaging run per tool.

use crate::runtime::command::tail_lines;
use crate::runtime::{BindMount, ContainerRunRequest, ContainerRuntime};
use asdf_to_deb_types::{debian_package_name, BuildRequest, BuildResult, ImageRef};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Mount point of the host target directory inside the container.
pub const CONTAINER_OUTPUT_DIR: &str = "/out";

const STDERR_TAIL_LINES: usize = 20;
const VERSION_MARKER: &str = "ASDF_TO_DEB_VERSION=";
const ARTIFACT_MARKER: &str = "ASDF_TO_DEB_ARTIFACT=";

const ADDED_CAPABILITIES: &[&str] = &["CHOWN", "FOWNER", "SETUID", "SETGID"];

/// Runs inside the base image. Tool data arrives through the environment only.
const BUILD_SCRIPT: &str = r#". "$HOME/.asdf/asdf.sh"
set -euo pipefail

if [ -n "${TOOL_PLUGIN_REPO:-}" ]; then
  asdf plugin add "$TOOL_NAME" "$TOOL_PLUGIN_REPO"
else
  asdf plugin add "$TOOL_NAME"
fi

version="$TOOL_VERSION"
if [ "$version" = "latest" ]; then
  version="$(asdf latest "$TOOL_NAME")"
fi

asdf install "$TOOL_NAME" "$version"
asdf global "$TOOL_NAME" "$version"

arch="$(dpkg --print-architecture)"
package="$(printf '%s' "$TOOL_NAME" | tr '[:upper:]_' '[:lower:]-')"
staging="$(mktemp -d)"
mkdir -p "$staging/DEBIAN" "$staging/usr"
cat > "$staging/DEBIAN/control" <<CONTROL
Package: $package
Version: $version
Section: base
Priority: optional
Architecture: $arch
Maintainer: $PACKAGE_MAINTAINER
Description: $TOOL_NAME packaged from asdf
CONTROL
cp -R "$HOME/.asdf/installs/$TOOL_NAME/$version/." "$staging/usr/"

artifact="${package}_${version}_${arch}.deb"
# Only complete archives appear under their final name.
partial="$(mktemp -p "__OUTPUT_DIR__" ".${artifact}.XXXXXX")"
trap 'rm -f "$partial"' EXIT
fakeroot dpkg-deb --build "$staging" "$partial" >&2
chmod 0644 "$partial"
mv -f "$partial" "__OUTPUT_DIR__/$artifact"
echo "ASDF_TO_DEB_VERSION=$version"
echo "ASDF_TO_DEB_ARTIFACT=$artifact"
"#;

/// Values the build script reports on stdout.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BuildMarkers {
    pub version: Option<String>,
    pub artifact: Option<String>,
}

pub fn parse_markers(stdout: &str) -> BuildMarkers {
    let mut markers = BuildMarkers::default();
    for line in stdout.lines().map(str::trim) {
        if let Some(version) = line.strip_prefix(VERSION_MARKER) {
            markers.version = Some(version.to_string());
        } else if let Some(artifact) = line.strip_prefix(ARTIFACT_MARKER) {
            // Only ever a bare file name under the output directory.
            markers.artifact = Path::new(artifact)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned());
        }
    }
    markers
}

pub fn build_script() -> String {
    BUILD_SCRIPT.replace("__OUTPUT_DIR__", CONTAINER_OUTPUT_DIR)
}

pub struct PackageBuilder {
    runtime: Arc<dyn ContainerRuntime>,
    image: ImageRef,
    maintainer: String,
}

impl PackageBuilder {
    pub fn new<M: Into<String>>(
        runtime: Arc<dyn ContainerRuntime>,
        image: ImageRef,
        maintainer: M,
    ) -> Self {
        Self {
            runtime,
            image,
            maintainer: maintainer.into(),
        }
    }

    pub fn container_request(&self, request: &BuildRequest) -> ContainerRunRequest {
        let mut env = BTreeMap::new();
        env.insert("TOOL_NAME".to_string(), request.tool.name.clone());
        if let Some(repo) = &request.tool.plugin_repo {
            env.insert("TOOL_PLUGIN_REPO".to_string(), repo.clone());
        }
        env.insert(
            "TOOL_VERSION".to_string(),
            request.version.as_str().to_string(),
        );
        env.insert("PACKAGE_MAINTAINER".to_string(), self.maintainer.clone());

        let suffix = Uuid::new_v4().simple().to_string();
        ContainerRunRequest {
            image: self.image.tag.clone(),
            name: format!(
                "asdf-to-deb-{}-{}",
                debian_package_name(&request.tool.name),
                &suffix[..8]
            ),
            user: Some(request.container_user.clone()),
            mounts: vec![BindMount {
                host_path: request.target_dir.clone(),
                container_path: CONTAINER_OUTPUT_DIR.to_string(),
                read_only: false,
            }],
            env,
            drop_all_capabilities: true,
            add_capabilities: ADDED_CAPABILITIES.iter().map(|c| c.to_string()).collect(),
            security_opts: vec!["no-new-privileges".to_string()],
            remove_on_exit: true,
            command: vec!["bash".to_string(), "-c".to_string(), build_script()],
        }
    }

    /// Build one package. Failures are recorded in the result, never raised.
    pub async fn build_package(&self, request: &BuildRequest) -> BuildResult {
        let started = Instant::now();
        let tool = request.tool.name.as_str();
        let run = self.container_request(request);
        tracing::info!(
            tool,
            version = %request.version,
            plugin_repo = request.tool.plugin_repo.as_deref().unwrap_or("-"),
            container = %run.name,
            "starting package build"
        );

        let output = match self.runtime.run_container(&run).await {
            Ok(output) => output,
            Err(err) => {
                tracing::error!(tool, error = %err, "container could not be started");
                let mut result = BuildResult::not_started(tool, err.message);
                result.duration_ms = started.elapsed().as_millis() as u64;
                return result;
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;
        let markers = parse_markers(&output.stdout);

        if !output.success() {
            let stderr_tail = tail_lines(&output.stderr, STDERR_TAIL_LINES);
            tracing::error!(
                tool,
                exit_code = output.exit_code,
                stderr = %stderr_tail,
                "package build failed"
            );
            return BuildResult {
                tool_name: tool.to_string(),
                exit_code: output.exit_code,
                artifact: None,
                resolved_version: markers.version,
                stderr_tail: Some(stderr_tail).filter(|tail| !tail.is_empty()),
                duration_ms,
            };
        }

        let artifact = markers
            .artifact
            .map(|file_name| request.target_dir.join(file_name));
        match &artifact {
            Some(path) => {
                tracing::info!(tool, artifact = %path.display(), duration_ms, "package built")
            }
            None => tracing::warn!(tool, "build exited cleanly but reported no artifact"),
        }

        BuildResult {
            tool_name: tool.to_string(),
            exit_code: output.exit_code,
            artifact,
            resolved_version: markers.version,
            stderr_tail: None,
            duration_ms,
        }
    }
}
