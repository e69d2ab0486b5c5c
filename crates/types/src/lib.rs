//! Data types shared between the asdf-to-deb coordinator and its reporting layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Marker accepted in place of an explicit version pin.
pub const LATEST: &str = "latest";

/// A tool managed by asdf and the plugin repository that knows how to install it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_repo: Option<String>,
}

impl ToolSpec {
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self {
            name: name.into(),
            plugin_repo: None,
        }
    }

    pub fn with_repo<T: Into<String>, R: Into<String>>(name: T, repo: R) -> Self {
        Self {
            name: name.into(),
            plugin_repo: Some(repo.into()),
        }
    }
}

/// Which version of a tool to install.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionSpec {
    #[default]
    Latest,
    Pinned(String),
}

impl VersionSpec {
    /// `None`, an empty string, or `latest` (any case) all select the newest release.
    pub fn from_option(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None => VersionSpec::Latest,
            Some(v) if v.is_empty() || v.eq_ignore_ascii_case(LATEST) => VersionSpec::Latest,
            Some(v) => VersionSpec::Pinned(v.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            VersionSpec::Latest => LATEST,
            VersionSpec::Pinned(v) => v,
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work handed to the package builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub tool: ToolSpec,
    pub version: VersionSpec,
    pub target_dir: PathBuf,
    pub container_user: String,
}

/// Outcome of a single containerized package build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    pub tool_name: String,
    pub exit_code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr_tail: Option<String>,
    pub duration_ms: u64,
}

impl BuildResult {
    /// Result for a build that never produced a container exit status.
    pub fn not_started<T: Into<String>, M: Into<String>>(tool_name: T, message: M) -> Self {
        Self {
            tool_name: tool_name.into(),
            exit_code: -1,
            artifact: None,
            resolved_version: None,
            stderr_tail: Some(message.into()),
            duration_ms: 0,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Reference to the base image every package build runs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub rebuilt: bool,
}

/// Debian package names are lowercase and may not contain underscores.
pub fn debian_package_name(tool_name: &str) -> String {
    tool_name
        .chars()
        .map(|c| match c {
            '_' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// File name of the archive produced for `tool` at `version` on `arch`.
pub fn artifact_file_name(tool_name: &str, version: &str, arch: &str) -> String {
    format!("{}_{}_{}.deb", debian_package_name(tool_name), version, arch)
}
