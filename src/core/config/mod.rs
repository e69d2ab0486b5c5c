use crate::logging::config::LoggingSettings;
use asdf_to_deb_types::ToolSpec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod loader;
pub mod validation;

pub use loader::{ConfigLoader, LoadedConfig};
pub use validation::ConfigValidator;

/// Configuration loaded from `asdf-to-deb.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Defaults for every package build
    #[serde(default)]
    pub build: BuildConfig,

    /// Base image settings
    #[serde(default)]
    pub image: ImageConfig,

    /// Logging sinks and level
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Tool registry used when no tool is named on the command line
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Host directory receiving `.deb` archives
    #[serde(default = "default_target_dir")]
    pub target_dir: PathBuf,

    /// Maximum number of concurrent container builds
    #[serde(default = "default_parallel")]
    pub parallel: usize,

    /// Build user created inside the base image
    #[serde(default = "default_user")]
    pub user: String,

    /// Container runtime CLI
    #[serde(default = "default_runtime")]
    pub runtime: String,

    /// Maintainer field written to every control file
    #[serde(default = "default_maintainer")]
    pub maintainer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    /// Image repository; the tag is the build user
    #[serde(default = "default_repository")]
    pub repository: String,

    /// Image the base image is derived from
    #[serde(default = "default_base")]
    pub base: String,

    /// asdf git tag cloned into the image
    #[serde(default = "default_asdf_version")]
    pub asdf_version: String,

    /// Age after which a cached image triggers a rebuild hint (humantime syntax)
    #[serde(default = "default_max_age")]
    pub max_age: String,
}

fn default_target_dir() -> PathBuf {
    PathBuf::from("debs")
}

fn default_parallel() -> usize {
    8
}

fn default_user() -> String {
    "asdf".to_string()
}

fn default_runtime() -> String {
    "docker".to_string()
}

fn default_maintainer() -> String {
    "ASDF Packager <packager@example.com>".to_string()
}

fn default_repository() -> String {
    "asdf-to-deb".to_string()
}

fn default_base() -> String {
    "debian:unstable".to_string()
}

fn default_asdf_version() -> String {
    "v0.10.2".to_string()
}

fn default_max_age() -> String {
    "7d".to_string()
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            target_dir: default_target_dir(),
            parallel: default_parallel(),
            user: default_user(),
            runtime: default_runtime(),
            maintainer: default_maintainer(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        ImageConfig {
            repository: default_repository(),
            base: default_base(),
            asdf_version: default_asdf_version(),
            max_age: default_max_age(),
        }
    }
}
