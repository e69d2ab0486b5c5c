#![allow(clippy::result_large_err)]

use super::AppConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::{Path, PathBuf};

/// File looked up in the working directory when `--config` is not given.
pub const LOCAL_CONFIG_FILE: &str = "asdf-to-deb.toml";

/// Configuration together with the file it came from, if any.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with precedence: defaults, config file, environment.
    ///
    /// An explicit path must exist. Without one, `./asdf-to-deb.toml` and then
    /// `$XDG_CONFIG_HOME/asdf-to-deb/config.toml` are tried; when neither
    /// exists the defaults are used.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<LoadedConfig, AppError> {
        let source = Self::resolve_path(explicit, cwd)?;
        let mut config = match &source {
            Some(path) => Self::load_from_file(path)?,
            None => AppConfig::default(),
        };
        Self::apply_env_overrides(&mut config)?;
        Ok(LoadedConfig { config, source })
    }

    fn resolve_path(explicit: Option<&Path>, cwd: &Path) -> Result<Option<PathBuf>, AppError> {
        if let Some(path) = explicit {
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                cwd.join(path)
            };
            if !path.is_file() {
                return Err(AppError::new(
                    ErrorCategory::ConfigurationError,
                    format!("config file {} does not exist", path.display()),
                )
                .with_code("CFG-001"));
            }
            return Ok(Some(path));
        }

        let local = cwd.join(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Ok(Some(local));
        }

        Ok(dirs_next::config_dir()
            .map(|dir| dir.join("asdf-to-deb").join("config.toml"))
            .filter(|path| path.is_file()))
    }

    /// Parse a single config file.
    pub fn load_from_file(path: &Path) -> Result<AppConfig, AppError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigurationError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
            .with_code("CFG-002")
        })?;

        toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigurationError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
            .with_code("CFG-003")
        })
    }

    /// Environment variables take precedence over config file values.
    fn apply_env_overrides(config: &mut AppConfig) -> Result<(), AppError> {
        if let Ok(target_dir) = env::var("ASDF_TO_DEB_TARGET_DIR") {
            config.build.target_dir = PathBuf::from(target_dir);
        }

        if let Ok(parallel) = env::var("ASDF_TO_DEB_PARALLEL") {
            config.build.parallel = parallel.trim().parse::<usize>().map_err(|_| {
                AppError::new(
                    ErrorCategory::ConfigurationError,
                    format!("ASDF_TO_DEB_PARALLEL must be a positive integer, got '{}'", parallel),
                )
                .with_code("CFG-004")
            })?;
        }

        if let Ok(user) = env::var("ASDF_TO_DEB_USER") {
            config.build.user = user;
        }

        if let Ok(runtime) = env::var("ASDF_TO_DEB_RUNTIME") {
            config.build.runtime = runtime;
        }

        if let Ok(repository) = env::var("ASDF_TO_DEB_IMAGE_REPOSITORY") {
            config.image.repository = repository;
        }

        Ok(())
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "ASDF_TO_DEB_TARGET_DIR - Override build.target_dir (default: debs)",
            "ASDF_TO_DEB_PARALLEL - Override build.parallel (default: 8)",
            "ASDF_TO_DEB_USER - Override build.user (default: asdf)",
            "ASDF_TO_DEB_RUNTIME - Override build.runtime (default: docker)",
            "ASDF_TO_DEB_IMAGE_REPOSITORY - Override image.repository (default: asdf-to-deb)",
        ]
    }
}
