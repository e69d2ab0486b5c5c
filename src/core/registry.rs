//! Tool registry: the ordered list of tools a run builds.

#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use asdf_to_deb_types::ToolSpec;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;
use url::Url;

const ALLOWED_REPO_SCHEMES: &[&str] = &["https", "http", "ssh", "git", "file"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no tool named on the command line and the registry is empty")]
    Empty,
    #[error("registry entry {index} has an empty tool name")]
    EmptyName { index: usize },
    #[error("tool name '{name}' is not a valid asdf plugin name")]
    InvalidName { name: String },
    #[error("plugin repository for '{tool}' is not a valid URL: {reason}")]
    InvalidRepo { tool: String, reason: String },
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        let code = match err {
            RegistryError::Empty => "CFG-020",
            RegistryError::EmptyName { .. } | RegistryError::InvalidName { .. } => "CFG-021",
            RegistryError::InvalidRepo { .. } => "CFG-022",
        };
        let error = AppError::new(ErrorCategory::ConfigurationError, err.to_string()).with_code(code);
        match err {
            RegistryError::Empty => error.with_suggestion(
                "Name a tool on the command line or add [[tools]] entries to asdf-to-deb.toml",
            ),
            _ => error,
        }
    }
}

fn tool_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("tool name pattern is valid")
    })
}

/// Check a single entry; `index` is only used for messages.
pub fn validate_tool(index: usize, tool: &ToolSpec) -> Result<(), RegistryError> {
    if tool.name.trim().is_empty() {
        return Err(RegistryError::EmptyName { index });
    }
    // Checked untrimmed: the name is passed to the container verbatim.
    if !tool_name_pattern().is_match(&tool.name) {
        return Err(RegistryError::InvalidName {
            name: tool.name.clone(),
        });
    }
    if let Some(repo) = &tool.plugin_repo {
        let parsed = Url::parse(repo).map_err(|err| RegistryError::InvalidRepo {
            tool: tool.name.clone(),
            reason: err.to_string(),
        })?;
        if !ALLOWED_REPO_SCHEMES.contains(&parsed.scheme()) {
            return Err(RegistryError::InvalidRepo {
                tool: tool.name.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
    }
    Ok(())
}

/// Immutable list of tools, supplied by configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolRegistry {
    tools: Vec<ToolSpec>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<ToolSpec>) -> Result<Self, RegistryError> {
        for (index, tool) in tools.iter().enumerate() {
            validate_tool(index, tool)?;
        }
        Ok(Self { tools })
    }

    pub fn find(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    /// Tools to build for this run.
    ///
    /// A tool named on the command line wins over the registry. When it comes
    /// without a repository, the registry's repository for the same name is
    /// reused. Duplicate registry entries are kept as separate builds.
    pub fn select(&self, requested: Option<ToolSpec>) -> Result<Vec<ToolSpec>, RegistryError> {
        match requested {
            Some(mut tool) => {
                if tool.plugin_repo.is_none() {
                    tool.plugin_repo = self
                        .find(&tool.name)
                        .and_then(|known| known.plugin_repo.clone());
                }
                validate_tool(0, &tool)?;
                Ok(vec![tool])
            }
            None if self.tools.is_empty() => Err(RegistryError::Empty),
            None => Ok(self.tools.clone()),
        }
    }
}
