use crate::logging::layers::console::ConsoleOutput;
use crate::Result;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::filter::Directive;

const DEFAULT_LEVEL: &str = "info";
const DEBUG_LEVEL: &str = "debug";

/// `[logging]` section of the config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    pub default_level: Option<String>,
    pub enable_file: Option<bool>,
    pub log_dir: Option<PathBuf>,
    pub console_output: Option<ConsoleOutput>,
}

/// Resolved logging configuration after applying the file section and `-d`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub log_dir: Option<PathBuf>,
    pub default_level: String,
    pub enable_file: bool,
    pub console_output: ConsoleOutput,
    /// Set by `-d`; wins over `RUST_LOG` and `default_level`.
    pub debug: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            default_level: DEFAULT_LEVEL.to_string(),
            enable_file: false,
            console_output: ConsoleOutput::default(),
            debug: false,
        }
    }
}

impl LoggingConfig {
    /// Precedence: defaults, config file section, `-d` flag.
    pub fn resolve(settings: &LoggingSettings, debug: bool) -> Result<Self> {
        let mut config = LoggingConfig::default();
        if let Some(level) = &settings.default_level {
            config.default_level = level.clone();
        }
        if let Some(enable_file) = settings.enable_file {
            config.enable_file = enable_file;
        }
        if let Some(log_dir) = &settings.log_dir {
            config.log_dir = Some(log_dir.clone());
        }
        if let Some(console_output) = settings.console_output {
            config.console_output = console_output;
        }
        config.debug = debug;
        config.validate()?;
        Ok(config)
    }

    /// Filter directive used when `RUST_LOG` does not apply.
    pub fn effective_level(&self) -> &str {
        if self.debug {
            DEBUG_LEVEL
        } else {
            &self.default_level
        }
    }

    fn validate(&self) -> Result<()> {
        Directive::from_str(&self.default_level)
            .map_err(|_| anyhow!("logging.default_level must be a valid tracing directive"))?;
        Ok(())
    }
}
