#![allow(clippy::result_large_err)]

use super::{AppConfig, ImageConfig};
use crate::core::error::AppError;
use crate::core::registry::validate_tool;
use crate::core::types::ErrorCategory;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &AppConfig) -> Result<(), AppError> {
        if config.build.parallel == 0 {
            return Err(invalid("build.parallel must be at least 1"));
        }

        Self::validate_user(&config.build.user)?;

        if config.build.runtime.trim().is_empty() {
            return Err(invalid("build.runtime cannot be empty"));
        }

        if config.build.maintainer.trim().is_empty() {
            return Err(invalid("build.maintainer cannot be empty"));
        }

        let image_name = config.image.repository.rsplit('/').next().unwrap_or_default();
        if image_name.trim().is_empty() || image_name.contains(':') {
            return Err(invalid(
                "image.repository must be a non-empty image name without a tag",
            ));
        }

        Self::max_image_age(&config.image)?;

        for (index, tool) in config.tools.iter().enumerate() {
            validate_tool(index, tool)?;
        }

        Ok(())
    }

    /// Container user names follow the useradd rules for portable names.
    pub fn validate_user(user: &str) -> Result<(), AppError> {
        if !user_name_pattern().is_match(user) {
            return Err(invalid(format!(
                "container user '{}' is not a valid user name",
                user
            )));
        }
        if user == "root" {
            return Err(invalid("container user must not be root"));
        }
        Ok(())
    }

    /// Parsed `image.max_age`.
    pub fn max_image_age(image: &ImageConfig) -> Result<Duration, AppError> {
        humantime::parse_duration(image.max_age.trim()).map_err(|e| {
            invalid(format!(
                "image.max_age '{}' is not a valid duration: {}",
                image.max_age, e
            ))
        })
    }
}

fn user_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z_][a-z0-9_-]{0,31}$").expect("user name pattern is valid")
    })
}

fn invalid<T: Into<String>>(message: T) -> AppError {
    AppError::new(ErrorCategory::ConfigurationError, message).with_code("CFG-005")
}
