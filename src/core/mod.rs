pub mod config;
pub mod coordinator;
pub mod error;
pub mod image;
pub mod package;
pub mod plan;
pub mod registry;
pub mod report;
pub mod types;

pub use config::{AppConfig, ConfigLoader, ConfigValidator, LoadedConfig};
pub use coordinator::{overall_success, BuildCoordinator};
pub use error::{AppError, DefaultErrorReporter, ErrorReporter};
pub use image::{ImageBuilder, ImageSettings};
pub use package::PackageBuilder;
pub use plan::{BuildPlan, PlanOverrides};
pub use registry::{RegistryError, ToolRegistry};
pub use report::{BuildReport, EXIT_BUILD_FAILED, EXIT_FATAL, EXIT_SUCCESS};
pub use types::*;
