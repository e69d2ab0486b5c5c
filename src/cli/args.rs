use asdf_to_deb_types::ToolSpec;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// asdf plugin name to package (default: every tool in the registry)
    #[arg(value_name = "TOOL_NAME")]
    pub tool_name: Option<String>,

    /// Git URL of the asdf plugin (default: the asdf plugin index)
    #[arg(value_name = "TOOL_PLUGIN_REPO", requires = "tool_name")]
    pub tool_plugin_repo: Option<String>,

    /// Rebuild the base image without cache before packaging
    #[arg(short = 'b', long = "rebuild-image")]
    pub rebuild_image: bool,

    /// Tool version to install (default: latest)
    #[arg(short = 'v', long = "version-pin", value_name = "VERSION")]
    pub version_pin: Option<String>,

    /// User the build runs as inside the container (default: asdf)
    #[arg(short = 'u', long, value_name = "USER")]
    pub user: Option<String>,

    /// Log at debug level, including every runtime command
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Directory that receives the .deb files (default: debs)
    #[arg(short = 't', long, value_name = "DIR")]
    pub target_dir: Option<PathBuf>,

    /// Maximum number of concurrent package builds (default: 8)
    #[arg(short = 'p', long, value_name = "N")]
    pub parallel: Option<usize>,

    /// Configuration file (default: ./asdf-to-deb.toml, then the user config dir)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Container runtime executable, e.g. docker or podman
    #[arg(long, value_name = "PROGRAM")]
    pub runtime: Option<String>,

    /// Write a JSON report of the run to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

impl BuildArgs {
    /// The tool named on the command line, if any.
    pub fn tool(&self) -> Option<ToolSpec> {
        self.tool_name.as_ref().map(|name| ToolSpec {
            name: name.clone(),
            plugin_repo: self.tool_plugin_repo.clone(),
        })
    }
}
