pub mod args;
pub mod commands;

pub use args::BuildArgs;
use clap::Parser;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nARGUMENTS:\n{positionals}\n\
\nOPTIONS:\n{options}\n";

#[derive(Parser, Debug)]
#[command(name = "asdf-to-deb")]
#[command(version = crate::VERSION)]
#[command(about = "Build Debian packages from asdf-managed tools inside containers")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Without TOOL_NAME every tool in the configured registry is built.\n\nExamples:\n    asdf-to-deb\n    asdf-to-deb fx -v 31.0.0\n    asdf-to-deb golangci-lint https://github.com/hypnoglow/asdf-golangci-lint -t ./out -p 2\n\nExit codes: 0 all packages built, 1 at least one build failed, 2 configuration, runtime or image error."
)]
pub struct Args {
    #[command(flatten)]
    pub build: BuildArgs,
}

/// Run one packaging session and return the process exit code.
pub async fn run(args: Args) -> Result<u8, crate::core::AppError> {
    commands::build(args.build).await
}
