use asdf_to_deb::cli::{self, Args};
use asdf_to_deb::core::{DefaultErrorReporter, ErrorReporter, EXIT_FATAL};
use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match cli::run(args).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            DefaultErrorReporter::new().report_error(&err);
            ExitCode::from(EXIT_FATAL)
        }
    }
}
