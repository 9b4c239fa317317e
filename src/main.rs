use std::process::ExitCode;

use gitsync::cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    match cli.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("{error:#}");
            ExitCode::FAILURE
        }
    }
}
