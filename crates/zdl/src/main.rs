mod cli;
mod commands;
mod error;
mod logging;
mod settings;

use std::process::ExitCode;

use clap::Parser;
use zdl_platform::AppPaths;

use crate::cli::Cli;
use crate::error::CliError;
use crate::settings::Settings;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::debug!("command failed: {error:?}");
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<(), CliError> {
    let paths = AppPaths::new()?;
    let _ = paths.ensure_dirs();
    let settings = Settings::load(&paths.settings_file());

    let log_file = settings.debug_logging.then(|| paths.log_file());
    logging::init_logging(
        cli.global.verbose,
        log_file.as_deref(),
        settings.max_log_size_bytes,
    );

    let effective = settings.effective(&cli.global, &paths)?;
    commands::run(cli.command(), &effective, &paths).await
}
