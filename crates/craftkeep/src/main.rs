mod cli;
mod commands;
mod error;
mod lock;
mod logging;
mod settings;

use std::error::Error as _;
use std::process::ExitCode;

use clap::Parser;

use craftkeep_platform::AppPaths;

use crate::cli::{Cli, Command};
use crate::commands::Context;
use crate::error::AppError;
use crate::settings::AppSettings;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            let mut source = error.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let paths = AppPaths::new();
    let settings = paths
        .as_ref()
        .map(|p| AppSettings::load(&p.settings_file()))
        .unwrap_or_default();
    let log_path = paths.as_ref().ok().map(AppPaths::log_file);

    logging::init_logging(
        logging::terminal_level(cli.verbose, settings.debug_logging),
        log_path.as_deref(),
        settings.max_log_size_bytes,
    );

    if let Ok(paths) = &paths
        && let Err(e) = paths.ensure_dirs()
    {
        log::warn!("failed to create application directories: {e}");
    }

    let config_path = match cli.config {
        Some(path) => path,
        None => paths?.server_config_file(),
    };
    log::debug!("using configuration {}", config_path.display());
    let ctx = Context::new(config_path, settings);

    match cli.command {
        Command::Generate => commands::generate(&ctx),
        Command::Build { answers } => commands::build(&ctx, &answers),
        Command::Status => commands::status(&ctx),
        Command::Resolve { record } => commands::resolve(&ctx, record).await.map(|_| ()),
        Command::Prune { apply } => commands::prune(&ctx, apply),
        Command::Reset => commands::reset(&ctx),
    }
}
