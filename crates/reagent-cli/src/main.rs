//! Command-line interface for reagent

mod cli;
mod commands;
mod console;
mod setup;

use clap::Parser;
use cli::{Cli, Commands};
use commands::RunOptions;
use std::process::ExitCode;
use tracing::debug;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // A missing .env file is fine
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    reagent_utils::init_tracing(cli.log_format.into());
    if let Ok(path) = dotenv {
        debug!(path = %path.display(), "Loaded environment file");
    }

    match cli.command {
        Commands::Run {
            config,
            task,
            context,
            script,
            json,
        } => {
            commands::run(RunOptions {
                config: &config,
                task,
                context,
                script: script.as_deref(),
                json,
            })
            .await
        }
        Commands::Tools => commands::tools(),
        Commands::Invoke { name, args } => commands::invoke(&name, args.as_deref()).await,
    }
}
