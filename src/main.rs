//! Dino CLI entry point.

use anyhow::Result;
use clap::Parser;

use dino::cli::{commands, Cli, Commands};
use dino::domain::models::config::Config;
use dino::infrastructure::config::ConfigLoader;
use dino::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };

    let log_config = config
        .as_ref()
        .map(|config| LogConfig::from(&config.logging))
        .unwrap_or_default();
    let _logger = match LoggerImpl::init(&log_config) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("warning: logging disabled: {err:#}");
            None
        }
    };

    let json = cli.json;
    if let Err(err) = dispatch(cli.command, config, json).await {
        dino::cli::handle_error(err, json);
    }
}

async fn dispatch(command: Commands, config: Result<Config>, json: bool) -> Result<()> {
    match command {
        Commands::Init(args) => commands::init::execute(args, json).await,
        Commands::Space(args) => commands::space::execute(args, &config?, json).await,
        Commands::Run(args) => commands::run::execute(args, config?, json).await,
        Commands::Report(args) => commands::report::execute(args, json).await,
    }
}
