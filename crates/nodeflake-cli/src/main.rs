#![doc = include_str!("../README.md")]

mod commands;
mod config;
mod telemetry;

use clap::Parser;
use config::{CliArgs, Command, GenerateConfig};
use telemetry::init_telemetry;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();

    init_telemetry()?;

    match args.command {
        Command::Generate(args) => {
            let config = GenerateConfig::try_from(args)?;
            if cfg!(debug_assertions) {
                tracing::debug!("generate config: {config:#?}");
            }
            commands::generate(&config, commands::stdout())
        }
        Command::Decode(args) => commands::decode(&args, commands::stdout()),
    }
}
