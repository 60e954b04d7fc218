//! eq-cli - Parametric Equalizer
//!
//! Command-line front end for offline rendering and curve inspection.

use clap::Parser;
use env_logger::Env;
use log::info;

use nueva_eq::cli::{commands, Cli, Commands};
use nueva_eq::config::EngineConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("eq-cli v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Some(Commands::Render {
            input,
            bands,
            output,
        }) => {
            commands::render(config, &input, bands.as_deref(), &output)?;
        }
        Some(Commands::Response {
            bands,
            points,
            json,
        }) => {
            let curve = commands::response(config, bands.as_deref(), points)?;
            commands::print_response(&curve, json)?;
        }
        Some(Commands::Preset { output }) => commands::preset(output.as_deref())?,
        None => {
            println!("eq-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
        }
    }
    Ok(())
}
