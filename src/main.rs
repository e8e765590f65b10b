//! tubechat CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tubechat::cli::{commands, Cli, Commands};
use tubechat::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => Settings::expand_path(path),
        None => Settings::default_config_path(),
    };
    let settings = Settings::load_from(Some(&config_path))?;

    // RUST_LOG wins, then -v, then the configured level
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.is_empty() => EnvFilter::new(directives),
        _ => {
            let level = match cli.verbose {
                0 => settings.general.log_level.as_str(),
                1 => "info",
                2 => "debug",
                _ => "trace",
            };
            EnvFilter::new(format!("tubechat={}", level))
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    match &cli.command {
        Commands::Chat { url, model } => {
            commands::run_chat(url.clone(), model.clone(), settings).await?;
        }

        Commands::Ask {
            url,
            question,
            model,
            k,
            mmr,
        } => {
            commands::run_ask(url, question, model.clone(), *k, *mmr, settings).await?;
        }

        Commands::Transcript { url, output, format } => {
            commands::run_transcript(url, output.clone(), *format, settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, *port, settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings, &config_path)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, &config_path)?;
        }
    }

    Ok(())
}
