use anyhow::Context;
use clap::{Parser, Subcommand};
use library_connectivity_map::{config, data, scope::ScopeState, server};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print connectivity statistics for the world or one country
    Summarize {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(long, value_name = "NAME")]
        country: Option<String>,
    },
    /// Serve the dashboard API and front-end
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Summarize { config, country } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let scoper = data::load_scoper(&app_config)
                .await
                .context("Failed to load the library dataset")?;

            let worldwide = ScopeState::worldwide(&scoper);
            let state = match country {
                Some(name) => worldwide.select_country(&scoper, name),
                None => worldwide,
            };
            info!("Summarizing {} libraries", state.stats.total_points);

            println!("{}", serde_json::to_string_pretty(&state.stats)?);
        }
        Commands::Serve { config } => {
            info!("Serving dashboard with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;
            server::start_server(app_config).await?;
        }
    }

    Ok(())
}
