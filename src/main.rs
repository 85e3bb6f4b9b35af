pub mod types;
pub mod error;
pub mod config;
pub mod data;
pub mod boundaries;
pub mod translate;
pub mod matching;
pub mod processing;
pub mod scale;
pub mod render;
pub mod chart;
pub mod pipeline;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the choropleth map and the top-5 chart
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print how each source name was translated and matched
    Match {
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
        Commands::Generate { config } => {
            let app_config = config::AppConfig::load_or_default(config)?;
            let translator = translate::from_config(&app_config.translation)?;

            let summary = pipeline::generate(&app_config, translator.as_ref()).await?;

            println!("Drew {} of {} countries", summary.drawn, summary.table.len());
            for (rank, record) in summary.top.iter().enumerate() {
                println!("{}. {} {}", rank + 1, record.name, chart::format_thousands(record.total));
            }
        }
        Commands::Match { config } => {
            let app_config = config::AppConfig::load_or_default(config)?;
            let translator = translate::from_config(&app_config.translation)?;

            let matched = pipeline::match_names(&app_config, translator.as_ref()).await?;
            if matched.mapping.is_empty() {
                println!("No rows with totals in {:?}", app_config.input.spreadsheet);
            }

            for m in matched.mapping.entries() {
                println!("{} -> {} -> {} ({})", m.source, m.english, m.canonical, m.score);
            }
        }
    }

    Ok(())
}
