//! ipdmeta — IPD meta-analysis extraction pipeline.
//! Entry point for the command-line binary.

mod config;
mod stages;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ipdmeta_common::SplitName;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ipdmeta", version, about = "Match, structure, extract and evaluate patient data from case reports")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "IPDMETA_CONFIG", default_value = "ipdmeta.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Group publication files by study key and write the review sheet.
    Group,
    /// Match included studies to the reviewed study groups.
    Match,
    /// Extract study texts and split them into datasets.
    Structure,
    /// Run LLM feature extraction over one dataset split.
    Extract {
        #[arg(long, value_parser = parse_split)]
        split: SplitName,
    },
    /// Score one split's extracted records against the human annotations.
    Evaluate {
        #[arg(long, value_parser = parse_split)]
        split: SplitName,
    },
}

fn parse_split(s: &str) -> Result<SplitName, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ipdmeta=debug,info")),
        )
        .init();

    let cli = Cli::parse();
    info!("ipdmeta {}", env!("CARGO_PKG_VERSION"));

    let config = config::Config::load(&cli.config)?;

    match cli.command {
        Command::Group => stages::run_group(&config),
        Command::Match => stages::run_match(&config),
        Command::Structure => stages::run_structure(&config),
        Command::Extract { split } => stages::run_extract(&config, split).await,
        Command::Evaluate { split } => stages::run_evaluate(&config, split),
    }
}
