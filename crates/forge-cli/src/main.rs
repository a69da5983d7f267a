//! `forge`: inspect and edit a file-backed Forge store

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use forge_store::{CollectionStore, FileBackend, StoreConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "forge", version, about = "Asset Forge store administration")]
struct Cli {
    /// Store configuration (TOML); defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the store files
    #[arg(short, long, default_value = "forge-data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "forge=info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => StoreConfig::default(),
    };
    tracing::debug!(data_dir = %cli.data_dir.display(), "opening store");

    let store = Arc::new(CollectionStore::open(
        Arc::new(FileBackend::new(&cli.data_dir)),
        config,
    ));
    let output = commands::run(&store, cli.command).await?;
    store.close();

    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("rendering output")?
    );
    Ok(())
}
