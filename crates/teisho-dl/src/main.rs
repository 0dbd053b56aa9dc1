use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use teisho_core::{Batch, BatchReport, Config};

#[derive(Parser, Debug)]
#[command(name = "teisho-dl", about = "Download and tag the teisho podcast archive")]
struct Args {
    /// Config file (default: ~/.config/teishos/config.toml, created if missing)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root directory for the <year>/<filename> tree
    #[arg(long)]
    target_dir: Option<PathBuf>,

    /// Listing page to scan for episode links
    #[arg(long)]
    listing_url: Option<String>,

    /// Fallback host tried after a connection failure
    #[arg(long)]
    mirror_base: Option<String>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => Config::load().context("Failed to load config")?,
        };

        if let Some(dir) = &self.target_dir {
            config.paths.target_dir = dir.clone();
        }
        if let Some(url) = &self.listing_url {
            config.source.listing_url = url.clone();
        }
        if let Some(base) = &self.mirror_base {
            config.source.mirror_base = base.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Allow RUST_LOG override; keep connection-level chatter from the HTTP
    // stack out of the progress output.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(log_filter.as_str())
        .with_target(false)
        .init();

    let config = args.load_config()?;

    if args.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    tracing::info!(
        "teisho-dl starting: {} -> {}",
        config.source.listing_url,
        config.paths.target_dir.display()
    );

    let batch = Batch::new(config)?;
    let report = batch.run().await?;
    print_summary(&report);

    Ok(())
}

fn print_summary(report: &BatchReport) {
    println!(
        "{} podcasts: {} downloaded, {} already present, {} tagged.",
        report.found(),
        report.downloaded(),
        report.skipped(),
        report.tagged()
    );

    println!("Podcasts in error:");
    for failed in report.failures() {
        println!("Podcast: {}", failed.episode);
        println!("Error: {}", failed.error.as_deref().unwrap_or_default());
    }
}
