//! Probe: catalog listing endpoints
//!
//! Fetches every configured category once and documents:
//! - Latency and outcome of the request
//! - Number of products and how many carry a native id
//! - Derived ids and browsable URLs for the first few products

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use catalog_monitor::catalog::{self, CatalogClient};
use catalog_monitor::config::{AppConfig, CONFIG_PATH};

#[derive(Parser)]
#[command(name = "probe_catalog", about = "Fetch each configured category once and print a sample")]
struct Args {
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Number of sample products to print per category
    #[arg(long, default_value_t = 5)]
    sample: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = AppConfig::load_or_default(&args.config)?;
    config.validate()?;
    let client = CatalogClient::from_settings(&config.settings)?;
    debug!("Probing {} categories", config.categories.len());

    println!("=== Probe: catalog listings ===");
    println!();

    for source in &config.categories {
        println!("--- {} ---", source.name);
        println!("URL: {}", source.url);
        println!("Origin: {}", client.origin_for(source));

        let start = Instant::now();
        let result = client.try_fetch(source).await;
        println!("Latency: {:?}", start.elapsed());

        match result {
            Ok(products) => {
                let with_id = products.iter().filter(|p| catalog::has_native_id(p)).count();
                println!("Products: {} ({} with native id)", products.len(), with_id);
                for p in products.iter().take(args.sample) {
                    println!("  {} | {} | {}", p.id, p.name, p.url);
                }
            }
            Err(e) => println!("Fetch failed: {e:#}"),
        }
        println!();
    }

    println!("=== Probe complete ===");
    Ok(())
}
