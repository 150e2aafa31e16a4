use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use catalog_monitor::config::{AppConfig, CONFIG_PATH, Secrets};
use catalog_monitor::monitor::Monitor;
use catalog_monitor::reporter;
use catalog_monitor::store::SeenStore;

#[derive(Parser)]
#[command(name = "catalog-monitor", about = "Catalog new-arrival monitor with Telegram alerts")]
struct Args {
    /// Path to the TOML config file (defaults are used if it does not exist)
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Override the seen-item database path from the config
    #[arg(long)]
    db: Option<PathBuf>,

    /// Run a single sweep, print its report, and exit
    #[arg(long, conflicts_with = "init_config")]
    once: bool,

    /// Write the default config to --config and exit
    #[arg(long)]
    init_config: bool,
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

    if args.init_config {
        AppConfig::default().save(&args.config)?;
        info!("Wrote default config to {}", args.config.display());
        return Ok(());
    }

    let secrets = Secrets::from_env()?;
    let mut config = AppConfig::load_or_default(&args.config)?;
    if let Some(db) = args.db {
        config.settings.db_path = db;
    }
    config.validate()?;

    let store = SeenStore::open(&config.settings.db_path).await?;
    for cat in &config.categories {
        info!(
            "[{}] {} product(s) already recorded",
            cat.name,
            store.count(&cat.name).await?
        );
    }

    let mut monitor = Monitor::from_config(&config, &secrets, store)?;

    let startup = monitor.announce_startup().await;
    if startup.delivered == 0 {
        warn!("Startup message reached no chat ({} failed)", startup.failed);
    }
    info!(
        "Catalog monitor started: {} categories, {} chat(s), poll={}s",
        config.categories.len(),
        secrets.chat_ids.len(),
        config.settings.poll_interval_secs,
    );

    if args.once {
        let report = monitor.poll_cycle().await?;
        reporter::report_cycle(&report);
        monitor.store().close().await;
        return Ok(());
    }

    monitor
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await
}
