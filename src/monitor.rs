use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info};

use crate::catalog::CatalogClient;
use crate::config::{AppConfig, Secrets};
use crate::notifier::{TelegramNotifier, format_new_items, liveness_message};
use crate::reporter;
use crate::store::SeenStore;
use crate::types::{CategoryReport, CategorySource, CycleReport, DeliveryReport, ProductRecord};

/// The polling loop: fetch every category, record unseen products, announce them.
///
/// The first sweep after construction only establishes the baseline; its
/// items are recorded but not announced unless baseline announcements are
/// enabled. A process restart therefore re-baselines silently.
pub struct Monitor {
    store: SeenStore,
    catalog: CatalogClient,
    notifier: TelegramNotifier,
    sources: Vec<CategorySource>,
    poll_interval: Duration,
    announce_baseline: bool,
    first_run: bool,
}

impl Monitor {
    pub fn new(
        store: SeenStore,
        catalog: CatalogClient,
        notifier: TelegramNotifier,
        sources: Vec<CategorySource>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            catalog,
            notifier,
            sources,
            poll_interval,
            announce_baseline: false,
            first_run: true,
        }
    }

    /// Build a monitor from validated config, environment secrets and an opened store.
    pub fn from_config(config: &AppConfig, secrets: &Secrets, store: SeenStore) -> Result<Self> {
        let catalog = CatalogClient::from_settings(&config.settings)?;
        let notifier = TelegramNotifier::from_settings(&config.settings, secrets)?;
        Ok(Self::new(
            store,
            catalog,
            notifier,
            config.categories.clone(),
            config.settings.poll_interval(),
        )
        .with_baseline_announcements(config.settings.announce_baseline))
    }

    pub fn with_baseline_announcements(mut self, enabled: bool) -> Self {
        self.announce_baseline = enabled;
        self
    }

    pub fn is_first_run(&self) -> bool {
        self.first_run
    }

    pub fn store(&self) -> &SeenStore {
        &self.store
    }

    /// Send the one-off startup message.
    pub async fn announce_startup(&self) -> DeliveryReport {
        let now = chrono::Local::now().time();
        self.notifier.announce(&liveness_message(now)).await
    }

    /// Fetch one category and record every product not seen before.
    ///
    /// Returns the number of products fetched and the newly recorded ones, in
    /// listing order. Store failures propagate.
    pub async fn collect_new(
        &self,
        source: &CategorySource,
    ) -> Result<(usize, Vec<ProductRecord>)> {
        let products = self.catalog.fetch(source).await;
        let fetched = products.len();

        let mut new_items = Vec::new();
        for product in products {
            if self.store.is_new(&product.id, &product.category).await? {
                self.store
                    .record(&product.id, &product.category, &product.name, &product.url)
                    .await?;
                new_items.push(product);
            }
        }
        Ok((fetched, new_items))
    }

    /// One sweep over every configured category, in order.
    pub async fn poll_cycle(&mut self) -> Result<CycleReport> {
        let first_run = self.first_run;
        let mut report = CycleReport {
            timestamp: chrono::Utc::now().to_rfc3339(),
            first_run,
            categories: Vec::with_capacity(self.sources.len()),
            deliveries: DeliveryReport::default(),
        };

        for source in &self.sources {
            let (fetched, new_items) = self.collect_new(source).await?;

            let announce = !new_items.is_empty() && (!first_run || self.announce_baseline);
            if announce {
                info!("[{}] {} new product(s)", source.name, new_items.len());
                let msg = format_new_items(&source.name, &new_items, first_run);
                report.deliveries.merge(self.notifier.announce(&msg).await);
            } else if first_run {
                info!(
                    "[{}] Baseline: recorded {} product(s)",
                    source.name,
                    new_items.len()
                );
            } else {
                debug!("[{}] No new products", source.name);
            }

            report.categories.push(CategoryReport {
                category: source.name.clone(),
                fetched,
                new_items,
                announced: announce,
            });
        }

        self.first_run = false;
        Ok(report)
    }

    /// Poll forever, sleeping `poll_interval` between sweeps, until `shutdown`
    /// resolves. Each sweep is reported as a JSON line on stdout.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            "Entering polling loop ({} categories, interval: {}s). Press Ctrl+C to stop.",
            self.sources.len(),
            self.poll_interval.as_secs()
        );

        loop {
            let report = self.poll_cycle().await?;
            reporter::report_cycle(&report);

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        self.store.close().await;
        Ok(())
    }
}
