use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::types::SeenEntry;

/// Durable set of `(id, category)` keys for products already processed.
///
/// Entries are written once and never updated or removed, so the table only
/// grows. All access goes through a single pooled connection.
pub struct SeenStore {
    pool: SqlitePool,
}

impl SeenStore {
    /// Open (creating if absent) the SQLite file at `path` and ensure the schema exists.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let store = Self::connect(options)
            .await
            .with_context(|| format!("failed to open seen-item store {}", path.display()))?;
        debug!("Opened seen-item store at {}", path.display());
        Ok(store)
    }

    /// Open a private in-memory store. Contents vanish when the store is dropped.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("invalid in-memory sqlite url")?;
        Self::connect(options).await
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Self> {
        // One long-lived connection: an in-memory database exists only as long
        // as its connection does.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Create the products table if it does not exist yet. Safe to call repeatedly.
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS products (
                id TEXT,
                category TEXT,
                name TEXT,
                url TEXT,
                PRIMARY KEY (id, category)
            )",
        )
        .execute(&self.pool)
        .await
        .context("failed to create products table")?;
        Ok(())
    }

    /// True when no entry exists for this exact `(id, category)` key.
    pub async fn is_new(&self, id: &str, category: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM products WHERE id = ? AND category = ?")
            .bind(id)
            .bind(category)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to look up product {id} ({category})"))?;
        Ok(row.is_none())
    }

    /// Insert an entry unless the key is already present.
    ///
    /// Returns `true` if a row was written. An existing entry keeps its
    /// original `name` and `url`.
    pub async fn record(&self, id: &str, category: &str, name: &str, url: &str) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO products (id, category, name, url) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(category)
        .bind(name)
        .bind(url)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to record product {id} ({category})"))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get(&self, id: &str, category: &str) -> Result<Option<SeenEntry>> {
        let row: Option<(String, String, String, String)> = sqlx::query_as(
            "SELECT id, category, name, url FROM products WHERE id = ? AND category = ?",
        )
        .bind(id)
        .bind(category)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to load product {id} ({category})"))?;

        Ok(row.map(|(id, category, name, url)| SeenEntry {
            id,
            category,
            name,
            url,
        }))
    }

    /// Number of entries recorded for a category.
    pub async fn count(&self, category: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category = ?")
            .bind(category)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("failed to count products for {category}"))?;
        Ok(count.max(0) as u64)
    }

    /// Flush and close the underlying connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
