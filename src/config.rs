use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::CategorySource;
use crate::{DEFAULT_USER_AGENT, MEN_CATALOG_URL, SITE_ORIGIN, TELEGRAM_API_BASE};

/// Default config file path.
pub const CONFIG_PATH: &str = "config.toml";

/// Environment variable holding the Telegram bot token.
pub const BOT_TOKEN_VAR: &str = "BOT_TOKEN";

/// Environment variable holding comma-separated destination chat ids.
pub const CHAT_IDS_VAR: &str = "CHAT_IDS";

/// Top-level application config deserialized from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default = "default_categories")]
    pub categories: Vec<CategorySource>,
}

/// Runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Delay in seconds between the end of one sweep and the start of the next.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Per-request timeout in seconds for catalog and messaging calls.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// SQLite file backing the seen-item store.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_site_origin")]
    pub site_origin: String,
    #[serde(default = "default_telegram_api_base")]
    pub telegram_api_base: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Announce the first sweep's items as an initial listing instead of
    /// silently recording them.
    #[serde(default)]
    pub announce_baseline: bool,
}

fn default_poll_interval() -> u64 {
    15
}

fn default_request_timeout() -> u64 {
    15
}

fn default_db_path() -> PathBuf {
    PathBuf::from("catalog.db")
}

fn default_site_origin() -> String {
    SITE_ORIGIN.to_string()
}

fn default_telegram_api_base() -> String {
    TELEGRAM_API_BASE.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_categories() -> Vec<CategorySource> {
    vec![CategorySource {
        name: "Men".to_string(),
        url: MEN_CATALOG_URL.to_string(),
        origin: None,
    }]
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            request_timeout_secs: default_request_timeout(),
            db_path: default_db_path(),
            site_origin: default_site_origin(),
            telegram_api_base: default_telegram_api_base(),
            user_agent: default_user_agent(),
            announce_baseline: false,
        }
    }
}

impl SettingsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings: SettingsConfig::default(),
            categories: default_categories(),
        }
    }
}

impl AppConfig {
    /// Load config from the given TOML file path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Load config from `path` if it exists, otherwise use the built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let config = Self::load(path)?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Write config to a new TOML file, creating parent directories.
    ///
    /// An existing file at `path` is never overwritten.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("failed to serialize config")?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .with_context(|| format!("refusing to write {}", path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Reject configs the monitor cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            anyhow::bail!("at least one category must be configured");
        }
        if self.settings.poll_interval_secs == 0 {
            anyhow::bail!("settings.poll_interval_secs must be positive");
        }
        if self.settings.request_timeout_secs == 0 {
            anyhow::bail!("settings.request_timeout_secs must be positive");
        }
        let api_base = &self.settings.telegram_api_base;
        url::Url::parse(api_base)
            .with_context(|| format!("invalid telegram_api_base {api_base}"))?;

        let mut names = HashSet::new();
        for cat in &self.categories {
            if cat.name.trim().is_empty() {
                anyhow::bail!("category name must not be empty");
            }
            if !names.insert(cat.name.as_str()) {
                anyhow::bail!("duplicate category name {:?}", cat.name);
            }
            url::Url::parse(&cat.url)
                .with_context(|| format!("invalid url for category {}", cat.name))?;
        }
        Ok(())
    }
}

/// Credentials supplied by the hosting environment.
#[derive(Clone)]
pub struct Secrets {
    pub bot_token: String,
    pub chat_ids: Vec<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("bot_token", &"<redacted>")
            .field("chat_ids", &self.chat_ids)
            .finish()
    }
}

impl Secrets {
    /// Read secrets from the process environment (after loading `.env`).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build secrets from an arbitrary variable lookup.
    ///
    /// Fails when the token is missing or blank, or when no non-blank chat id
    /// remains after splitting on commas.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = lookup(BOT_TOKEN_VAR)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow::anyhow!("{BOT_TOKEN_VAR} is missing or empty"))?;

        let chat_ids: Vec<String> = lookup(CHAT_IDS_VAR)
            .unwrap_or_default()
            .split(',')
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        if chat_ids.is_empty() {
            anyhow::bail!("{CHAT_IDS_VAR} is missing or lists no chat ids");
        }

        Ok(Self {
            bot_token,
            chat_ids,
        })
    }
}
