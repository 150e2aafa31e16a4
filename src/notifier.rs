use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use html_escape::encode_text;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::{Secrets, SettingsConfig};
use crate::types::{DeliveryReport, ProductRecord};

/// Telegram rejects `sendMessage` texts longer than this.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Sends HTML-formatted messages to a fixed set of Telegram chats.
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    token: String,
    chat_ids: Vec<String>,
}

impl TelegramNotifier {
    pub fn new(
        api_base: &str,
        token: &str,
        chat_ids: Vec<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build messaging HTTP client")?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            chat_ids,
        })
    }

    pub fn from_settings(settings: &SettingsConfig, secrets: &Secrets) -> Result<Self> {
        Self::new(
            &settings.telegram_api_base,
            &secrets.bot_token,
            secrets.chat_ids.clone(),
            settings.request_timeout(),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }

    /// Deliver `text` to every configured chat.
    ///
    /// Blank chat ids are skipped. A failed delivery is logged and counted but
    /// does not stop delivery to the remaining chats. Texts above the Telegram
    /// limit go out as several consecutive messages.
    pub async fn announce(&self, text: &str) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for chunk in split_message(text, MAX_MESSAGE_CHARS) {
            for chat_id in &self.chat_ids {
                if chat_id.trim().is_empty() {
                    report.skipped += 1;
                    continue;
                }
                match self.send(chat_id, &chunk).await {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        warn!("Delivery to chat {chat_id} failed: {e:#}");
                        report.failed += 1;
                    }
                }
            }
        }
        debug!(
            "Announce finished: {} delivered, {} failed, {} skipped",
            report.delivered, report.failed, report.skipped
        );
        report
    }

    async fn send(&self, chat_id: &str, text: &str) -> Result<()> {
        let form = [
            ("chat_id", chat_id),
            ("text", text),
            ("parse_mode", "HTML"),
            ("disable_web_page_preview", "true"),
        ];
        // Strip the URL from transport errors: it embeds the bot token.
        let response = self
            .client
            .post(self.endpoint())
            .form(&form)
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("sendMessage request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("sendMessage returned {status}: {body}");
        }
        Ok(())
    }
}

/// Batch message for one category: a bold title, then one line per product.
///
/// `baseline` marks the first sweep's listing rather than fresh arrivals.
pub fn format_new_items(category: &str, items: &[ProductRecord], baseline: bool) -> String {
    let title = if baseline {
        "🚨 INITIAL PRODUCTS"
    } else {
        "🆕 NEW PRODUCTS"
    };
    let mut msg = format!("<b>{title} ({})</b>\n\n", encode_text(category));
    for item in items {
        msg.push_str(&format!(
            "• <b>{}</b>: {}\n",
            encode_text(&item.name),
            encode_text(&item.url)
        ));
    }
    msg.trim_end().to_string()
}

/// Startup message confirming the bot can reach its chats.
pub fn liveness_message(now: NaiveTime) -> String {
    format!(
        "<b>🧪 Catalog monitor live!</b>\n⏰ {}",
        now.format("%H:%M:%S")
    )
}

/// Split `text` into pieces of at most `limit` characters, breaking on
/// newlines where possible. Blank pieces are dropped.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        let sep = usize::from(!current.is_empty());
        if current_len + sep + line_len <= limit {
            if sep == 1 {
                current.push('\n');
            }
            current.push_str(line);
            current_len += sep + line_len;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len <= limit {
            current.push_str(line);
            current_len = line_len;
        } else {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit.max(1)) {
                chunks.push(piece.iter().collect());
            }
        }
    }
    chunks.push(current);

    chunks.retain(|c| !c.trim().is_empty());
    chunks
}
