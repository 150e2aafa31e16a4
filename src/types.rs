use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A configured catalog listing to poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySource {
    /// Category label, also half of the seen-item key.
    pub name: String,
    /// Catalog API endpoint returning `{"products": [...]}`.
    pub url: String,
    /// Storefront origin for this category; falls back to `settings.site_origin`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

/// Product entry as it appears in the catalog API response.
///
/// Every field is optional and loosely typed: the provider omits `id` on
/// some listings and sends it as either a string or a number on others. A
/// display field of an unexpected type must not hide the product.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProduct {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub url: Option<Value>,
}

impl RawProduct {
    /// The `name` field when it is a non-blank string.
    pub fn name_str(&self) -> Option<&str> {
        self.name
            .as_ref()
            .and_then(Value::as_str)
            .filter(|n| !n.trim().is_empty())
    }

    /// The relative `url` field, or `""` when absent or not a string.
    pub fn url_str(&self) -> &str {
        self.url.as_ref().and_then(Value::as_str).unwrap_or_default()
    }
}

/// A product extracted from one fetch, with its derived identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    pub relative_url: String,
    /// Browsable URL: site origin followed by `relative_url`.
    pub url: String,
    pub category: String,
}

/// A persisted seen-item row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenEntry {
    pub id: String,
    pub category: String,
    pub name: String,
    pub url: String,
}

/// Outcome of one message fanned out to every destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl DeliveryReport {
    pub fn merge(&mut self, other: DeliveryReport) {
        self.delivered += other.delivered;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

/// Per-category numbers for one sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryReport {
    pub category: String,
    pub fetched: usize,
    pub new_items: Vec<ProductRecord>,
    pub announced: bool,
}

/// Summary of one full sweep over all categories, emitted as a JSON line.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub timestamp: String,
    pub first_run: bool,
    pub categories: Vec<CategoryReport>,
    pub deliveries: DeliveryReport,
}

impl CycleReport {
    pub fn total_new(&self) -> usize {
        self.categories.iter().map(|c| c.new_items.len()).sum()
    }
}
