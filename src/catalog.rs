use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::SettingsConfig;
use crate::types::{CategorySource, ProductRecord, RawProduct};

/// Name used when the provider omits a product name.
pub const UNKNOWN_NAME: &str = "Unknown";

/// HTTP client for the catalog listing endpoints.
pub struct CatalogClient {
    client: Client,
    default_origin: String,
}

impl CatalogClient {
    pub fn new(user_agent: &str, timeout: Duration, default_origin: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("failed to build catalog HTTP client")?;
        Ok(Self {
            client,
            default_origin: default_origin.to_string(),
        })
    }

    pub fn from_settings(settings: &SettingsConfig) -> Result<Self> {
        Self::new(
            &settings.user_agent,
            settings.request_timeout(),
            &settings.site_origin,
        )
    }

    /// Storefront origin for a category: its own override or the client default.
    pub fn origin_for<'a>(&'a self, source: &'a CategorySource) -> &'a str {
        source.origin.as_deref().unwrap_or(&self.default_origin)
    }

    /// Fetch the current listing for a category.
    ///
    /// Any failure (network, timeout, HTTP status, body shape) is logged and
    /// reported as an empty listing, so a bad poll never stops the loop.
    pub async fn fetch(&self, source: &CategorySource) -> Vec<ProductRecord> {
        match self.try_fetch(source).await {
            Ok(products) => {
                debug!("[{}] Fetched {} products", source.name, products.len());
                products
            }
            Err(e) => {
                warn!("[{}] Fetch error: {e:#}", source.name);
                Vec::new()
            }
        }
    }

    /// Fetch a category listing, surfacing the failure cause.
    pub async fn try_fetch(&self, source: &CategorySource) -> Result<Vec<ProductRecord>> {
        let response = self
            .client
            .get(&source.url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", source.url))?
            .error_for_status()
            .context("catalog returned an error status")?;
        let body: Value = response
            .json()
            .await
            .context("catalog response is not valid JSON")?;
        parse_products(&body, &source.name, self.origin_for(source))
    }
}

/// Extract product records from a catalog response body.
///
/// Fails only when the `products` array is absent. Entries that are not
/// product objects are skipped.
pub fn parse_products(body: &Value, category: &str, origin: &str) -> Result<Vec<ProductRecord>> {
    let items = body
        .get("products")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow::anyhow!("response has no products array"))?;

    let mut products = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<RawProduct>(item.clone()) {
            Ok(raw) => products.push(to_record(&raw, category, origin)),
            Err(e) => debug!("[{category}] Skipping malformed product entry: {e}"),
        }
    }
    Ok(products)
}

fn to_record(raw: &RawProduct, category: &str, origin: &str) -> ProductRecord {
    let relative_url = raw.url_str().to_string();
    let name = raw.name_str().unwrap_or(UNKNOWN_NAME).to_string();
    ProductRecord {
        id: derive_id(raw),
        name,
        url: product_url(origin, &relative_url),
        relative_url,
        category: category.to_string(),
    }
}

/// The provider's id when present and non-empty, else a hash of the relative URL.
pub fn derive_id(raw: &RawProduct) -> String {
    match &raw.id {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => fallback_id(raw.url_str()),
    }
}

/// Hex SHA-256 of a relative product URL.
pub fn fallback_id(relative_url: &str) -> String {
    hex::encode(Sha256::digest(relative_url.as_bytes()))
}

/// Whether a record's id came from the provider rather than the URL hash.
pub fn has_native_id(product: &ProductRecord) -> bool {
    product.id != fallback_id(&product.relative_url)
}

pub fn product_url(origin: &str, relative_url: &str) -> String {
    format!("{origin}{relative_url}")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw(value: Value) -> RawProduct {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn native_string_id_is_kept_exactly() {
        let p = raw(json!({"id": "443322-ab", "url": "/p/1"}));
        assert_eq!(derive_id(&p), "443322-ab");
    }

    #[test]
    fn whitespace_id_is_still_a_native_id() {
        let p = raw(json!({"id": " ", "url": "/p/1"}));
        assert_eq!(derive_id(&p), " ");
    }

    #[test]
    fn native_numeric_id_is_stringified() {
        let p = raw(json!({"id": 443322, "url": "/p/1"}));
        assert_eq!(derive_id(&p), "443322");
    }

    #[test]
    fn missing_or_empty_id_falls_back_to_url_hash() {
        let missing = raw(json!({"url": "/p/42"}));
        let empty = raw(json!({"id": "", "url": "/p/42"}));
        let null = raw(json!({"id": null, "url": "/p/42"}));

        let expected = fallback_id("/p/42");
        assert_eq!(derive_id(&missing), expected);
        assert_eq!(derive_id(&empty), expected);
        assert_eq!(derive_id(&null), expected);
        assert_eq!(derive_id(&missing), derive_id(&missing));
    }

    #[test]
    fn fallback_id_is_stable_sha256_hex() {
        assert_eq!(
            fallback_id(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(fallback_id("/p/42").len(), 64);
        assert_ne!(fallback_id("/p/42"), fallback_id("/p/43"));
    }

    #[test]
    fn parse_builds_records_with_origin_and_default_name() {
        let body = json!({
            "products": [
                {"id": "1", "name": "Shirt", "url": "/p/1"},
                {"id": "2", "url": "/p/2"},
                {"id": "3", "name": "  ", "url": "/p/3"}
            ]
        });
        let products = parse_products(&body, "Men", "https://shop.example.com").unwrap();
        assert_eq!(products.len(), 3);
        assert_eq!(products[0].name, "Shirt");
        assert_eq!(products[0].url, "https://shop.example.com/p/1");
        assert_eq!(products[0].relative_url, "/p/1");
        assert_eq!(products[0].category, "Men");
        assert_eq!(products[1].name, UNKNOWN_NAME);
        assert_eq!(products[2].name, UNKNOWN_NAME);
    }

    #[test]
    fn native_ids_are_told_apart_from_hashes() {
        let body = json!({"products": [
            {"id": "1", "url": "/p/1"},
            {"id": 2, "url": "/p/2"},
            {"url": "/p/3"}
        ]});
        let products = parse_products(&body, "Men", "").unwrap();
        let native: Vec<bool> = products.iter().map(has_native_id).collect();
        assert_eq!(native, [true, true, false]);
    }

    #[test]
    fn parse_skips_non_object_entries() {
        let body = json!({"products": [42, "junk", {"id": "1", "url": "/p/1"}]});
        let products = parse_products(&body, "Men", "").unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "1");
    }

    #[test]
    fn parse_keeps_products_with_odd_field_types() {
        let body = json!({"products": [
            {"id": "5", "name": 123, "url": "/p/5"},
            {"id": "6", "name": "Cap", "url": 6}
        ]});
        let products = parse_products(&body, "Men", "https://shop.example.com").unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].id, "5");
        assert_eq!(products[0].name, UNKNOWN_NAME);
        assert_eq!(products[0].url, "https://shop.example.com/p/5");
        assert_eq!(products[1].name, "Cap");
        assert_eq!(products[1].relative_url, "");
    }

    #[test]
    fn parse_requires_products_array() {
        assert!(parse_products(&json!({"items": []}), "Men", "").is_err());
        assert!(parse_products(&json!({"products": {}}), "Men", "").is_err());
        assert!(parse_products(&json!([]), "Men", "").is_err());
    }

    #[test]
    fn origin_override_wins() {
        let client =
            CatalogClient::new("test", Duration::from_secs(1), "https://default.example").unwrap();
        let mut source = CategorySource {
            name: "Men".to_string(),
            url: "https://api.example/men".to_string(),
            origin: None,
        };
        assert_eq!(client.origin_for(&source), "https://default.example");
        source.origin = Some("https://other.example".to_string());
        assert_eq!(client.origin_for(&source), "https://other.example");
    }
}
