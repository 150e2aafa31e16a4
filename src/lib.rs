pub mod catalog;
pub mod config;
pub mod monitor;
pub mod notifier;
pub mod reporter;
pub mod store;
pub mod types;

/// Storefront origin prepended to the relative product paths the catalog API returns.
pub const SITE_ORIGIN: &str = "https://www.sheinindia.in";

/// Catalog listing for the men's section, newest first, 45 items per page.
pub const MEN_CATALOG_URL: &str = concat!(
    "https://www.sheinindia.in/api/category/sverse-5939-37961",
    "?fields=SITE&currentPage=0&pageSize=45&format=json",
    "&query=%3Anewest%3Agenderfilter%3AMen",
    "&sort=9&gridColumns=2&facets=genderfilter%3AMen"
);

/// Telegram Bot API base URL.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Client identification sent with every catalog request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";
