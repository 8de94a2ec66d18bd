use std::path::PathBuf;
use std::time::Duration;

pub const EBAY_SEARCH_URL: &str = "https://www.ebay.com/sch/i.html";

/// Sort order for sold searches: most recently ended first.
pub const SOLD_SORT_ORDER: &str = "13";

pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub fn default_headers() -> [(&'static str, &'static str); 5] {
    [
        ("Accept-Language", "en-US,en;q=0.9"),
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
        ("Connection", "keep-alive"),
        ("DNT", "1"),
        ("Upgrade-Insecure-Requests", "1"),
    ]
}

/// Statuses treated as transient upstream conditions (rate limit, overload).
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(1);

pub const MIN_PAGES: u32 = 1;
pub const MAX_PAGES: u32 = 3;

/// Listings kept in a cache record for display.
pub const SAMPLE_SIZE: usize = 5;

/// Backoff caps, in seconds, for `2^attempt` sleeps.
pub const TRANSPORT_BACKOFF_CAP_SECS: u64 = 6;
pub const STATUS_BACKOFF_CAP_SECS: u64 = 8;

pub const CASP_LABEL: &str = "Calculated average sold price";

pub fn default_cache_dir() -> PathBuf {
    if let Some(cache) = dirs::cache_dir() {
        cache.join("graphite")
    } else {
        PathBuf::from(".graphite-cache")
    }
}

/// Explicit configuration handed to the estimator at construction.
///
/// Nothing here is read from the environment; two estimators with different
/// configs can coexist in one process.
#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    /// Directory for cached query results. `None` uses [`default_cache_dir`].
    pub cache_dir: Option<PathBuf>,
    /// Disable the cache entirely (no reads, no writes).
    pub cache_disabled: bool,
    /// Records older than this are ignored for cache-first reads.
    pub cache_max_age: Option<Duration>,
    /// DuckDB file for comps and estimates. `None` disables persistence.
    pub db_path: Option<PathBuf>,
    /// JSON file of override profiles. `None` means no profiles.
    pub profiles_path: Option<PathBuf>,
    pub search_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub page_delay: Duration,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            cache_disabled: false,
            cache_max_age: None,
            db_path: None,
            profiles_path: None,
            search_url: EBAY_SEARCH_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }
}

pub fn clamp_pages(pages: u32) -> u32 {
    pages.clamp(MIN_PAGES, MAX_PAGES)
}
