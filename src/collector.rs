//! Multi-page sold-listing collection.

use reqwest::Url;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config;
use crate::error::FetchError;
use crate::extract::parse_sold_results;
use crate::fetch::{Cancellation, Fetcher, Pacer};
use crate::models::Listing;

/// Build the sold/completed search URL for one results page.
pub fn build_sold_search_url(
    base: &str,
    query: &str,
    page: u32,
) -> std::result::Result<String, FetchError> {
    let page = page.to_string();
    Url::parse_with_params(
        base,
        &[
            ("_nkw", query),
            ("LH_Sold", "1"),
            ("LH_Complete", "1"),
            ("_sop", config::SOLD_SORT_ORDER),
            ("_pgn", page.as_str()),
        ],
    )
    .map(String::from)
    .map_err(|e| FetchError::Transport {
        url: base.to_string(),
        message: format!("invalid search URL: {}", e),
    })
}

/// Keep the first listing seen for each URL.
pub fn dedupe_by_url(listings: Vec<Listing>) -> Vec<Listing> {
    let mut seen = HashSet::new();
    listings
        .into_iter()
        .filter(|l| seen.insert(l.url.clone()))
        .collect()
}

/// Drives the fetcher and extractor across result pages.
///
/// Pages are fetched one after another with a pause in between; they are
/// never requested concurrently.
pub struct Collector {
    fetcher: Fetcher,
    pacer: Arc<dyn Pacer>,
    search_url: String,
}

impl Collector {
    pub fn new(fetcher: Fetcher, pacer: Arc<dyn Pacer>, search_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            pacer,
            search_url: search_url.into(),
        }
    }

    /// Collect sold listings for `query` over `pages` pages (clamped to 1..=3).
    ///
    /// A failure on any page fails the whole collection.
    pub fn collect(
        &self,
        query: &str,
        pages: u32,
        delay: Duration,
        cancel: &Cancellation,
    ) -> std::result::Result<Vec<Listing>, FetchError> {
        let pages = config::clamp_pages(pages);
        let mut all = Vec::new();

        for page in 1..=pages {
            let url = build_sold_search_url(&self.search_url, query, page)?;
            let html = self.fetcher.fetch(&url, cancel)?;
            let listings = parse_sold_results(&html);
            info!("page {}/{} for {:?}: {} listings", page, pages, query, listings.len());
            all.extend(listings);

            if page != pages {
                self.pacer.pause(delay, cancel)?;
            }
        }

        let unique = dedupe_by_url(all);
        info!("collected {} unique listings for {:?}", unique.len(), query);
        Ok(unique)
    }
}
