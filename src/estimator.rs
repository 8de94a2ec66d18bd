//! Estimation orchestrator: the fallback ladder from live comps to cache,
//! then override profile, then an explicit "not available" answer.
//!
//! ```text
//! CACHE_FIRST_CHECK -> LIVE_FETCH -> SUCCESS
//!                                 -> LIVE_FAILED -> CACHE_FALLBACK -> SUCCESS
//!                                                                 -> PROFILE_FALLBACK -> SUCCESS
//!                                                                                     -> TERMINAL_FAILURE
//! ```
//!
//! Only this module decides on fallbacks. Lower layers report failures as
//! they happened and never substitute defaults.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::{CacheManager, CacheStore};
use crate::collector::Collector;
use crate::config::{self, EstimatorConfig};
use crate::error::{FetchError, Result};
use crate::fetch::{Cancellation, Fetcher, Pacer, ReqwestTransport, ThreadPacer, Transport};
use crate::models::{
    CachePayload, CacheRecord, EstimateRequest, EstimateResponse, EstimateSource, Listing,
    OverrideProfile, PriceSummary, PublicEstimate,
};
use crate::pricing::{comps_to_prices, summarize_prices};
use crate::profiles::{ProfileBook, ProfileSource};
use crate::public::{build_public, DealBands};
use crate::store::{DuckDbStore, PersistentStore};

// ---------------------------------------------------------------------------
// EstimatorBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing an [`Estimator`].
///
/// Every collaborator can be supplied directly; anything left unset is
/// built from the [`EstimatorConfig`].
pub struct EstimatorBuilder {
    config: EstimatorConfig,
    transport: Option<Box<dyn Transport>>,
    pacer: Option<Arc<dyn Pacer>>,
    cache: Option<Box<dyn CacheStore>>,
    store: Option<Box<dyn PersistentStore>>,
    profiles: Option<Box<dyn ProfileSource>>,
    bands: DealBands,
}

impl Default for EstimatorBuilder {
    fn default() -> Self {
        Self {
            config: EstimatorConfig::default(),
            transport: None,
            pacer: None,
            cache: None,
            store: None,
            profiles: None,
            bands: DealBands::default(),
        }
    }
}

impl EstimatorBuilder {
    /// Replace the whole configuration.
    pub fn config(mut self, config: EstimatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the directory for cached results.
    ///
    /// If not set, the platform cache directory is used (e.g.
    /// `~/.cache/graphite` on Linux).
    pub fn cache_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.cache_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Turn the result cache off entirely.
    pub fn disable_cache(mut self) -> Self {
        self.config.cache_disabled = true;
        self
    }

    /// Ignore cache records older than `age` when serving cache-first.
    pub fn cache_max_age(mut self, age: Duration) -> Self {
        self.config.cache_max_age = Some(age);
        self
    }

    /// Persist comps and estimates to a DuckDB file.
    pub fn db_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.db_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load override profiles from a JSON file.
    pub fn profiles_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.profiles_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn search_url(mut self, url: impl Into<String>) -> Self {
        self.config.search_url = url.into();
        self
    }

    /// Per-request HTTP timeout. Defaults to 8 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Attempts per page, including the first. Defaults to 2.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Pause between result pages. Defaults to 1 second.
    pub fn page_delay(mut self, delay: Duration) -> Self {
        self.config.page_delay = delay;
        self
    }

    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    pub fn pacer(mut self, pacer: impl Pacer + 'static) -> Self {
        self.pacer = Some(Arc::new(pacer));
        self
    }

    pub fn cache_store(mut self, cache: impl CacheStore + 'static) -> Self {
        self.cache = Some(Box::new(cache));
        self
    }

    pub fn persistent_store(mut self, store: impl PersistentStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn profiles(mut self, profiles: impl ProfileSource + 'static) -> Self {
        self.profiles = Some(Box::new(profiles));
        self
    }

    pub fn deal_bands(mut self, bands: DealBands) -> Self {
        self.bands = bands;
        self
    }

    /// Build the estimator, opening the cache directory, database and
    /// profile file as configured.
    pub fn build(self) -> Result<Estimator> {
        let config = self.config;

        let transport: Box<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Box::new(ReqwestTransport::new()),
        };
        let pacer: Arc<dyn Pacer> = match self.pacer {
            Some(p) => p,
            None => Arc::new(ThreadPacer::default()),
        };
        let fetcher = Fetcher::new(transport, pacer.clone(), config.timeout, config.max_retries);
        let collector = Collector::new(fetcher, pacer, config.search_url.clone());

        let cache = if config.cache_disabled {
            None
        } else {
            match self.cache {
                Some(c) => Some(c),
                None => Some(Box::new(CacheManager::new(config.cache_dir.clone())?) as Box<dyn CacheStore>),
            }
        };

        let store = match (self.store, &config.db_path) {
            (Some(s), _) => Some(s),
            (None, Some(path)) => Some(Box::new(DuckDbStore::open(path)?) as Box<dyn PersistentStore>),
            (None, None) => None,
        };

        let profiles: Box<dyn ProfileSource> = match (self.profiles, &config.profiles_path) {
            (Some(p), _) => p,
            (None, Some(path)) => Box::new(ProfileBook::load(path)?),
            (None, None) => Box::new(ProfileBook::default()),
        };

        Ok(Estimator {
            collector,
            cache,
            store,
            profiles,
            bands: self.bands,
            page_delay: config.page_delay,
            cache_max_age: config.cache_max_age,
        })
    }
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

/// Top-level estimation entry point.
///
/// Created via [`Estimator::builder()`]. Safe to share across threads; each
/// call to [`estimate`](Self::estimate) runs its request sequentially.
pub struct Estimator {
    collector: Collector,
    cache: Option<Box<dyn CacheStore>>,
    store: Option<Box<dyn PersistentStore>>,
    profiles: Box<dyn ProfileSource>,
    bands: DealBands,
    page_delay: Duration,
    cache_max_age: Option<Duration>,
}

impl Estimator {
    pub fn builder() -> EstimatorBuilder {
        EstimatorBuilder::default()
    }

    /// Estimate without a caller deadline.
    pub fn estimate(&self, request: &EstimateRequest) -> Result<EstimateResponse> {
        self.estimate_with(request, &Cancellation::new())
    }

    /// Run the full fallback ladder for `request`.
    ///
    /// Returns `Err` only for invalid input. Every data-source failure is
    /// folded into the response: a fallback tier, or `ok == false`.
    pub fn estimate_with(
        &self,
        request: &EstimateRequest,
        cancel: &Cancellation,
    ) -> Result<EstimateResponse> {
        let req = request.validate()?;
        let profile = self.profiles.match_query(&req.query);
        let cache = if req.use_cache { self.cache.as_deref() } else { None };

        if req.cache_first {
            if let Some(record) = cache.and_then(|c| self.read_cache(c, &req.query)) {
                if self.is_fresh(&record) {
                    info!("serving {:?} from cache by request", req.query);
                    return Ok(self.from_cache(record, &req, profile.as_ref(), EstimateSource::CacheRequested, None));
                }
                debug!("cached record for {:?} is stale; going live", req.query);
            }
        }

        match self.collector.collect(&req.query, req.pages, self.page_delay, cancel) {
            Ok(listings) => Ok(self.from_live(&req, listings, profile.as_ref(), cache)),
            Err(err) => Ok(self.fallback(&req, cache, profile, err)),
        }
    }

    fn read_cache(&self, cache: &dyn CacheStore, query: &str) -> Option<CacheRecord> {
        match cache.read(query) {
            Ok(record) => record,
            Err(e) => {
                warn!("cache read failed for {:?}: {}", query, e);
                None
            }
        }
    }

    fn is_fresh(&self, record: &CacheRecord) -> bool {
        let Some(max_age) = self.cache_max_age else {
            return true;
        };
        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return true;
        };
        record
            .age(chrono::Utc::now())
            .is_some_and(|age| age <= max_age)
    }

    fn present(&self, summary: &PriceSummary, asking: Option<f64>, profile: Option<&OverrideProfile>) -> PublicEstimate {
        build_public(summary, asking, profile, &self.bands)
    }

    fn from_live(
        &self,
        req: &EstimateRequest,
        listings: Vec<Listing>,
        profile: Option<&OverrideProfile>,
        cache: Option<&dyn CacheStore>,
    ) -> EstimateResponse {
        let prices = comps_to_prices(&listings, req.include_shipping);
        let summary = summarize_prices(&prices);
        let public = self.present(&summary, req.asking, profile);
        let sample: Vec<Listing> = listings.iter().take(config::SAMPLE_SIZE).cloned().collect();

        info!(
            "live estimate for {:?}: n={} casp={:?} accuracy={}%",
            req.query, summary.n, public.casp, public.accuracy_pct
        );

        // An empty page (often a bot challenge) must not replace a good record.
        if let Some(cache) = cache.filter(|_| !summary.is_empty()) {
            let payload = CachePayload {
                n: summary.n,
                summary: summary.clone(),
                public: public.clone(),
                sample: sample.clone(),
            };
            if let Err(e) = cache.write(&req.query, &payload) {
                warn!("cache write failed for {:?}: {}", req.query, e);
            }
        }

        if let Some(store) = &self.store {
            if let Err(e) = store.insert_comps(&req.query, &listings) {
                warn!("storing comps failed for {:?}: {}", req.query, e);
            }
            if let Err(e) = store.insert_estimate(&req.query, &public, &summary) {
                warn!("storing estimate failed for {:?}: {}", req.query, e);
            }
        }

        EstimateResponse {
            ok: true,
            query: req.query.clone(),
            source: EstimateSource::Live,
            note: EstimateSource::Live.describe().to_string(),
            n: summary.n,
            summary: Some(summary),
            public,
            sample,
            cached_at: None,
            reason: None,
            guidance: None,
        }
    }

    fn from_cache(
        &self,
        record: CacheRecord,
        req: &EstimateRequest,
        profile: Option<&OverrideProfile>,
        source: EstimateSource,
        reason: Option<String>,
    ) -> EstimateResponse {
        let payload = record.payload;
        let public = self.present(&payload.summary, req.asking, profile);
        EstimateResponse {
            ok: true,
            query: req.query.clone(),
            source,
            note: source.describe().to_string(),
            n: payload.n,
            summary: Some(payload.summary),
            public,
            sample: payload.sample,
            cached_at: Some(record.cached_at),
            reason,
            guidance: None,
        }
    }

    fn fallback(
        &self,
        req: &EstimateRequest,
        cache: Option<&dyn CacheStore>,
        profile: Option<OverrideProfile>,
        err: FetchError,
    ) -> EstimateResponse {
        warn!("live fetch failed for {:?} ({}): {}", req.query, err.kind(), err);
        let reason = err.to_string();

        if let Some(record) = cache.and_then(|c| self.read_cache(c, &req.query)) {
            info!("serving cached record for {:?} after live failure", req.query);
            return self.from_cache(record, req, profile.as_ref(), EstimateSource::CacheFallback, Some(reason));
        }

        if let Some(profile) = profile.filter(OverrideProfile::has_estimate) {
            info!("serving profile {:?} for {:?} after live failure", profile.key, req.query);
            let public = self.present(&PriceSummary::empty(), req.asking, Some(&profile));
            return EstimateResponse {
                ok: true,
                query: req.query.clone(),
                source: EstimateSource::ProfileFallback,
                note: EstimateSource::ProfileFallback.describe().to_string(),
                n: 0,
                summary: None,
                public,
                sample: Vec::new(),
                cached_at: None,
                reason: Some(reason),
                guidance: None,
            };
        }

        EstimateResponse {
            ok: false,
            query: req.query.clone(),
            source: EstimateSource::Unavailable,
            note: EstimateSource::Unavailable.describe().to_string(),
            n: 0,
            summary: None,
            public: PublicEstimate::unavailable(),
            sample: Vec::new(),
            cached_at: None,
            reason: Some(reason),
            guidance: Some(guidance(req.pages)),
        }
    }
}

fn guidance(pages: u32) -> String {
    if pages > config::MIN_PAGES {
        format!(
            "eBay is not returning results right now (likely rate limiting). \
             Try again in a few minutes, or retry with pages=1 instead of {}.",
            pages
        )
    } else {
        "eBay is not returning results right now (likely rate limiting). \
         Try again in a few minutes."
            .to_string()
    }
}
