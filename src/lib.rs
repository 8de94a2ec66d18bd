//! Graphite: fair market price estimates from eBay sold listings.
//!
//! Samples recently sold listings for a product query, reduces the prices to
//! robust statistics, and presents them as a calculated average sold price
//! (CASP), an accuracy band, and an optional deal score for an asking price.
//! When the live source is unavailable the estimator falls back to the last
//! cached result, then to a curated override profile, and otherwise says
//! plainly that no estimate is available.
//!
//! # Quick start
//!
//! ```no_run
//! use graphite::{EstimateRequest, Estimator};
//!
//! let estimator = Estimator::builder()
//!     .cache_dir("./cache")
//!     .profiles_path("./models.json")
//!     .build()
//!     .unwrap();
//!
//! let resp = estimator
//!     .estimate(&EstimateRequest::new("Carhartt J01").pages(2).asking(60.0))
//!     .unwrap();
//! println!("{} -> {:?} ({})", resp.query, resp.public.casp, resp.note);
//! ```

#[cfg(feature = "async")]
pub mod async_client;
pub mod cache;
pub mod collector;
pub mod config;
pub mod error;
pub mod estimator;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod money;
pub mod pricing;
pub mod profiles;
pub mod public;
pub mod store;

#[cfg(feature = "async")]
pub use async_client::AsyncEstimator;
pub use cache::{CacheManager, CacheStore};
pub use collector::Collector;
pub use config::EstimatorConfig;
pub use error::{FetchError, GraphiteError, Result};
pub use estimator::{Estimator, EstimatorBuilder};
pub use fetch::{Cancellation, Fetcher, Pacer, RawResponse, ReqwestTransport, ThreadPacer, Transport, TransportError};
pub use models::*;
pub use profiles::{ProfileBook, ProfileSource};
pub use public::DealBands;
pub use store::{DuckDbStore, PersistentStore};
