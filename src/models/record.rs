use serde::{Deserialize, Serialize};

use super::{Listing, PriceSummary, PublicEstimate};

// ---------------------------------------------------------------------------
// CacheRecord — on-disk shape of one cached estimation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachePayload {
    pub n: usize,
    pub summary: PriceSummary,
    pub public: PublicEstimate,
    /// A handful of listings for display, never the full sample.
    pub sample: Vec<Listing>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub query: String,
    /// RFC 3339 timestamp in UTC.
    pub cached_at: String,
    pub payload: CachePayload,
}

impl CacheRecord {
    /// Age of the record relative to `now`, if the timestamp parses.
    pub fn age(&self, now: chrono::DateTime<chrono::Utc>) -> Option<chrono::Duration> {
        chrono::DateTime::parse_from_rfc3339(&self.cached_at)
            .ok()
            .map(|at| now.signed_duration_since(at.with_timezone(&chrono::Utc)))
    }
}
