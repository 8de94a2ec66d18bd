use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Listing, PriceSummary};
use crate::config;
use crate::error::{GraphiteError, Result};

// ---------------------------------------------------------------------------
// AccuracyLabel
// ---------------------------------------------------------------------------

/// User-facing band for a quantized accuracy percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccuracyLabel {
    #[serde(rename = "Very Low")]
    VeryLow,
    #[serde(rename = "Low")]
    Low,
    #[serde(rename = "Medium")]
    Medium,
    #[serde(rename = "High")]
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl AccuracyLabel {
    pub fn from_pct(pct: u8) -> Self {
        match pct {
            80..=u8::MAX => AccuracyLabel::VeryHigh,
            60..=79 => AccuracyLabel::High,
            40..=59 => AccuracyLabel::Medium,
            20..=39 => AccuracyLabel::Low,
            _ => AccuracyLabel::VeryLow,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccuracyLabel::VeryLow => "Very Low",
            AccuracyLabel::Low => "Low",
            AccuracyLabel::Medium => "Medium",
            AccuracyLabel::High => "High",
            AccuracyLabel::VeryHigh => "Very High",
        }
    }
}

impl fmt::Display for AccuracyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DealAssessment / PublicEstimate
// ---------------------------------------------------------------------------

/// How an asking price compares to the CASP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealAssessment {
    pub deal_score: u8,
    pub deal_label: String,
    pub delta: f64,
    pub delta_pct: f64,
    pub asking: f64,
}

/// The simplified, consumer-facing view of a price summary.
///
/// Deal fields are flattened into the object and are either all present or
/// all absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicEstimate {
    pub casp: Option<f64>,
    pub casp_label: String,
    pub accuracy_pct: u8,
    pub accuracy_label: AccuracyLabel,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub deal: Option<DealAssessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_note: Option<String>,
}

impl PublicEstimate {
    /// An estimate with no price and zero accuracy.
    pub fn unavailable() -> Self {
        Self {
            casp: None,
            casp_label: config::CASP_LABEL.to_string(),
            accuracy_pct: 0,
            accuracy_label: AccuracyLabel::VeryLow,
            deal: None,
            profile_note: None,
        }
    }
}

// ---------------------------------------------------------------------------
// EstimateRequest
// ---------------------------------------------------------------------------

/// Inputs accepted at the request boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateRequest {
    pub query: String,
    pub pages: u32,
    pub include_shipping: bool,
    /// Allow reading and writing the result cache.
    pub use_cache: bool,
    /// Serve a cached record, if one exists, without going live.
    pub cache_first: bool,
    pub asking: Option<f64>,
}

impl EstimateRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            pages: config::MIN_PAGES,
            include_shipping: false,
            use_cache: true,
            cache_first: false,
            asking: None,
        }
    }

    pub fn pages(mut self, pages: u32) -> Self {
        self.pages = pages;
        self
    }

    pub fn include_shipping(mut self, include: bool) -> Self {
        self.include_shipping = include;
        self
    }

    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn cache_first(mut self, cache_first: bool) -> Self {
        self.cache_first = cache_first;
        self
    }

    pub fn asking(mut self, asking: f64) -> Self {
        self.asking = Some(asking);
        self
    }

    /// Check the request and return a normalized copy.
    ///
    /// The query is trimmed and must be non-empty, pages are clamped to the
    /// supported range, and an asking price must be a positive finite number.
    pub fn validate(&self) -> Result<EstimateRequest> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(GraphiteError::Validation("query must not be empty".into()));
        }
        if let Some(asking) = self.asking {
            if !asking.is_finite() || asking <= 0.0 {
                return Err(GraphiteError::Validation(format!(
                    "asking price must be a positive number, got {}",
                    asking
                )));
            }
        }
        Ok(EstimateRequest {
            query: query.to_string(),
            pages: config::clamp_pages(self.pages),
            ..self.clone()
        })
    }
}

// ---------------------------------------------------------------------------
// EstimateSource / EstimateResponse
// ---------------------------------------------------------------------------

/// Which tier of the fallback ladder produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateSource {
    Live,
    CacheRequested,
    CacheFallback,
    ProfileFallback,
    Unavailable,
}

impl EstimateSource {
    pub fn describe(&self) -> &'static str {
        match self {
            EstimateSource::Live => "live",
            EstimateSource::CacheRequested => "served from cache, by request",
            EstimateSource::CacheFallback => "live fetch failed, served cache",
            EstimateSource::ProfileFallback => "no live comps, served profile fallback",
            EstimateSource::Unavailable => "not available",
        }
    }
}

impl fmt::Display for EstimateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// The orchestrator's answer for one request.
///
/// `ok == false` only for [`EstimateSource::Unavailable`]; the caller maps it
/// to a service-unavailable response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateResponse {
    pub ok: bool,
    pub query: String,
    pub source: EstimateSource,
    pub note: String,
    pub n: usize,
    pub summary: Option<PriceSummary>,
    pub public: PublicEstimate,
    pub sample: Vec<Listing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<String>,
    /// Why the live path failed, when it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}
