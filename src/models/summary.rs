use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PriceSummary — robust statistics over one price sample
// ---------------------------------------------------------------------------

/// Robust summary of a price sample.
///
/// Every statistic is `None` and `confidence` is `0.0` exactly when `n == 0`.
/// Otherwise `min_price <= p25 <= median <= p75 <= max_price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSummary {
    pub n: usize,
    pub median: Option<f64>,
    pub trimmed_mean: Option<f64>,
    pub p25: Option<f64>,
    pub p75: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub confidence: f64,
}

impl PriceSummary {
    pub fn empty() -> Self {
        Self {
            n: 0,
            median: None,
            trimmed_mean: None,
            p25: None,
            p75: None,
            min_price: None,
            max_price: None,
            confidence: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }
}

impl Default for PriceSummary {
    fn default() -> Self {
        Self::empty()
    }
}
