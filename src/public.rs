//! Public presenter: turn an internal summary into the consumer-facing score.
//!
//! The raw confidence never leaves this module unquantized; callers see an
//! accuracy percentage in steps of 10 and a short label.

use crate::config;
use crate::models::{AccuracyLabel, DealAssessment, OverrideProfile, PriceSummary, PublicEstimate};
use crate::pricing::{clamp, round_to};

/// Lowest accuracy shown once there is any sample.
const MIN_SAMPLED_ACCURACY: u8 = 10;

/// Round a percentage to the nearest multiple of 10 within `[0, 100]`.
///
/// Exact halves go to the even multiple: 65 -> 60, 75 -> 80.
pub fn quantize_to_10(pct: f64) -> u8 {
    if !pct.is_finite() {
        return 0;
    }
    clamp((pct / 10.0).round_ties_even() * 10.0, 0.0, 100.0) as u8
}

/// Accuracy percentage shown for a confidence in `[0, 1]`.
///
/// Zero only when there is no sample at all; any sample shows at least 10.
pub fn accuracy_pct_from_confidence(confidence: f64, n: usize) -> u8 {
    if n == 0 {
        return 0;
    }
    let raw = clamp(confidence, 0.0, 1.0) * 100.0;
    quantize_to_10(raw).max(MIN_SAMPLED_ACCURACY)
}

// ---------------------------------------------------------------------------
// DealBands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DealBand {
    /// Inclusive lower bound on `delta_pct`.
    pub min_delta_pct: f64,
    pub score: u8,
    pub label: String,
}

/// Threshold table mapping `delta_pct` to a 1-5 deal score.
///
/// Bands are checked in descending order of `min_delta_pct`; anything below
/// the last band gets `floor_score`/`floor_label`.
#[derive(Debug, Clone, PartialEq)]
pub struct DealBands {
    bands: Vec<DealBand>,
    floor_score: u8,
    floor_label: String,
}

impl DealBands {
    pub fn new(mut bands: Vec<DealBand>, floor_score: u8, floor_label: impl Into<String>) -> Self {
        bands.sort_by(|a, b| b.min_delta_pct.total_cmp(&a.min_delta_pct));
        Self {
            bands,
            floor_score,
            floor_label: floor_label.into(),
        }
    }

    pub fn classify(&self, delta_pct: f64) -> (u8, &str) {
        self.bands
            .iter()
            .find(|b| delta_pct >= b.min_delta_pct)
            .map(|b| (b.score, b.label.as_str()))
            .unwrap_or((self.floor_score, self.floor_label.as_str()))
    }
}

impl Default for DealBands {
    fn default() -> Self {
        let band = |min_delta_pct: f64, score: u8, label: &str| DealBand {
            min_delta_pct,
            score,
            label: label.to_string(),
        };
        Self::new(
            vec![
                band(25.0, 5, "Great"),
                band(15.0, 4, "Good"),
                band(-10.0, 3, "Fair"),
                band(-25.0, 2, "Bad"),
            ],
            1,
            "Terrible",
        )
    }
}

/// Score an asking price against the CASP. `None` unless both are positive.
pub fn deal_score(casp: f64, asking: f64, bands: &DealBands) -> Option<DealAssessment> {
    if casp <= 0.0 || asking <= 0.0 {
        return None;
    }

    let delta = casp - asking;
    let delta_pct = delta / casp * 100.0;
    let (score, label) = bands.classify(delta_pct);

    Some(DealAssessment {
        deal_score: score,
        deal_label: label.to_string(),
        delta: round_to(delta, 2),
        delta_pct: round_to(delta_pct, 1),
        asking: round_to(asking, 2),
    })
}

/// CASP: the median, or the trimmed mean when the median is missing.
pub fn casp_from_summary(summary: &PriceSummary) -> Option<f64> {
    summary.median.or(summary.trimmed_mean)
}

/// Build the public estimate for `summary`.
///
/// A matching override profile replaces the CASP and/or accuracy. The deal
/// is scored against the final CASP so the two always agree. With a sample,
/// accuracy never drops below 10, even under an override.
pub fn build_public(
    summary: &PriceSummary,
    asking: Option<f64>,
    profile: Option<&OverrideProfile>,
    bands: &DealBands,
) -> PublicEstimate {
    let mut casp = casp_from_summary(summary);
    let mut accuracy_pct = accuracy_pct_from_confidence(summary.confidence, summary.n);
    let mut profile_note = None;

    if let Some(profile) = profile {
        if let Some(override_casp) = profile.casp {
            casp = Some(override_casp);
        }
        if let Some(override_pct) = profile.accuracy_pct {
            accuracy_pct = override_pct;
        }
        profile_note = profile.note.clone();
    }
    if summary.n > 0 {
        accuracy_pct = accuracy_pct.max(MIN_SAMPLED_ACCURACY);
    }

    let deal = match (casp, asking) {
        (Some(c), Some(a)) => deal_score(c, a, bands),
        _ => None,
    };

    PublicEstimate {
        casp: casp.map(|c| round_to(c, 2)),
        casp_label: config::CASP_LABEL.to_string(),
        accuracy_pct,
        accuracy_label: AccuracyLabel::from_pct(accuracy_pct),
        deal,
        profile_note,
    }
}
