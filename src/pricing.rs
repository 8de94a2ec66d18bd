//! Statistics engine: reduce a noisy price sample to a robust summary.

use crate::models::{Listing, PriceSummary};

const TRIM_FRACTION: f64 = 0.1;
/// Below this many prices the trimmed mean is the plain mean.
const MIN_TRIM_SAMPLE: usize = 5;

const SIZE_WEIGHT: f64 = 0.65;
const SPREAD_WEIGHT: f64 = 0.35;
/// Sample size at which the size score reaches one half.
const SIZE_HALF_POINT: f64 = 8.0;

pub(crate) fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    x.max(lo).min(hi)
}

/// Round to `decimals` places, ties to even.
pub(crate) fn round_to(x: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (x * factor).round_ties_even() / factor
}

fn mean(sorted: &[f64]) -> f64 {
    sorted.iter().sum::<f64>() / sorted.len() as f64
}

/// Median of a sorted, non-empty slice.
pub fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    let mid = n / 2;
    if n % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Linear-interpolation percentile of a sorted, non-empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if p <= 0.0 {
        return sorted[0];
    }
    if p >= 100.0 {
        return sorted[n - 1];
    }

    let k = (n - 1) as f64 * (p / 100.0);
    let f = k.floor() as usize;
    let c = (f + 1).min(n - 1);
    if f == c {
        return sorted[f];
    }
    sorted[f] * (c as f64 - k) + sorted[c] * (k - f as f64)
}

/// Mean after dropping `floor(trim_frac * n)` values from each tail.
pub fn trimmed_mean(sorted: &[f64], trim_frac: f64) -> f64 {
    let n = sorted.len();
    let k = (n as f64 * trim_frac).floor() as usize;
    if n > 2 * k {
        mean(&sorted[k..n - k])
    } else {
        mean(sorted)
    }
}

/// Blend of sample size and relative interquartile spread, in `[0, 1]`.
pub fn confidence(n: usize, median: f64, p25: f64, p75: f64) -> f64 {
    let size_score = 1.0 - 1.0 / (1.0 + n as f64 / SIZE_HALF_POINT);

    let iqr = (p75 - p25).max(0.0);
    let rel_spread = if median > 0.0 { iqr / median } else { 1.0 };
    let spread_score = 1.0 - clamp(rel_spread, 0.0, 1.0);

    clamp(SIZE_WEIGHT * size_score + SPREAD_WEIGHT * spread_score, 0.0, 1.0)
}

/// Summarize raw prices. Non-finite and non-positive values are discarded.
pub fn summarize_prices(prices: &[f64]) -> PriceSummary {
    let mut clean: Vec<f64> = prices
        .iter()
        .copied()
        .filter(|p| p.is_finite() && *p > 0.0)
        .collect();

    let n = clean.len();
    if n == 0 {
        return PriceSummary::empty();
    }
    clean.sort_by(|a, b| a.total_cmp(b));

    let med = median(&clean);
    let p25 = percentile(&clean, 25.0);
    let p75 = percentile(&clean, 75.0);
    let tmean = if n >= MIN_TRIM_SAMPLE {
        trimmed_mean(&clean, TRIM_FRACTION)
    } else {
        mean(&clean)
    };

    PriceSummary {
        n,
        median: Some(round_to(med, 2)),
        trimmed_mean: Some(round_to(tmean, 2)),
        p25: Some(round_to(p25, 2)),
        p75: Some(round_to(p75, 2)),
        min_price: Some(round_to(clean[0], 2)),
        max_price: Some(round_to(clean[n - 1], 2)),
        confidence: round_to(confidence(n, med, p25, p75), 3),
    }
}

/// Prices usable for estimation; listings without a price are skipped.
pub fn comps_to_prices(listings: &[Listing], include_shipping: bool) -> Vec<f64> {
    listings
        .iter()
        .filter_map(|l| l.total(include_shipping))
        .collect()
}
