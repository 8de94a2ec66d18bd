use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// OverrideProfile — curated per-model override
// ---------------------------------------------------------------------------

/// A manually curated override for one product key.
///
/// Fields are validated when the profile file is loaded: `casp` is a positive
/// finite number and `accuracy_pct` is already quantized to a multiple of 10.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideProfile {
    pub key: String,
    pub casp: Option<f64>,
    pub accuracy_pct: Option<u8>,
    pub note: Option<String>,
}

impl OverrideProfile {
    /// Whether the profile can stand in for live data on its own.
    pub fn has_estimate(&self) -> bool {
        self.casp.is_some() || self.accuracy_pct.is_some()
    }
}
