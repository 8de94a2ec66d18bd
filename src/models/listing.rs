use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// Currency inferred from the marker printed next to a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Cad,
    Aud,
    Gbp,
    Eur,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Cad => "CAD",
            Currency::Aud => "AUD",
            Currency::Gbp => "GBP",
            Currency::Eur => "EUR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// Listing — one sold listing (a "comp")
// ---------------------------------------------------------------------------

/// One sold listing extracted from a search results page.
///
/// Identity is `url`; the collector deduplicates on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub title: String,
    pub price: Option<f64>,
    pub currency: Option<Currency>,
    pub shipping: Option<f64>,
    pub shipping_currency: Option<Currency>,
    pub url: String,
    pub ended: Option<String>,
}

impl Listing {
    /// Price plus shipping when both are known, else the bare price.
    pub fn total(&self, include_shipping: bool) -> Option<f64> {
        let price = self.price?;
        match (include_shipping, self.shipping) {
            (true, Some(shipping)) => Some(price + shipping),
            _ => Some(price),
        }
    }
}
