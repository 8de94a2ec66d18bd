//! Price and shipping text parsing.
//!
//! Listing pages print prices as free text (`"US $1,234.50"`, `"£20.00"`,
//! `"Free delivery"`). These helpers pull out the first number and infer the
//! currency from the marker next to it. Nothing here fails: text without a
//! number yields an absent amount.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::Currency;

fn amount_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d[\d,]*\.?\d*").expect("amount pattern is valid"))
}

/// Infer the currency from the markers in `text`.
///
/// Region-prefixed dollar markers win over the bare `$`.
pub fn detect_currency(text: &str) -> Option<Currency> {
    if text.contains("C $") {
        Some(Currency::Cad)
    } else if text.contains("US $") {
        Some(Currency::Usd)
    } else if text.contains("AU $") {
        Some(Currency::Aud)
    } else if text.contains('£') || text.contains("GBP") {
        Some(Currency::Gbp)
    } else if text.contains('€') || text.contains("EUR") {
        Some(Currency::Eur)
    } else if text.contains('$') {
        Some(Currency::Usd)
    } else {
        None
    }
}

/// Extract the first amount in `text`, ignoring thousands separators.
pub fn parse_amount(text: &str) -> Option<f64> {
    let m = amount_pattern().find(text)?;
    m.as_str().replace(',', "").parse::<f64>().ok()
}

/// Parse a price string into `(amount, currency)`.
pub fn parse_money(text: &str) -> (Option<f64>, Option<Currency>) {
    let t = text.trim();
    if t.is_empty() {
        return (None, None);
    }
    (parse_amount(t), detect_currency(t))
}

/// Parse a shipping string. Any "free" marker means zero cost.
pub fn parse_shipping(text: &str) -> (Option<f64>, Option<Currency>) {
    let t = text.trim();
    if t.is_empty() {
        return (None, None);
    }
    if t.to_lowercase().contains("free") {
        return (Some(0.0), None);
    }
    parse_money(t)
}
