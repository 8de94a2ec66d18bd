//! Curated override profiles, loaded from a JSON file.
//!
//! The file maps a product key to optional overrides:
//!
//! ```json
//! {
//!   "Carhartt J01": { "casp": 85.0, "accuracy_pct": 73, "note": "hand-checked" }
//! }
//! ```
//!
//! Entries are validated once at load time. Values that cannot be coerced are
//! dropped (with a warning) rather than failing later on access.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{GraphiteError, Result};
use crate::models::OverrideProfile;
use crate::public::quantize_to_10;

/// Source of override profiles for the estimator.
pub trait ProfileSource: Send + Sync {
    fn match_query(&self, query: &str) -> Option<OverrideProfile>;
}

/// In-memory set of validated profiles keyed by lowercase key.
#[derive(Debug, Clone, Default)]
pub struct ProfileBook {
    profiles: BTreeMap<String, OverrideProfile>,
}

impl ProfileBook {
    pub fn new(profiles: impl IntoIterator<Item = OverrideProfile>) -> Self {
        let profiles = profiles
            .into_iter()
            .filter(|p| !p.key.trim().is_empty())
            .map(|p| (p.key.trim().to_lowercase(), p))
            .collect();
        Self { profiles }
    }

    /// Load profiles from `path`. A missing file yields an empty book.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("no profile file at {}; continuing without profiles", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let raw: Value = serde_json::from_str(&contents)?;
        Self::from_value(&raw)
    }

    /// Build a book from already-parsed JSON.
    pub fn from_value(raw: &Value) -> Result<Self> {
        let entries = match raw {
            Value::Object(map) => map,
            Value::Null => return Ok(Self::default()),
            other => {
                return Err(GraphiteError::InvalidArgument(format!(
                    "profile file must contain a JSON object, found {}",
                    json_type(other)
                )))
            }
        };

        let mut profiles = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            match parse_entry(key, value) {
                Some(profile) => profiles.push(profile),
                None => warn!("skipping malformed profile entry {:?}", key),
            }
        }
        Ok(Self::new(profiles))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&OverrideProfile> {
        self.profiles.get(&key.trim().to_lowercase())
    }

    /// Exact case-insensitive match first, then the longest key contained
    /// in the query (alphabetical among equal lengths).
    pub fn find(&self, query: &str) -> Option<&OverrideProfile> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return None;
        }
        if let Some(profile) = self.profiles.get(&q) {
            return Some(profile);
        }
        self.profiles
            .iter()
            .filter(|(key, _)| q.contains(key.as_str()))
            .fold(None, |best: Option<(&String, &OverrideProfile)>, (key, profile)| match best {
                Some((best_key, _)) if best_key.len() >= key.len() => best,
                _ => Some((key, profile)),
            })
            .map(|(_, profile)| profile)
    }
}

impl ProfileSource for ProfileBook {
    fn match_query(&self, query: &str) -> Option<OverrideProfile> {
        self.find(query).cloned()
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse_entry(key: &str, value: &Value) -> Option<OverrideProfile> {
    let key = key.trim();
    let fields = value.as_object()?;
    if key.is_empty() {
        return None;
    }

    let casp = fields.get("casp").and_then(coerce_number).filter(|c| {
        let ok = c.is_finite() && *c > 0.0;
        if !ok {
            warn!("profile {:?}: ignoring non-positive casp {}", key, c);
        }
        ok
    });

    let accuracy_pct = fields
        .get("accuracy_pct")
        .and_then(coerce_number)
        .map(|pct| quantize_to_10(pct.trunc()));

    let note = match fields.get("note") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };

    Some(OverrideProfile {
        key: key.to_string(),
        casp,
        accuracy_pct,
        note,
    })
}

/// Numbers, or strings holding a number. Anything else is treated as absent.
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
