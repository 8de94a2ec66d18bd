/// Failure of the live retrieval path for one search page.
///
/// Produced by the fetcher and propagated unchanged through the collector;
/// only the estimator decides what to fall back to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("eBay request error: {message} for {url}")]
    Transport { url: String, message: String },

    #[error("eBay request failed: {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("eBay request failed after retries: {} for {url}", fmt_status(.last_status))]
    Exhausted {
        url: String,
        last_status: Option<u16>,
    },

    #[error("eBay request cancelled before completion")]
    Cancelled,
}

impl FetchError {
    /// Stable machine-readable cause, suitable for logs and API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport { .. } => "transport",
            FetchError::HttpStatus { .. } => "http_status",
            FetchError::Exhausted { .. } => "exhausted",
            FetchError::Cancelled => "cancelled",
        }
    }

    /// The last HTTP status observed, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::HttpStatus { status, .. } => Some(*status),
            FetchError::Exhausted { last_status, .. } => *last_status,
            _ => None,
        }
    }
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "no response".to_string(), |s| s.to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum GraphiteError {
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, GraphiteError>;
