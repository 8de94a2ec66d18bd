//! Network round-trip for one search page, with bounded retry and backoff.
//!
//! The upstream rate-limits automated clients, so only transient statuses
//! (see [`config::RETRYABLE_STATUSES`]) are retried; every other non-200
//! status ends the attempt immediately.

use reqwest::blocking::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config;
use crate::error::{FetchError, GraphiteError, Result};

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Caller-side cancellation: an explicit flag plus an optional deadline.
///
/// Clones share the flag, so cancelling any clone cancels them all.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Time left before the deadline, if one is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn check(&self) -> std::result::Result<(), FetchError> {
        if self.is_cancelled() {
            Err(FetchError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Cap `timeout` to whatever remains before the deadline.
    pub fn bound(&self, timeout: Duration) -> Duration {
        match self.remaining() {
            Some(left) => timeout.min(left),
            None => timeout,
        }
    }
}

// ---------------------------------------------------------------------------
// Pacer — cancellable sleeping
// ---------------------------------------------------------------------------

/// Sleeps used for backoff and inter-page pacing.
pub trait Pacer: Send + Sync {
    /// Wait for `duration`, returning early with `Cancelled` if the token fires.
    fn pause(&self, duration: Duration, cancel: &Cancellation) -> std::result::Result<(), FetchError>;
}

/// Real sleeping in short slices so cancellation is noticed promptly.
#[derive(Debug, Clone, Copy)]
pub struct ThreadPacer {
    slice: Duration,
}

impl Default for ThreadPacer {
    fn default() -> Self {
        Self {
            slice: Duration::from_millis(50),
        }
    }
}

impl Pacer for ThreadPacer {
    fn pause(&self, duration: Duration, cancel: &Cancellation) -> std::result::Result<(), FetchError> {
        let until = Instant::now() + duration;
        loop {
            cancel.check()?;
            let now = Instant::now();
            if now >= until {
                return Ok(());
            }
            thread::sleep(self.slice.min(until - now));
        }
    }
}

// ---------------------------------------------------------------------------
// Transport — the network seam
// ---------------------------------------------------------------------------

/// A completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Connection-level failure (DNS, connect, timeout, body read).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError(pub String);

pub trait Transport: Send + Sync {
    fn get(&self, url: &str, timeout: Duration) -> std::result::Result<RawResponse, TransportError>;
}

/// Blocking `reqwest` transport sending browser-like headers.
///
/// The client is built lazily on first use.
pub struct ReqwestTransport {
    client: OnceLock<Client>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: OnceLock::new(),
        }
    }

    fn build_client() -> Result<Client> {
        let mut headers = reqwest::header::HeaderMap::new();
        for (name, value) in config::default_headers() {
            headers.insert(name, reqwest::header::HeaderValue::from_static(value));
        }
        Client::builder()
            .user_agent(config::USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(GraphiteError::from)
    }

    fn client(&self) -> std::result::Result<&Client, TransportError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = Self::build_client().map_err(|e| TransportError(e.to_string()))?;
        Ok(self.client.get_or_init(|| client))
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str, timeout: Duration) -> std::result::Result<RawResponse, TransportError> {
        let resp = self
            .client()?
            .get(url)
            .timeout(timeout)
            .send()
            .map_err(|e| TransportError(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(|e| TransportError(e.to_string()))?;
        Ok(RawResponse { status, body })
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Retry policy around a [`Transport`].
pub struct Fetcher {
    transport: Box<dyn Transport>,
    pacer: Arc<dyn Pacer>,
    timeout: Duration,
    max_retries: u32,
}

impl Fetcher {
    pub fn new(
        transport: Box<dyn Transport>,
        pacer: Arc<dyn Pacer>,
        timeout: Duration,
        max_retries: u32,
    ) -> Self {
        Self {
            transport,
            pacer,
            timeout,
            max_retries: max_retries.max(1),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Backoff after a failed attempt: `min(2^attempt, cap)` seconds.
    pub fn backoff(attempt: u32, cap_secs: u64) -> Duration {
        let secs = 2u64.checked_pow(attempt).unwrap_or(u64::MAX).min(cap_secs);
        Duration::from_secs(secs)
    }

    fn is_retryable(status: u16) -> bool {
        config::RETRYABLE_STATUSES.contains(&status)
    }

    /// Fetch `url`, returning the body of the first 200 response.
    pub fn fetch(&self, url: &str, cancel: &Cancellation) -> std::result::Result<String, FetchError> {
        let mut last_status = None;

        for attempt in 1..=self.max_retries {
            cancel.check()?;
            let last_attempt = attempt == self.max_retries;
            let timeout = cancel.bound(self.timeout);
            debug!("GET {} (attempt {}/{})", url, attempt, self.max_retries);

            let resp = match self.transport.get(url, timeout) {
                Ok(resp) => resp,
                Err(TransportError(message)) => {
                    if last_attempt {
                        return Err(FetchError::Transport {
                            url: url.to_string(),
                            message,
                        });
                    }
                    let wait = Self::backoff(attempt, config::TRANSPORT_BACKOFF_CAP_SECS);
                    warn!("request error for {}: {}; retrying in {:?}", url, message, wait);
                    self.pacer.pause(wait, cancel)?;
                    continue;
                }
            };

            last_status = Some(resp.status);

            if resp.status == 200 {
                return Ok(resp.body);
            }

            if !Self::is_retryable(resp.status) {
                return Err(FetchError::HttpStatus {
                    url: url.to_string(),
                    status: resp.status,
                });
            }

            if !last_attempt {
                let wait = Self::backoff(attempt, config::STATUS_BACKOFF_CAP_SECS);
                warn!("status {} for {}; retrying in {:?}", resp.status, url, wait);
                self.pacer.pause(wait, cancel)?;
            }
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            last_status,
        })
    }
}
