//! Shared test fixtures for the Graphite integration tests.
//!
//! Provides a scripted [`Transport`] that replays canned responses, a
//! [`Pacer`] that records requested pauses instead of sleeping, a small
//! results-page HTML builder, and a tempdir-backed estimator.

#![allow(dead_code)]

use graphite::{
    Cancellation, Estimator, EstimatorBuilder, FetchError, Pacer, RawResponse, Transport,
    TransportError,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ScriptedTransport
// ---------------------------------------------------------------------------

/// Replays queued responses in order; once the queue is empty every request
/// gets `fallback`.
#[derive(Clone)]
pub struct ScriptedTransport {
    queue: Arc<Mutex<VecDeque<Result<RawResponse, TransportError>>>>,
    fallback: Result<RawResponse, TransportError>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::with_fallback(Ok(status(503)))
    }

    pub fn with_fallback(fallback: Result<RawResponse, TransportError>) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            fallback,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every request answers with `code`.
    pub fn always(code: u16) -> Self {
        Self::with_fallback(Ok(status(code)))
    }

    pub fn push(&self, response: Result<RawResponse, TransportError>) -> &Self {
        self.queue.lock().unwrap().push_back(response);
        self
    }

    pub fn push_page(&self, html: impl Into<String>) -> &Self {
        self.push(Ok(RawResponse {
            status: 200,
            body: html.into(),
        }))
    }

    pub fn push_status(&self, code: u16) -> &Self {
        self.push(Ok(status(code)))
    }

    pub fn push_transport_error(&self, message: &str) -> &Self {
        self.push(Err(TransportError(message.to_string())))
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str, _timeout: Duration) -> Result<RawResponse, TransportError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

pub fn status(code: u16) -> RawResponse {
    RawResponse {
        status: code,
        body: String::new(),
    }
}

// ---------------------------------------------------------------------------
// RecordingPacer
// ---------------------------------------------------------------------------

/// Records pauses without sleeping; still honours cancellation.
#[derive(Clone, Default)]
pub struct RecordingPacer {
    pauses: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }
}

impl Pacer for RecordingPacer {
    fn pause(&self, duration: Duration, cancel: &Cancellation) -> Result<(), FetchError> {
        cancel.check()?;
        self.pauses.lock().unwrap().push(duration);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// HTML fixtures
// ---------------------------------------------------------------------------

/// One `li.s-item` entry for a results page.
pub struct Item<'a> {
    pub title: &'a str,
    pub url: &'a str,
    pub price: &'a str,
    pub shipping: Option<&'a str>,
    pub ended: Option<&'a str>,
}

impl<'a> Item<'a> {
    pub fn new(title: &'a str, url: &'a str, price: &'a str) -> Self {
        Self {
            title,
            url,
            price,
            shipping: None,
            ended: None,
        }
    }

    pub fn shipping(mut self, shipping: &'a str) -> Self {
        self.shipping = Some(shipping);
        self
    }

    pub fn ended(mut self, ended: &'a str) -> Self {
        self.ended = Some(ended);
        self
    }

    pub fn to_html(&self) -> String {
        let mut html = String::from("<li class=\"s-item\">");
        html.push_str(&format!(
            "<a class=\"s-item__link\" href=\"{}\"><div class=\"s-item__title\"><span>{}</span></div></a>",
            self.url, self.title
        ));
        html.push_str(&format!("<span class=\"s-item__price\">{}</span>", self.price));
        if let Some(shipping) = self.shipping {
            html.push_str(&format!("<span class=\"s-item__shipping\">{}</span>", shipping));
        }
        if let Some(ended) = self.ended {
            html.push_str(&format!("<span class=\"s-item__ended-date\">{}</span>", ended));
        }
        html.push_str("</li>");
        html
    }
}

/// Wrap raw `li` markup in a results page.
pub fn page_html(items: &[String]) -> String {
    format!(
        "<html><body><ul class=\"srp-results\">{}</ul></body></html>",
        items.join("")
    )
}

/// A results page of `prices`, each with a URL derived from `prefix`.
pub fn price_page(prefix: &str, prices: &[f64]) -> String {
    let items: Vec<String> = prices
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let url = format!("https://www.ebay.com/itm/{}-{}", prefix, i);
            let price = format!("${:.2}", p);
            Item::new("Carhartt J01 jacket", &url, &price).to_html()
        })
        .collect();
    page_html(&items)
}

// ---------------------------------------------------------------------------
// Estimator fixture
// ---------------------------------------------------------------------------

/// A builder wired to `transport`, a recording pacer, and a temp cache dir.
///
/// The caller must keep the returned `TempDir` alive for the test.
pub fn builder(transport: &ScriptedTransport) -> (EstimatorBuilder, RecordingPacer, tempfile::TempDir) {
    let tmp_dir = tempfile::tempdir().unwrap();
    let pacer = RecordingPacer::new();
    let builder = Estimator::builder()
        .transport(transport.clone())
        .pacer(pacer.clone())
        .cache_dir(tmp_dir.path().join("cache"))
        .page_delay(Duration::from_millis(250));
    (builder, pacer, tmp_dir)
}
