//! Multi-page collection: URL building, pacing, dedup, and failure handling.

mod common;

use common::{page_html, price_page, Item, RecordingPacer, ScriptedTransport};
use graphite::collector::{build_sold_search_url, dedupe_by_url};
use graphite::config::EBAY_SEARCH_URL;
use graphite::{Cancellation, Collector, FetchError, Fetcher};
use std::sync::Arc;
use std::time::Duration;

fn collector(transport: &ScriptedTransport, pacer: &RecordingPacer) -> Collector {
    let pacer: Arc<RecordingPacer> = Arc::new(pacer.clone());
    let fetcher = Fetcher::new(
        Box::new(transport.clone()),
        pacer.clone(),
        Duration::from_secs(8),
        2,
    );
    Collector::new(fetcher, pacer, EBAY_SEARCH_URL)
}

#[test]
fn search_url_encodes_query_and_filters() {
    let url = build_sold_search_url(EBAY_SEARCH_URL, "Carhartt J01 & co", 2).unwrap();
    assert!(url.starts_with("https://www.ebay.com/sch/i.html?"));
    assert!(url.contains("_nkw=Carhartt+J01+%26+co"));
    assert!(url.contains("LH_Sold=1"));
    assert!(url.contains("LH_Complete=1"));
    assert!(url.contains("_sop=13"));
    assert!(url.ends_with("_pgn=2"));
}

#[test]
fn invalid_base_url_is_a_transport_error() {
    let err = build_sold_search_url("not a url", "x", 1).unwrap_err();
    assert_eq!(err.kind(), "transport");
}

#[test]
fn collects_pages_in_order_with_pacing_between() {
    let transport = ScriptedTransport::new();
    transport
        .push_page(price_page("p1", &[10.0, 20.0]))
        .push_page(price_page("p2", &[30.0]))
        .push_page(price_page("p3", &[40.0]));
    let pacer = RecordingPacer::new();

    let listings = collector(&transport, &pacer)
        .collect("jacket", 3, Duration::from_millis(750), &Cancellation::new())
        .unwrap();

    let prices: Vec<f64> = listings.iter().filter_map(|l| l.price).collect();
    assert_eq!(prices, vec![10.0, 20.0, 30.0, 40.0]);

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    for (i, url) in requests.iter().enumerate() {
        assert!(url.ends_with(&format!("_pgn={}", i + 1)));
    }
    // Paced between pages only, never after the last one.
    assert_eq!(pacer.pauses(), vec![Duration::from_millis(750); 2]);
}

#[test]
fn page_count_is_clamped() {
    let transport = ScriptedTransport::with_fallback(Ok(graphite::RawResponse {
        status: 200,
        body: price_page("x", &[1.0]),
    }));
    let pacer = RecordingPacer::new();
    let c = collector(&transport, &pacer);

    c.collect("q", 0, Duration::ZERO, &Cancellation::new()).unwrap();
    assert_eq!(transport.request_count(), 1);

    c.collect("q", 10, Duration::ZERO, &Cancellation::new()).unwrap();
    assert_eq!(transport.request_count(), 1 + 3);
}

#[test]
fn duplicate_urls_across_pages_are_collected_once() {
    let shared = Item::new("Same jacket", "https://www.ebay.com/itm/shared", "$50.00");
    let transport = ScriptedTransport::new();
    transport
        .push_page(page_html(&[
            shared.to_html(),
            Item::new("Other", "https://www.ebay.com/itm/a", "$60.00").to_html(),
        ]))
        .push_page(page_html(&[
            Item::new("Same jacket relisted", "https://www.ebay.com/itm/shared", "$55.00").to_html(),
            Item::new("Third", "https://www.ebay.com/itm/b", "$70.00").to_html(),
        ]));
    let pacer = RecordingPacer::new();

    let listings = collector(&transport, &pacer)
        .collect("jacket", 2, Duration::ZERO, &Cancellation::new())
        .unwrap();

    let urls: Vec<&str> = listings.iter().map(|l| l.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://www.ebay.com/itm/shared",
            "https://www.ebay.com/itm/a",
            "https://www.ebay.com/itm/b"
        ]
    );
    // First-seen wins.
    assert_eq!(listings[0].price, Some(50.0));
}

#[test]
fn failure_on_a_later_page_discards_everything() {
    let transport = ScriptedTransport::new();
    transport.push_page(price_page("p1", &[10.0, 20.0])).push_status(404);
    let pacer = RecordingPacer::new();

    let err = collector(&transport, &pacer)
        .collect("jacket", 3, Duration::ZERO, &Cancellation::new())
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(transport.request_count(), 2);
}

#[test]
fn cancellation_during_pacing_aborts() {
    struct CancellingPacer(Cancellation);
    impl graphite::Pacer for CancellingPacer {
        fn pause(&self, _d: Duration, cancel: &Cancellation) -> Result<(), FetchError> {
            self.0.cancel();
            cancel.check()
        }
    }

    let cancel = Cancellation::new();
    let transport = ScriptedTransport::new();
    transport.push_page(price_page("p1", &[10.0])).push_page(price_page("p2", &[20.0]));
    let pacer = Arc::new(CancellingPacer(cancel.clone()));
    let fetcher = Fetcher::new(Box::new(transport.clone()), pacer.clone(), Duration::from_secs(8), 2);
    let c = Collector::new(fetcher, pacer, EBAY_SEARCH_URL);

    let err = c.collect("q", 2, Duration::from_secs(1), &cancel).unwrap_err();
    assert_eq!(err, FetchError::Cancelled);
    assert_eq!(transport.request_count(), 1);
}

#[test]
fn dedupe_keeps_first_seen_order() {
    let html = page_html(&[
        Item::new("a", "u1", "$1").to_html(),
        Item::new("b", "u2", "$2").to_html(),
        Item::new("c", "u1", "$3").to_html(),
    ]);
    let listings = graphite::extract::parse_sold_results(&html);
    let unique = dedupe_by_url(listings);
    let titles: Vec<&str> = unique.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["a", "b"]);
}
