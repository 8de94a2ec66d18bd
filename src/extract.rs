//! Listing extraction from one page of sold-search results.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

use crate::models::Listing;
use crate::money::{parse_money, parse_shipping};

/// Title eBay injects as the first, non-listing result.
const PLACEHOLDER_TITLE: &str = "shop on ebay";

struct Selectors {
    item: Selector,
    title: Selector,
    link: Selector,
    price: Selector,
    shipping: Selector,
    ended: Selector,
}

fn selectors() -> &'static Selectors {
    static SELECTORS: OnceLock<Selectors> = OnceLock::new();
    SELECTORS.get_or_init(|| {
        let parse = |css: &str| Selector::parse(css).expect("static selector is valid");
        Selectors {
            item: parse("li.s-item"),
            title: parse(".s-item__title"),
            link: parse("a.s-item__link"),
            price: parse(".s-item__price"),
            shipping: parse(".s-item__shipping, .s-item__logisticsCost"),
            ended: parse(".s-item__ended-date"),
        }
    })
}

fn new_listing_prefix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^\s*New Listing\s*").expect("prefix pattern is valid"))
}

/// Strip the "New Listing" promo marker and surrounding whitespace.
pub fn clean_title(raw: &str) -> String {
    new_listing_prefix()
        .replace(raw.trim(), "")
        .trim()
        .to_string()
}

/// Text content of an element, whitespace-trimmed per node and space-joined.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(item: ElementRef<'_>, selector: &Selector) -> Option<String> {
    item.select(selector).next().map(element_text)
}

/// Parse every usable listing on a results page, in page order.
///
/// Entries without a title, link or price block are skipped, as is the
/// placeholder entry. An unparseable price is kept as `None`.
pub fn parse_sold_results(html: &str) -> Vec<Listing> {
    let document = Html::parse_document(html);
    let sel = selectors();

    document
        .select(&sel.item)
        .filter_map(|item| parse_item(item, sel))
        .collect()
}

fn parse_item(item: ElementRef<'_>, sel: &Selectors) -> Option<Listing> {
    let raw_title = first_text(item, &sel.title)?;
    let link = item.select(&sel.link).next()?;
    let price_text = first_text(item, &sel.price)?;

    if raw_title.is_empty() || raw_title.to_lowercase() == PLACEHOLDER_TITLE {
        return None;
    }

    let url = link.value().attr("href").unwrap_or("").trim();
    if url.is_empty() {
        return None;
    }

    let (price, currency) = parse_money(&price_text);
    let ship_text = first_text(item, &sel.shipping).unwrap_or_default();
    let (shipping, shipping_currency) = parse_shipping(&ship_text);

    Some(Listing {
        title: clean_title(&raw_title),
        price,
        currency,
        shipping,
        shipping_currency,
        url: url.to_string(),
        ended: first_text(item, &sel.ended),
    })
}
