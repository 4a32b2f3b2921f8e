//! Next-page resolution and product link discovery for listing pages

use std::collections::HashSet;

use tracing::{debug, trace};
use url::Url;

use crate::document::{Document, Element};

/// Next-page link locators, probed in order
pub const NEXT_LINK_SELECTORS: &[&str] = &[
    "a[rel='next']",
    "link[rel='next']",
    "a.pagination-next",
    "li.next a",
    "[class*='pagination'] a[aria-label='Next']",
    "a[aria-label='Next']",
    "a[aria-label='Next page']",
];

/// Absolute URL of the next listing page, if the crawl should continue
///
/// A page that produced no records never paginates, even when it carries a
/// next link.
pub fn resolve_pagination<D: Document>(document: &D, record_count: usize) -> Option<Url> {
    if record_count == 0 {
        trace!(url = %document.url(), "no records, not paginating");
        return None;
    }

    let href = NEXT_LINK_SELECTORS.iter().find_map(|selector| {
        document
            .select(selector)
            .ok()?
            .into_iter()
            .find_map(|link| link.attr("href").filter(|h| !h.trim().is_empty()))
    })?;

    let next = document.resolve_url(&href)?;
    if &next == document.url() {
        debug!(url = %next, "next link points at the current page");
        return None;
    }

    debug!(from = %document.url(), to = %next, "resolved next page");
    Some(next)
}

/// Links to product pages on a hub page with no card or table layout
pub const PRODUCT_LINK_SELECTOR: &str = "a[href*='/find/']";

/// Absolute, deduplicated product links in document order
///
/// Fragments are dropped and the page's own URL is skipped.
pub fn harvest_product_links<D: Document>(document: &D) -> Vec<Url> {
    let mut seen = HashSet::new();
    let links: Vec<Url> = document
        .select(PRODUCT_LINK_SELECTOR)
        .unwrap_or_default()
        .iter()
        .filter_map(|link| link.attr("href"))
        .filter_map(|href| document.resolve_url(&href))
        .filter_map(|mut url| {
            url.set_fragment(None);
            (url != *document.url() && seen.insert(url.to_string())).then_some(url)
        })
        .collect();

    debug!(url = %document.url(), count = links.len(), "harvested product links");
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HtmlDocument;

    fn doc(body: &str) -> HtmlDocument {
        HtmlDocument::parse_with_url(
            &format!("<html><body>{body}</body></html>"),
            "https://www.example.com/find/margaux?page=1",
        )
        .expect("valid url")
    }

    #[test]
    fn zero_records_never_paginate() {
        let d = doc(r#"<a rel="next" href="?page=2">Next</a>"#);
        assert_eq!(resolve_pagination(&d, 0), None);
    }

    #[test]
    fn resolves_relative_next_link() {
        let d = doc(r#"<a rel="next" href="?page=2">Next</a>"#);
        assert_eq!(
            resolve_pagination(&d, 3).map(String::from),
            Some("https://www.example.com/find/margaux?page=2".to_string())
        );
    }

    #[test]
    fn falls_back_through_selectors() {
        let d = doc(r#"<ul><li class="next"><a href="/find/margaux?page=2">›</a></li></ul>"#);
        assert!(resolve_pagination(&d, 1).is_some());
    }

    #[test]
    fn no_next_link() {
        assert_eq!(resolve_pagination(&doc("<p>end</p>"), 5), None);
    }

    #[test]
    fn self_link_is_ignored() {
        let d = doc(r#"<a rel="next" href="/find/margaux?page=1">Next</a>"#);
        assert_eq!(resolve_pagination(&d, 5), None);
    }

    #[test]
    fn harvests_unique_absolute_product_links() {
        let d = doc(
            r#"<a href="/find/opus+one">Opus One</a>
               <a href="https://www.example.com/find/opus+one#offers">Opus One offers</a>
               <a href="/find/margaux?page=1">this page</a>
               <a href="/merchant/42">Merchant</a>
               <a href="/find/sassicaia">Sassicaia</a>"#,
        );
        let links: Vec<String> = harvest_product_links(&d).into_iter().map(String::from).collect();
        assert_eq!(
            links,
            [
                "https://www.example.com/find/opus+one",
                "https://www.example.com/find/sassicaia"
            ]
        );
    }
}
