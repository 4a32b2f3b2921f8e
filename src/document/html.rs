//! `scraper`-backed document snapshot

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{Document, Element, collapse_whitespace};
use crate::error::FieldError;

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("title").expect("BUG: hardcoded CSS selector 'title' is invalid")
});

static BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("body").expect("BUG: hardcoded CSS selector 'body' is invalid")
});

/// A parsed HTML snapshot of a rendered page
pub struct HtmlDocument {
    html: Html,
    url: Url,
}

impl HtmlDocument {
    /// Parse an HTML string served from `url`
    #[must_use]
    pub fn parse(html: &str, url: Url) -> Self {
        Self {
            html: Html::parse_document(html),
            url,
        }
    }

    /// Parse an HTML string, resolving `url` first
    ///
    /// # Errors
    ///
    /// Returns an error if `url` is not an absolute URL.
    pub fn parse_with_url(html: &str, url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::parse(html, Url::parse(url)?))
    }
}

impl std::fmt::Debug for HtmlDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlDocument").field("url", &self.url.as_str()).finish()
    }
}

impl Document for HtmlDocument {
    type Element<'a> = ElementRef<'a>;

    fn url(&self) -> &Url {
        &self.url
    }

    fn title(&self) -> String {
        self.html
            .select(&TITLE_SELECTOR)
            .next()
            .map(|el| Element::text(&el))
            .unwrap_or_default()
    }

    fn text_content(&self) -> String {
        match self.html.select(&BODY_SELECTOR).next() {
            Some(body) => Element::text(&body),
            None => Element::text(&self.html.root_element()),
        }
    }

    fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }
}

impl<'a> Element for ElementRef<'a> {
    fn text(&self) -> String {
        // Inline children are joined with a space so "94<small>/100</small>"
        // stays tokenizable
        let joined = ElementRef::text(self).collect::<Vec<_>>().join(" ");
        collapse_whitespace(&joined)
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.value().attr(name).map(str::to_string)
    }

    fn select(&self, locator: &str) -> Result<Vec<Self>, FieldError> {
        let selector =
            Selector::parse(locator).map_err(|_| FieldError::InvalidLocator(locator.to_string()))?;
        Ok(ElementRef::select(self, &selector).collect())
    }

    fn children(&self) -> Vec<Self> {
        (**self).children().filter_map(ElementRef::wrap).collect()
    }

    fn next_sibling(&self) -> Option<Self> {
        self.next_siblings().find_map(ElementRef::wrap)
    }
}
