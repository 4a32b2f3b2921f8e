//! Page-type classification
//!
//! Every fetched document is classified before anything is extracted from
//! it. Block and challenge detection run first and short-circuit: a blocked
//! page must never reach the extraction engine, where it would silently
//! produce zero records.

use std::sync::LazyLock;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::document::{Document, Element};
use crate::error::{BlockSignal, ScrapeError};
use crate::extraction::merchants::OFFER_ROW_SELECTORS;

/// Closed set of block-page phrases, matched case-sensitively against the
/// title and the body text
pub const BLOCK_PHRASES: &[&str] = &[
    "Access Denied",
    "Access to this page has been denied",
    "You have been blocked",
    "Request unsuccessful",
    "403 Forbidden",
    "Pardon Our Interruption",
];

/// Substrings that mark a challenge widget, matched case-insensitively
pub const CHALLENGE_KEYWORDS: &[&str] = &["challenge", "captcha"];

/// Attributes inspected on iframes
const IFRAME_ATTRIBUTES: &[&str] = &["id", "class", "src", "name", "title"];

/// Attributes inspected on every other element
///
/// `src` is left out: pages routinely load captcha scripts for login forms
/// without serving a challenge.
const ELEMENT_ATTRIBUTES: &[&str] = &["id", "class", "name"];

/// Search-result card containers, probed in order
pub const CARD_SELECTORS: &[&str] = &[
    "[data-testid='wine-card']",
    ".wine-card",
    ".card-product",
    "div[class*='search-result']",
];

/// Rows probed for the tabular layout
pub const TABLE_ROW_SELECTOR: &str = "table tr";

/// Cells a table row needs to count as a data row
pub const MIN_ROW_CELLS: usize = 2;

/// Primary heading that marks a detail page
pub const DETAIL_HEADING_SELECTOR: &str = "h1";

/// Table rows that are not merchant offer rows
///
/// An offer table belongs to a detail page and must not turn it into a
/// tabular listing.
static DATA_ROW_LOCATOR: LazyLock<String> = LazyLock::new(|| {
    OFFER_ROW_SELECTORS
        .iter()
        .fold(TABLE_ROW_SELECTOR.to_string(), |locator, offer| {
            format!("{locator}:not({offer})")
        })
});

/// Locator that matches once any classifiable layout has rendered
#[must_use]
pub fn content_ready_selector() -> String {
    CARD_SELECTORS
        .iter()
        .copied()
        .chain([TABLE_ROW_SELECTOR, DETAIL_HEADING_SELECTOR])
        .collect::<Vec<_>>()
        .join(", ")
}

/// What kind of page a document is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageType {
    Blocked,
    Challenged,
    SearchResults,
    TabularFallback,
    Detail,
    Unknown,
}

impl PageType {
    /// Blocked and Challenged pages are anti-automation responses
    #[must_use]
    pub const fn is_adversarial(self) -> bool {
        matches!(self, Self::Blocked | Self::Challenged)
    }

    /// Layouts the extraction engine knows how to read
    #[must_use]
    pub const fn is_extractable(self) -> bool {
        matches!(self, Self::SearchResults | Self::TabularFallback | Self::Detail)
    }
}

impl std::fmt::Display for PageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Blocked => "blocked",
            Self::Challenged => "challenged",
            Self::SearchResults => "search-results",
            Self::TabularFallback => "tabular",
            Self::Detail => "detail",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Result of classifying one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub page_type: PageType,
    /// Evidence for Blocked / Challenged
    pub signal: Option<BlockSignal>,
    /// Card selector that decided SearchResults
    pub card_selector: Option<&'static str>,
}

impl Classification {
    fn plain(page_type: PageType) -> Self {
        Self {
            page_type,
            signal: None,
            card_selector: None,
        }
    }

    /// Typed failure for an adversarial page, `None` for anything else
    #[must_use]
    pub fn failure(&self, url: &str) -> Option<ScrapeError> {
        let signal = self.signal.clone()?;
        match self.page_type {
            PageType::Blocked => Some(ScrapeError::BlockDetected {
                url: url.to_string(),
                signal,
            }),
            PageType::Challenged => Some(ScrapeError::ChallengeDetected {
                url: url.to_string(),
                signal,
            }),
            _ => None,
        }
    }
}

/// Classify a rendered document
pub fn classify<D: Document>(document: &D) -> Classification {
    let url = document.url().as_str();

    if let Some(phrase) = find_block_phrase(document) {
        warn!("Block page at {url}: \"{phrase}\"");
        return Classification {
            page_type: PageType::Blocked,
            signal: Some(BlockSignal::Phrase(phrase.to_string())),
            card_selector: None,
        };
    }

    if let Some(evidence) = find_challenge_element(document) {
        warn!("Challenge at {url}: {evidence}");
        return Classification {
            page_type: PageType::Challenged,
            signal: Some(BlockSignal::ChallengeElement(evidence)),
            card_selector: None,
        };
    }

    for selector in CARD_SELECTORS {
        if matches!(document.select(selector), Ok(cards) if !cards.is_empty()) {
            debug!("{url} classified as search results via {selector}");
            return Classification {
                page_type: PageType::SearchResults,
                signal: None,
                card_selector: Some(*selector),
            };
        }
    }

    if !data_rows(document).is_empty() {
        debug!("{url} classified as tabular");
        return Classification::plain(PageType::TabularFallback);
    }

    if matches!(document.select(DETAIL_HEADING_SELECTOR), Ok(h) if !h.is_empty()) {
        debug!("{url} classified as detail");
        return Classification::plain(PageType::Detail);
    }

    debug!("{url} has no recognizable layout");
    Classification::plain(PageType::Unknown)
}

fn find_block_phrase<D: Document>(document: &D) -> Option<&'static str> {
    let title = document.title();
    let text = document.text_content();
    BLOCK_PHRASES
        .iter()
        .copied()
        .find(|phrase| title.contains(phrase) || text.contains(phrase))
}

fn find_challenge_element<D: Document>(document: &D) -> Option<String> {
    let iframes = document.select("iframe").unwrap_or_default();
    if let Some(hit) = iframes
        .iter()
        .find_map(|frame| challenge_attribute(frame, IFRAME_ATTRIBUTES))
    {
        return Some(format!("iframe {hit}"));
    }

    let candidates = document.select("[id], [class], [name]").unwrap_or_default();
    candidates
        .iter()
        .find_map(|el| challenge_attribute(el, ELEMENT_ATTRIBUTES))
}

fn challenge_attribute<E: Element>(element: &E, attributes: &[&str]) -> Option<String> {
    attributes.iter().find_map(|name| {
        let value = element.attr(name)?;
        let lower = value.to_lowercase();
        CHALLENGE_KEYWORDS
            .iter()
            .any(|kw| lower.contains(kw))
            .then(|| format!("{name}=\"{value}\""))
    })
}

/// Table rows with at least [`MIN_ROW_CELLS`] cells, in document order
///
/// Merchant offer rows are not data rows.
pub fn data_rows<D: Document>(document: &D) -> Vec<D::Element<'_>> {
    document
        .select(DATA_ROW_LOCATOR.as_str())
        .unwrap_or_default()
        .into_iter()
        .filter(|row| row.select("td").is_ok_and(|cells| cells.len() >= MIN_ROW_CELLS))
        .collect()
}
