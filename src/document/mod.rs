//! Read-only document query capability
//!
//! The extraction core never talks to a browser directly. Everything it needs
//! from a rendered page is expressed by the [`Document`] and [`Element`]
//! traits: select by CSS locator, read text, read a named attribute and walk
//! children or siblings. [`HtmlDocument`] implements them over a parsed HTML
//! snapshot, which is what the browser adapter hands to the core.

mod html;

pub use html::HtmlDocument;

use url::Url;

use crate::error::FieldError;

/// A queryable element handle
pub trait Element: Clone {
    /// Text content of the element with whitespace collapsed
    fn text(&self) -> String;

    /// Value of a named attribute, if present
    fn attr(&self, name: &str) -> Option<String>;

    /// Descendant elements matching a CSS locator, in document order
    fn select(&self, locator: &str) -> Result<Vec<Self>, FieldError>;

    /// Direct child elements in document order
    fn children(&self) -> Vec<Self>;

    /// Next sibling element, skipping text nodes
    fn next_sibling(&self) -> Option<Self>;

    /// First descendant matching `locator`, if any
    fn select_first(&self, locator: &str) -> Result<Option<Self>, FieldError> {
        Ok(self.select(locator)?.into_iter().next())
    }
}

/// A rendered document
pub trait Document {
    /// Element handle type borrowed from the document
    type Element<'a>: Element
    where
        Self: 'a;

    /// URL the document was served from, used to resolve relative links
    fn url(&self) -> &Url;

    /// Text of the `<title>` element, empty when absent
    fn title(&self) -> String;

    /// Full visible text content of the document body
    fn text_content(&self) -> String;

    /// Root element used as the scope for document-wide queries
    fn root(&self) -> Self::Element<'_>;

    /// Elements anywhere in the document matching `locator`
    fn select(&self, locator: &str) -> Result<Vec<Self::Element<'_>>, FieldError> {
        self.root().select(locator)
    }

    /// Resolve a possibly relative href against the document URL
    fn resolve_url(&self, href: &str) -> Option<Url> {
        self.url().join(href.trim()).ok()
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
