//! Error taxonomy for scraping operations
//!
//! Page-level hard failures (`BlockDetected`, `ChallengeDetected`,
//! `NavigationTimeout`) always escalate to the crawl orchestrator with the
//! document URL attached. Field-level noise lives in [`FieldError`] and never
//! leaves the extraction engine.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for scraping operations
pub type ScrapeResult<T> = Result<T, ScrapeError>;

/// Evidence that a served document is an anti-automation response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockSignal {
    /// A closed-set block phrase was found in the title or text content
    Phrase(String),
    /// A challenge element was found; holds the matched attribute value
    ChallengeElement(String),
}

impl fmt::Display for BlockSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phrase(phrase) => write!(f, "block phrase \"{phrase}\""),
            Self::ChallengeElement(attr) => write!(f, "challenge element ({attr})"),
        }
    }
}

/// Errors surfaced to the caller of the core
#[derive(Debug, Clone, Error)]
pub enum ScrapeError {
    /// The document is a block page
    #[error("Blocked at {url}: {signal}")]
    BlockDetected { url: String, signal: BlockSignal },

    /// The document is an interactive challenge
    #[error("Challenge served at {url}: {signal}")]
    ChallengeDetected { url: String, signal: BlockSignal },

    /// The identity was retired earlier in this session
    #[error("Identity {identity} is retired and must be rotated")]
    IdentityRetired { identity: String },

    /// Navigation did not complete in time
    #[error("Navigation to {url} timed out after {timeout_secs}s")]
    NavigationTimeout { url: String, timeout_secs: u64 },

    /// Expected content did not render in time (soft)
    #[error("Selector '{selector}' did not appear on {url}")]
    SelectorWaitTimeout { url: String, selector: String },

    /// No identity can be handed out
    #[error("Identity pool exhausted: {active} of {max_size} identities in use")]
    PoolExhausted { active: usize, max_size: usize },

    /// Browser transport failure
    #[error("Browser error: {0}")]
    Browser(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Output sink failure
    #[error("Sink error: {0}")]
    Sink(String),
}

impl From<anyhow::Error> for ScrapeError {
    fn from(err: anyhow::Error) -> Self {
        // {:#} keeps the context chain
        Self::Browser(format!("{err:#}"))
    }
}

impl ScrapeError {
    /// Hard errors abort processing of the current document
    #[must_use]
    pub const fn is_hard(&self) -> bool {
        !matches!(self, Self::SelectorWaitTimeout { .. })
    }

    /// Whether the identity that produced this error must be discarded
    #[must_use]
    pub const fn requires_rotation(&self) -> bool {
        matches!(
            self,
            Self::BlockDetected { .. } | Self::ChallengeDetected { .. } | Self::IdentityRetired { .. }
        )
    }

    /// Whether the orchestrator should charge this failure to the document's
    /// retry budget
    #[must_use]
    pub const fn counts_against_retry_budget(&self) -> bool {
        matches!(
            self,
            Self::NavigationTimeout { .. }
                | Self::Browser(_)
                | Self::BlockDetected { .. }
                | Self::ChallengeDetected { .. }
                | Self::IdentityRetired { .. }
        )
    }

    /// URL of the document that produced the error, when known
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::BlockDetected { url, .. }
            | Self::ChallengeDetected { url, .. }
            | Self::NavigationTimeout { url, .. }
            | Self::SelectorWaitTimeout { url, .. } => Some(url),
            _ => None,
        }
    }
}

/// Field-level extraction noise, always degraded to an absent value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// A matched element lacks the attribute the accessor reads
    #[error("Attribute '{0}' missing on matched element")]
    MissingAttribute(String),

    /// A CSS locator failed to parse
    #[error("Invalid locator '{0}'")]
    InvalidLocator(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_errors_require_rotation() {
        let err = ScrapeError::BlockDetected {
            url: "https://example.com".into(),
            signal: BlockSignal::Phrase("Access Denied".into()),
        };
        assert!(err.is_hard());
        assert!(err.requires_rotation());
        assert_eq!(err.url(), Some("https://example.com"));
    }

    #[test]
    fn selector_wait_is_soft() {
        let err = ScrapeError::SelectorWaitTimeout {
            url: "https://example.com".into(),
            selector: "h1".into(),
        };
        assert!(!err.is_hard());
        assert!(!err.counts_against_retry_budget());
    }

    #[test]
    fn navigation_timeout_charges_budget_without_rotation() {
        let err = ScrapeError::NavigationTimeout {
            url: "https://example.com".into(),
            timeout_secs: 30,
        };
        assert!(err.counts_against_retry_budget());
        assert!(!err.requires_rotation());
        assert!(err.to_string().contains("30s"));
    }
}
