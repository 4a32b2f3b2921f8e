//! Ordered fallback strategies for a single field
//!
//! A [`FieldSpec`] is plain data: an ordered list of (locator, accessor)
//! pairs. [`extract`] walks the list in declared order and stops at the first
//! strategy whose locator finds anything. That strategy's value is final,
//! even when it is empty and a later strategy would have produced more.

use regex::Regex;
use tracing::{debug, trace};

use crate::document::Element;
use crate::error::FieldError;

/// How a strategy finds its target
#[derive(Debug, Clone)]
pub enum Locator {
    /// CSS selector evaluated against the scope's descendants
    Css(&'static str),
    /// Regex evaluated over the scope's text; the first capture group is the
    /// value
    TextPattern(Regex),
}

/// How a value is read from a located element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    /// Collapsed text content
    Text,
    /// A named attribute
    Attribute(&'static str),
}

/// One (locator, accessor) pair
#[derive(Debug, Clone)]
pub struct Strategy {
    pub locator: Locator,
    pub accessor: Accessor,
}

impl Strategy {
    /// Read the text of the first element matching `css`
    #[must_use]
    pub const fn text(css: &'static str) -> Self {
        Self {
            locator: Locator::Css(css),
            accessor: Accessor::Text,
        }
    }

    /// Read attribute `name` of the first element matching `css`
    #[must_use]
    pub const fn attr(css: &'static str, name: &'static str) -> Self {
        Self {
            locator: Locator::Css(css),
            accessor: Accessor::Attribute(name),
        }
    }

    /// Capture group 1 of `pattern` over the scope text
    ///
    /// Patterns are hardcoded field definitions; an invalid one is a bug.
    #[must_use]
    pub fn pattern(pattern: &str) -> Self {
        Self {
            locator: Locator::TextPattern(
                Regex::new(pattern)
                    .unwrap_or_else(|e| panic!("BUG: hardcoded text pattern '{pattern}' is invalid: {e}")),
            ),
            accessor: Accessor::Text,
        }
    }

    /// Evaluate this strategy against `scope`
    ///
    /// Returns `Ok(None)` when the locator finds nothing, `Ok(Some(value))`
    /// when it does, and `Err` when a located element cannot be read.
    fn evaluate<E: Element>(&self, scope: &E) -> Result<Option<String>, FieldError> {
        match &self.locator {
            Locator::Css(css) => {
                let Some(element) = scope.select_first(css)? else {
                    return Ok(None);
                };
                let value = match self.accessor {
                    Accessor::Text => element.text(),
                    Accessor::Attribute(name) => element
                        .attr(name)
                        .ok_or_else(|| FieldError::MissingAttribute(name.to_string()))?,
                };
                Ok(Some(value))
            }
            Locator::TextPattern(re) => {
                let text = scope.text();
                Ok(re
                    .captures(&text)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().trim().to_string()))
            }
        }
    }
}

/// Ordered strategy list for one named field
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub field: &'static str,
    pub strategies: Vec<Strategy>,
}

impl FieldSpec {
    #[must_use]
    pub fn new(field: &'static str, strategies: Vec<Strategy>) -> Self {
        Self { field, strategies }
    }
}

/// Trace of one field extraction
///
/// Ephemeral: it only exists to decide the field's value and to log how it
/// was decided.
#[derive(Debug, Clone, Default)]
pub struct ExtractionAttempt {
    /// Index of every strategy evaluated, in order
    pub tried: Vec<usize>,
    /// Index of the strategy that located something
    pub winner: Option<usize>,
    /// Noise swallowed while evaluating the winner
    pub noise: Option<FieldError>,
}

/// Extract a raw field value from `scope` using `spec`
///
/// Never fails: field-level errors are logged and treated as absent.
pub fn extract<E: Element>(scope: &E, spec: &FieldSpec) -> Option<String> {
    let (value, attempt) = extract_traced(scope, spec);
    trace!(
        field = spec.field,
        tried = ?attempt.tried,
        winner = ?attempt.winner,
        "field extraction finished"
    );
    value
}

/// [`extract`] that also returns the attempt trace
pub fn extract_traced<E: Element>(scope: &E, spec: &FieldSpec) -> (Option<String>, ExtractionAttempt) {
    let mut attempt = ExtractionAttempt::default();

    for (index, strategy) in spec.strategies.iter().enumerate() {
        attempt.tried.push(index);
        match strategy.evaluate(scope) {
            Ok(None) => {}
            Ok(Some(value)) => {
                attempt.winner = Some(index);
                let value = crate::normalize::normalize_text(&value);
                return (value, attempt);
            }
            Err(FieldError::InvalidLocator(locator)) => {
                // A broken locator locates nothing; keep going
                debug!(field = spec.field, %locator, "skipping invalid locator");
            }
            Err(e) => {
                debug!(field = spec.field, error = %e, "field extraction noise");
                attempt.winner = Some(index);
                attempt.noise = Some(e);
                return (None, attempt);
            }
        }
    }

    (None, attempt)
}
