//! Text-to-typed-value normalization
//!
//! Every function here takes raw extracted text and returns either a
//! validated value or `None`. Nothing returns sentinel numbers or empty
//! strings standing in for "unknown".
//!
//! Price parsing is locale-naive: a lone comma is read as a decimal
//! separator, so "1,234" is 1.234. Only when a period follows does the comma
//! act as grouping ("1,234.50").

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static RATING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2,3}").expect("BUG: hardcoded rating regex is invalid"));

static VINTAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(19\d{2}|20\d{2})\b").expect("BUG: hardcoded vintage regex is invalid")
});

static COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,3}(?:,\d{3})+|\d+").expect("BUG: hardcoded count regex is invalid")
});

/// Lowest rating accepted as a real score
pub const MIN_RATING: u8 = 50;
/// Highest rating accepted as a real score
pub const MAX_RATING: u8 = 100;
/// Earliest vintage recognized
pub const MIN_VINTAGE: u16 = 1900;
/// Latest vintage recognized
pub const MAX_VINTAGE: u16 = 2099;

/// Currencies recognized from price symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "GBP")]
    Gbp,
}

impl Currency {
    /// ISO 4217 code
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
        }
    }

    /// Detect the currency from symbol presence; € wins over £, £ over $
    #[must_use]
    pub fn detect(text: &str) -> Self {
        if text.contains('€') {
            Self::Eur
        } else if text.contains('£') {
            Self::Gbp
        } else {
            Self::Usd
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A parsed price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Finite, non-negative amount
    pub amount: f64,
    pub currency: Currency,
}

/// Parse a price string into a [`PriceQuote`]
///
/// Keeps only digits, commas and periods, replaces the first comma with a
/// period, then parses. When that leaves more than one period, every period
/// but the last is treated as grouping, so `"$1,234.50"` reads as 1234.50.
#[must_use]
pub fn normalize_price(text: &str) -> Option<PriceQuote> {
    let currency = Currency::detect(text);

    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    let decimal = kept.replacen(',', ".", 1);
    let numeric = collapse_grouping_periods(&decimal);

    let numeric = numeric.trim_end_matches('.');
    let amount: f64 = if numeric.starts_with('.') {
        format!("0{numeric}").parse().ok()?
    } else {
        numeric.parse().ok()?
    };
    if !amount.is_finite() || amount < 0.0 {
        return None;
    }

    Some(PriceQuote { amount, currency })
}

/// Remove remaining commas and every period except the last one
fn collapse_grouping_periods(text: &str) -> String {
    let text = text.replace(',', "");
    match text.rfind('.') {
        Some(last) => {
            let (head, tail) = text.split_at(last);
            format!("{}{}", head.replace('.', ""), tail)
        }
        None => text,
    }
}

/// Parse a rating: the first 2–3 digit run, valid only within 50–100
#[must_use]
pub fn normalize_rating(text: &str) -> Option<u8> {
    let digits = RATING_RE.find(text)?;
    let value: u16 = digits.as_str().parse().ok()?;
    u8::try_from(value)
        .ok()
        .filter(|v| (MIN_RATING..=MAX_RATING).contains(v))
}

/// Split a grape list on commas and semicolons, preserving document order
#[must_use]
pub fn normalize_grape_list(text: &str) -> Vec<String> {
    text.split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// First four-digit token in 1900–2099 found in a wine name
#[must_use]
pub fn derive_vintage(name: &str) -> Option<u16> {
    VINTAGE_RE
        .captures(name)
        .and_then(|caps| caps[1].parse().ok())
}

/// Parse an explicitly located vintage field
#[must_use]
pub fn normalize_year(text: &str) -> Option<u16> {
    derive_vintage(text)
}

/// First non-negative integer in the text, allowing thousands commas
///
/// Used for merchant counts ("23 stores") and search ranks ("#1,204").
#[must_use]
pub fn normalize_count(text: &str) -> Option<u32> {
    COUNT_RE
        .find(text)
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
}

/// Collapse whitespace; `None` when nothing is left
#[must_use]
pub fn normalize_text(text: &str) -> Option<String> {
    let collapsed = crate::document::collapse_whitespace(text);
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Interpret merchant stock text
#[must_use]
pub fn normalize_stock(text: &str) -> bool {
    let lower = text.to_lowercase();
    !(lower.contains("out of stock")
        || lower.contains("sold out")
        || lower.contains("unavailable")
        || lower.contains("pre-order"))
}
