//! Merchant offers listed on a detail page
//!
//! Only the earliest [`MAX_OFFERS`] offers in document order are kept.
//! [`AggregatePricing`] is computed from exactly those.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::strategy::{FieldSpec, Strategy, extract};
use crate::document::{Document, Element};
use crate::normalize::{Currency, PriceQuote, normalize_price, normalize_stock};

/// Offers retained per detail record
pub const MAX_OFFERS: usize = 10;

/// Container locators for one offer, probed in order; the first that matches
/// anything defines the offer rows
pub const OFFER_ROW_SELECTORS: &[&str] = &[
    "[data-testid='offer-row']",
    ".offer-card",
    "[class*='merchant-row']",
    "[class*='offer-row']",
    "tr.merchant",
];

/// One merchant listing for a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantOffer {
    pub name: Option<String>,
    pub price: Option<PriceQuote>,
    pub location: Option<String>,
    pub in_stock: bool,
    pub offer_type: Option<String>,
}

/// Min, max and mean over the retained offers' prices
///
/// Only offers quoted in the first priced offer's currency are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatePricing {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    /// Currency of the first priced offer
    pub currency: Currency,
    /// Number of offers that contributed a price
    pub priced_offers: usize,
    /// Priced offers left out because they were quoted in another currency
    #[serde(default)]
    pub skipped_offers: usize,
}

impl AggregatePricing {
    /// Aggregate over `offers`; `None` when no offer carries a price
    #[must_use]
    pub fn from_offers(offers: &[MerchantOffer]) -> Option<Self> {
        let quotes: Vec<PriceQuote> = offers.iter().filter_map(|o| o.price).collect();
        let currency = quotes.first()?.currency;
        let (same, other): (Vec<PriceQuote>, Vec<PriceQuote>) =
            quotes.into_iter().partition(|q| q.currency == currency);

        if !other.is_empty() {
            debug!(
                %currency,
                skipped = other.len(),
                "left mixed-currency offers out of pricing"
            );
        }

        let (min, max, sum) = same.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), q| (min.min(q.amount), max.max(q.amount), sum + q.amount),
        );

        #[allow(clippy::cast_precision_loss)]
        let avg = sum / same.len() as f64;

        Some(Self {
            min,
            max,
            avg,
            currency,
            priced_offers: same.len(),
            skipped_offers: other.len(),
        })
    }
}

struct OfferFields {
    name: FieldSpec,
    price: FieldSpec,
    location: FieldSpec,
    stock: FieldSpec,
    offer_type: FieldSpec,
}

static OFFER_FIELDS: LazyLock<OfferFields> = LazyLock::new(|| OfferFields {
    name: FieldSpec::new(
        "offer.name",
        vec![
            Strategy::text("[data-testid='merchant-name']"),
            Strategy::text(".merchant-name"),
            Strategy::text("[class*='merchant-name']"),
            Strategy::text("a[href*='/merchant/']"),
        ],
    ),
    price: FieldSpec::new(
        "offer.price",
        vec![
            Strategy::text("[data-testid='offer-price']"),
            Strategy::text("[class*='price']"),
        ],
    ),
    location: FieldSpec::new(
        "offer.location",
        vec![
            Strategy::text("[data-testid='merchant-location']"),
            Strategy::text("[class*='location']"),
            Strategy::text("[class*='country']"),
        ],
    ),
    stock: FieldSpec::new(
        "offer.stock",
        vec![
            Strategy::text("[data-testid='stock']"),
            Strategy::text("[class*='stock']"),
            Strategy::text("[class*='availability']"),
        ],
    ),
    offer_type: FieldSpec::new(
        "offer.type",
        vec![
            Strategy::text("[data-testid='offer-type']"),
            Strategy::text("[class*='offer-type']"),
            Strategy::text("[class*='bottle-size']"),
        ],
    ),
});

/// Read up to [`MAX_OFFERS`] merchant offers from `document`
pub fn extract_offers<D: Document>(document: &D) -> Vec<MerchantOffer> {
    let rows = offer_rows(document);
    let total = rows.len();

    let offers: Vec<MerchantOffer> = rows.iter().take(MAX_OFFERS).map(read_offer).collect();

    if total > MAX_OFFERS {
        debug!(total, kept = MAX_OFFERS, "truncated merchant offers");
    }
    offers
}

fn offer_rows<D: Document>(document: &D) -> Vec<D::Element<'_>> {
    for locator in OFFER_ROW_SELECTORS {
        match document.select(locator) {
            Ok(rows) if !rows.is_empty() => return rows,
            Ok(_) => {}
            Err(e) => debug!(locator, error = %e, "skipping offer row locator"),
        }
    }
    Vec::new()
}

fn read_offer<E: Element>(row: &E) -> MerchantOffer {
    let fields = &*OFFER_FIELDS;
    MerchantOffer {
        name: extract(row, &fields.name),
        price: extract(row, &fields.price).as_deref().and_then(normalize_price),
        location: extract(row, &fields.location),
        // No stock marker means the listing is live
        in_stock: extract(row, &fields.stock)
            .as_deref()
            .is_none_or(normalize_stock),
        offer_type: extract(row, &fields.offer_type),
    }
}
