//! Product record assembly
//!
//! Raw field values from a [`FieldSet`] are normalized into a
//! [`ProductRecord`]. A candidate without a name is dropped; every other
//! field is independently optional.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;

use super::fields::{DETAIL_FIELDS, FieldSet, SEARCH_CARD_FIELDS, TABLE_ROW_FIELDS};
use super::merchants::{AggregatePricing, MerchantOffer, extract_offers};
use super::strategy::extract;
use crate::classifier::{CARD_SELECTORS, PageType, data_rows};
use crate::document::{Document, Element};
use crate::normalize::{
    PriceQuote, derive_vintage, normalize_count, normalize_grape_list, normalize_price,
    normalize_rating, normalize_year,
};

/// Context tags attached to every record of a crawl
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordContext {
    /// Country the listing was searched from
    pub country: Option<String>,
    /// Currency the listing was requested in
    pub currency: Option<String>,
}

/// Knobs for [`extract_records_with`]
#[derive(Debug, Clone)]
pub struct ExtractionOptions {
    pub context: RecordContext,
    /// Keep only records of this vintage; records with no known vintage are
    /// dropped too
    pub target_vintage: Option<u16>,
    /// Keep analytics fields such as the search rank
    pub include_analytics: bool,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            context: RecordContext::default(),
            target_vintage: None,
            include_analytics: true,
        }
    }
}

/// One structured product entry
///
/// Immutable once assembled; read through the accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    name: String,
    producer: Option<String>,
    region: Option<String>,
    vintage: Option<u16>,
    rating: Option<u8>,
    price: Option<PriceQuote>,
    merchant_count: Option<u32>,
    url: Option<Url>,
    style: Option<String>,
    grapes: Vec<String>,
    search_rank: Option<u32>,
    offers: Vec<MerchantOffer>,
    pricing: Option<AggregatePricing>,
    context: RecordContext,
    scraped_at: DateTime<Utc>,
}

impl ProductRecord {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn producer(&self) -> Option<&str> {
        self.producer.as_deref()
    }

    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    #[must_use]
    pub fn vintage(&self) -> Option<u16> {
        self.vintage
    }

    #[must_use]
    pub fn rating(&self) -> Option<u8> {
        self.rating
    }

    #[must_use]
    pub fn price(&self) -> Option<PriceQuote> {
        self.price
    }

    #[must_use]
    pub fn merchant_count(&self) -> Option<u32> {
        self.merchant_count
    }

    /// Canonical URL of the product
    #[must_use]
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    #[must_use]
    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    #[must_use]
    pub fn grapes(&self) -> &[String] {
        &self.grapes
    }

    #[must_use]
    pub fn search_rank(&self) -> Option<u32> {
        self.search_rank
    }

    /// At most ten offers, in document order
    #[must_use]
    pub fn offers(&self) -> &[MerchantOffer] {
        &self.offers
    }

    #[must_use]
    pub fn pricing(&self) -> Option<AggregatePricing> {
        self.pricing
    }

    #[must_use]
    pub fn context(&self) -> &RecordContext {
        &self.context
    }

    #[must_use]
    pub fn scraped_at(&self) -> DateTime<Utc> {
        self.scraped_at
    }
}

/// Extract every record from a classified document with default options
pub fn extract_records<D: Document>(document: &D, page_type: PageType) -> Vec<ProductRecord> {
    extract_records_with(document, page_type, &ExtractionOptions::default())
}

/// Extract every record from a classified document
///
/// Returns an empty list for pages that carry no extractable layout.
pub fn extract_records_with<D: Document>(
    document: &D,
    page_type: PageType,
    options: &ExtractionOptions,
) -> Vec<ProductRecord> {
    let records: Vec<ProductRecord> = match page_type {
        PageType::SearchResults => search_cards(document)
            .iter()
            .filter_map(|card| assemble(card, &SEARCH_CARD_FIELDS, document, None, options))
            .map(RecordDraft::finish)
            .collect(),
        PageType::TabularFallback => data_rows(document)
            .iter()
            .filter_map(|row| assemble(row, &TABLE_ROW_FIELDS, document, None, options))
            .map(RecordDraft::finish)
            .collect(),
        PageType::Detail => {
            let root = document.root();
            // A detail page is its own canonical URL unless it declares one
            assemble(&root, &DETAIL_FIELDS, document, Some(document.url()), options)
                .map(|draft| {
                    let offers = extract_offers(document);
                    draft.with_offers(offers).finish()
                })
                .into_iter()
                .collect()
        }
        PageType::Blocked | PageType::Challenged | PageType::Unknown => Vec::new(),
    };

    let before = records.len();
    let records: Vec<ProductRecord> = records
        .into_iter()
        .filter(|r| options.target_vintage.is_none_or(|v| r.vintage == Some(v)))
        .collect();
    if records.len() < before {
        debug!(
            dropped = before - records.len(),
            target = ?options.target_vintage,
            "vintage filter dropped records"
        );
    }

    debug!(
        url = %document.url(),
        %page_type,
        count = records.len(),
        "extracted records"
    );
    records
}

/// Card containers matched by the first card selector that matches anything
fn search_cards<D: Document>(document: &D) -> Vec<D::Element<'_>> {
    CARD_SELECTORS
        .iter()
        .find_map(|selector| document.select(selector).ok().filter(|cards| !cards.is_empty()))
        .unwrap_or_default()
}

/// A record whose fields are all decided, minus the offer list
struct RecordDraft {
    record: ProductRecord,
}

impl RecordDraft {
    fn with_offers(mut self, offers: Vec<MerchantOffer>) -> Self {
        self.record.pricing = AggregatePricing::from_offers(&offers);
        self.record.offers = offers;
        self
    }

    fn finish(self) -> ProductRecord {
        self.record
    }
}

fn assemble<D: Document, E: Element>(
    scope: &E,
    fields: &FieldSet,
    document: &D,
    fallback_url: Option<&Url>,
    options: &ExtractionOptions,
) -> Option<RecordDraft> {
    let Some(name) = extract(scope, &fields.name) else {
        trace!(url = %document.url(), "dropping candidate without a name");
        return None;
    };

    let vintage = extract(scope, &fields.vintage)
        .as_deref()
        .and_then(normalize_year)
        .or_else(|| derive_vintage(&name));

    let url = match extract(scope, &fields.url) {
        Some(href) => document.resolve_url(&href),
        None => fallback_url.cloned(),
    };

    let search_rank = if options.include_analytics {
        extract(scope, &fields.search_rank)
            .as_deref()
            .and_then(normalize_count)
            .filter(|rank| *rank > 0)
    } else {
        None
    };

    let record = ProductRecord {
        producer: extract(scope, &fields.producer),
        region: extract(scope, &fields.region),
        vintage,
        rating: extract(scope, &fields.rating).as_deref().and_then(normalize_rating),
        price: extract(scope, &fields.price).as_deref().and_then(normalize_price),
        merchant_count: extract(scope, &fields.merchant_count)
            .as_deref()
            .and_then(normalize_count),
        url,
        style: extract(scope, &fields.style),
        grapes: extract(scope, &fields.grapes)
            .as_deref()
            .map(normalize_grape_list)
            .unwrap_or_default(),
        search_rank,
        offers: Vec::new(),
        pricing: None,
        context: options.context.clone(),
        scraped_at: Utc::now(),
        name,
    };

    Some(RecordDraft { record })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HtmlDocument;
    use crate::normalize::Currency;

    fn doc(body: &str) -> HtmlDocument {
        HtmlDocument::parse_with_url(
            &format!("<html><head><title>Wines</title></head><body>{body}</body></html>"),
            "https://www.example.com/find/margaux",
        )
        .expect("valid url")
    }

    #[test]
    fn card_without_name_is_dropped() {
        let d = doc(
            r#"<div class="wine-card"><span class="wine-name">Opus One 2018</span><span class="price">$420</span></div>
               <div class="wine-card"><span class="price">$30</span></div>"#,
        );
        let records = extract_records(&d, PageType::SearchResults);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name(), "Opus One 2018");
        assert_eq!(records[0].vintage(), Some(2018));
    }

    #[test]
    fn name_only_record_is_valid() {
        let d = doc(r#"<div class="wine-card"><h3>House Red</h3></div>"#);
        let records = extract_records(&d, PageType::SearchResults);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.name(), "House Red");
        assert_eq!(r.vintage(), None);
        assert_eq!(r.rating(), None);
        assert_eq!(r.price(), None);
        assert_eq!(r.url(), None);
        assert!(r.grapes().is_empty());
    }

    #[test]
    fn card_links_resolve_against_document() {
        let d = doc(
            r#"<div class="wine-card"><a href="/find/opus+one/2018">Opus One 2018</a></div>"#,
        );
        let records = extract_records(&d, PageType::SearchResults);
        assert_eq!(
            records[0].url().map(Url::as_str),
            Some("https://www.example.com/find/opus+one/2018")
        );
    }

    #[test]
    fn detail_page_record() {
        let d = doc(
            r#"<h1 class="wine-name">Chateau Margaux 2015</h1>
               <div class="wine-appellation">Margaux, Bordeaux</div>
               <p>Critic Score: 98</p>
               <div class="average-price">€650,00</div>
               <div data-testid="grapes">Cabernet Sauvignon; Merlot</div>
               <p>Search Rank: #3</p>"#,
        );
        let records = extract_records(&d, PageType::Detail);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.vintage(), Some(2015));
        assert_eq!(r.region(), Some("Margaux, Bordeaux"));
        assert_eq!(r.rating(), Some(98));
        assert_eq!(r.price().map(|p| p.currency), Some(Currency::Eur));
        assert_eq!(r.grapes(), ["Cabernet Sauvignon", "Merlot"]);
        assert_eq!(r.search_rank(), Some(3));
        assert_eq!(r.url().map(Url::as_str), Some("https://www.example.com/find/margaux"));
        assert!(r.offers().is_empty());
        assert_eq!(r.pricing(), None);
    }

    #[test]
    fn analytics_can_be_disabled() {
        let d = doc("<h1>Chateau Margaux 2015</h1><p>Search Rank: #3</p>");
        let options = ExtractionOptions {
            include_analytics: false,
            ..ExtractionOptions::default()
        };
        let records = extract_records_with(&d, PageType::Detail, &options);
        assert_eq!(records[0].search_rank(), None);
    }

    #[test]
    fn vintage_filter() {
        let d = doc(
            r#"<div class="wine-card"><h3>Opus One 2018</h3></div>
               <div class="wine-card"><h3>Opus One 2019</h3></div>
               <div class="wine-card"><h3>Opus One NV</h3></div>"#,
        );
        let options = ExtractionOptions {
            target_vintage: Some(2019),
            ..ExtractionOptions::default()
        };
        let records = extract_records_with(&d, PageType::SearchResults, &options);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name(), "Opus One 2019");
    }

    #[test]
    fn context_tags_are_attached() {
        let d = doc(r#"<div class="wine-card"><h3>House Red</h3></div>"#);
        let options = ExtractionOptions {
            context: RecordContext {
                country: Some("usa".into()),
                currency: Some("USD".into()),
            },
            ..ExtractionOptions::default()
        };
        let records = extract_records_with(&d, PageType::SearchResults, &options);
        assert_eq!(records[0].context().country.as_deref(), Some("usa"));
    }

    #[test]
    fn adversarial_and_unknown_pages_yield_nothing() {
        let d = doc(r#"<div class="wine-card"><h3>House Red</h3></div>"#);
        for page_type in [PageType::Blocked, PageType::Challenged, PageType::Unknown] {
            assert!(extract_records(&d, page_type).is_empty());
        }
    }
}
