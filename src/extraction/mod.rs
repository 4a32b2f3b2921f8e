//! Resilient field extraction
//!
//! - [`strategy`]: the ordered-fallback engine
//! - [`fields`]: per-layout strategy lists
//! - [`merchants`]: merchant offers and aggregate pricing
//! - [`records`]: product record assembly

pub mod fields;
pub mod merchants;
pub mod records;
pub mod strategy;

pub use fields::{DETAIL_FIELDS, FieldSet, SEARCH_CARD_FIELDS, TABLE_ROW_FIELDS};
pub use merchants::{AggregatePricing, MAX_OFFERS, MerchantOffer, extract_offers};
pub use records::{
    ExtractionOptions, ProductRecord, RecordContext, extract_records, extract_records_with,
};
pub use strategy::{
    Accessor, ExtractionAttempt, FieldSpec, Locator, Strategy, extract, extract_traced,
};
