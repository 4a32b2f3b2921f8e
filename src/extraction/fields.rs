//! Field layouts for each extractable page shape
//!
//! Each layout is a [`FieldSet`]: one ordered strategy list per product
//! field. Layouts are built once and shared; adding a fallback for a new
//! markup variant means appending a [`Strategy`] here, nothing else.

use std::sync::LazyLock;

use super::strategy::{FieldSpec, Strategy};

/// Strategy lists for every product field of one layout
#[derive(Debug, Clone)]
pub struct FieldSet {
    pub name: FieldSpec,
    pub producer: FieldSpec,
    pub region: FieldSpec,
    pub vintage: FieldSpec,
    pub rating: FieldSpec,
    pub price: FieldSpec,
    pub merchant_count: FieldSpec,
    pub url: FieldSpec,
    pub style: FieldSpec,
    pub grapes: FieldSpec,
    pub search_rank: FieldSpec,
}

// Body-text fallbacks shared by the card and detail layouts
const CRITIC_SCORE_PATTERN: &str = r"Critic Score[:\s]*(\d{2,3})";
const RATING_OUT_OF_100_PATTERN: &str = r"Rating[:\s]*(\d{2,3})\s*/\s*100";
const BARE_OUT_OF_100_PATTERN: &str = r"(\d{2,3})\s*/\s*100";
const STYLE_PATTERN: &str = r"Style[:\s]*((?:Red|White|Rosé|Rose|Sparkling|Dessert|Fortified)(?:\s*-\s*[A-Z][a-z]+(?:\s+(?:and|&)\s+[A-Za-z][a-z]+)*)?)";
const AVG_PRICE_PATTERN: &str = r"Avg\.?\s*Price[:\s]*([\$€£]?\s*\d[\d,]*(?:\.\d{2})?)";
const SEARCH_RANK_PATTERN: &str = r"Search Rank[:\s]*#?(\d[\d,]*)";
const MERCHANT_COUNT_PATTERN: &str = r"(\d[\d,]*)\s+(?:stores|merchants|offers|sellers)";
const GRAPES_PATTERN: &str = r"Grapes?[:\s]+([A-Za-zÀ-ÿ' ,;\-]+?)(?:\s+(?:Region|Style|Producer|Food|Alcohol)\b|$)";

/// Fields read from one search-result card
pub static SEARCH_CARD_FIELDS: LazyLock<FieldSet> = LazyLock::new(|| FieldSet {
    name: FieldSpec::new(
        "name",
        vec![
            Strategy::text("[data-testid='wine-name']"),
            Strategy::text(".wine-name"),
            Strategy::text("[class*='product-name']"),
            Strategy::text("a[href*='/find/']"),
            Strategy::text("h2"),
            Strategy::text("h3"),
        ],
    ),
    producer: FieldSpec::new(
        "producer",
        vec![
            Strategy::text("[data-testid='producer']"),
            Strategy::text("[class*='producer']"),
            Strategy::text("[class*='winery']"),
        ],
    ),
    region: FieldSpec::new(
        "region",
        vec![
            Strategy::text("[data-testid='appellation']"),
            Strategy::text("[class*='appellation']"),
            Strategy::text("[class*='region']"),
            Strategy::text("a[href*='/regions/']"),
        ],
    ),
    vintage: FieldSpec::new(
        "vintage",
        vec![
            Strategy::text("[data-testid='vintage']"),
            Strategy::text("[class*='vintage']"),
        ],
    ),
    rating: FieldSpec::new(
        "rating",
        vec![
            Strategy::text("[data-testid='rating']"),
            Strategy::text(".critic-score"),
            Strategy::text("[class*='rating']"),
            Strategy::text("[class*='score']"),
            Strategy::pattern(BARE_OUT_OF_100_PATTERN),
        ],
    ),
    price: FieldSpec::new(
        "price",
        vec![
            Strategy::text("[data-testid='price']"),
            Strategy::text(".average-price"),
            Strategy::text("[class*='price']"),
            Strategy::pattern(AVG_PRICE_PATTERN),
        ],
    ),
    merchant_count: FieldSpec::new(
        "merchant_count",
        vec![
            Strategy::text("[data-testid='merchant-count']"),
            Strategy::text("[class*='merchant-count']"),
            Strategy::text("[class*='offer-count']"),
            Strategy::pattern(MERCHANT_COUNT_PATTERN),
        ],
    ),
    url: FieldSpec::new(
        "url",
        vec![
            Strategy::attr("a[href*='/find/']", "href"),
            Strategy::attr("a[href]", "href"),
        ],
    ),
    style: FieldSpec::new(
        "style",
        vec![
            Strategy::text("[data-testid='style']"),
            Strategy::text(".wine-style"),
            Strategy::text("[class*='style']"),
        ],
    ),
    grapes: FieldSpec::new(
        "grapes",
        vec![
            Strategy::text("[data-testid='grapes']"),
            Strategy::text("[class*='grape']"),
        ],
    ),
    search_rank: FieldSpec::new(
        "search_rank",
        vec![
            Strategy::text("[data-testid='search-rank']"),
            Strategy::pattern(SEARCH_RANK_PATTERN),
        ],
    ),
});

/// Fields read from one row of a plain listing table
///
/// Tables carry no semantic classes on most variants, so positional cell
/// selectors back up the class-based ones.
pub static TABLE_ROW_FIELDS: LazyLock<FieldSet> = LazyLock::new(|| FieldSet {
    name: FieldSpec::new(
        "name",
        vec![
            Strategy::text("td[class*='name']"),
            Strategy::text("td a[href*='/find/']"),
            Strategy::text("td:first-child"),
        ],
    ),
    producer: FieldSpec::new("producer", vec![Strategy::text("td[class*='producer']")]),
    region: FieldSpec::new(
        "region",
        vec![
            Strategy::text("td[class*='region']"),
            Strategy::text("td[class*='appellation']"),
        ],
    ),
    vintage: FieldSpec::new("vintage", vec![Strategy::text("td[class*='vintage']")]),
    rating: FieldSpec::new(
        "rating",
        vec![
            Strategy::text("td[class*='rating']"),
            Strategy::text("td[class*='score']"),
        ],
    ),
    price: FieldSpec::new(
        "price",
        vec![
            Strategy::text("td[class*='price']"),
            Strategy::text("td:last-child"),
        ],
    ),
    merchant_count: FieldSpec::new(
        "merchant_count",
        vec![
            Strategy::text("td[class*='merchant']"),
            Strategy::text("td[class*='offers']"),
        ],
    ),
    url: FieldSpec::new(
        "url",
        vec![
            Strategy::attr("a[href*='/find/']", "href"),
            Strategy::attr("a[href]", "href"),
        ],
    ),
    style: FieldSpec::new("style", vec![Strategy::text("td[class*='style']")]),
    grapes: FieldSpec::new("grapes", vec![Strategy::text("td[class*='grape']")]),
    search_rank: FieldSpec::new("search_rank", vec![Strategy::text("td[class*='rank']")]),
});

/// Fields read from a whole detail page
pub static DETAIL_FIELDS: LazyLock<FieldSet> = LazyLock::new(|| FieldSet {
    name: FieldSpec::new(
        "name",
        vec![
            Strategy::text("h1.wine-name"),
            Strategy::text("h1[class*='wine']"),
            Strategy::text("h1"),
            Strategy::text(".wine-name"),
            Strategy::text("[data-testid='wine-name']"),
            Strategy::text(".header-name"),
        ],
    ),
    producer: FieldSpec::new(
        "producer",
        vec![
            Strategy::text("[data-testid='producer']"),
            Strategy::text("[class*='producer-name']"),
            Strategy::text("a[href*='/merchant/'][class*='producer']"),
            Strategy::text("[class*='winery']"),
        ],
    ),
    region: FieldSpec::new(
        "region",
        vec![
            Strategy::text("[class*='appellation']"),
            Strategy::text("[data-testid='appellation']"),
            Strategy::text(".wine-appellation"),
            Strategy::text("a[href*='/regions/']"),
        ],
    ),
    vintage: FieldSpec::new(
        "vintage",
        vec![
            Strategy::text("[data-testid='vintage']"),
            Strategy::text("select[name='vintage'] option[selected]"),
        ],
    ),
    rating: FieldSpec::new(
        "rating",
        vec![
            Strategy::text("[class*='rating']"),
            Strategy::text("[class*='score']"),
            Strategy::text(".critic-score"),
            Strategy::text("[data-testid='rating']"),
            Strategy::pattern(CRITIC_SCORE_PATTERN),
            Strategy::pattern(RATING_OUT_OF_100_PATTERN),
            Strategy::pattern(BARE_OUT_OF_100_PATTERN),
        ],
    ),
    price: FieldSpec::new(
        "price",
        vec![
            Strategy::text(".average-price"),
            Strategy::text("[data-testid='price']"),
            Strategy::text("[class*='avg']"),
            Strategy::pattern(AVG_PRICE_PATTERN),
            Strategy::text("[class*='price']"),
        ],
    ),
    merchant_count: FieldSpec::new(
        "merchant_count",
        vec![
            Strategy::text("[data-testid='merchant-count']"),
            Strategy::text("[class*='merchant-count']"),
            Strategy::pattern(MERCHANT_COUNT_PATTERN),
        ],
    ),
    url: FieldSpec::new(
        "url",
        vec![
            Strategy::attr("link[rel='canonical']", "href"),
            Strategy::attr("meta[property='og:url']", "content"),
        ],
    ),
    style: FieldSpec::new(
        "style",
        vec![
            Strategy::text("[class*='style']"),
            Strategy::text(".wine-style"),
            Strategy::text("[data-testid='style']"),
            Strategy::pattern(STYLE_PATTERN),
        ],
    ),
    grapes: FieldSpec::new(
        "grapes",
        vec![
            Strategy::text("[data-testid='grapes']"),
            Strategy::text("[class*='grape-variety']"),
            Strategy::text("[class*='grapes']"),
            Strategy::pattern(GRAPES_PATTERN),
        ],
    ),
    search_rank: FieldSpec::new(
        "search_rank",
        vec![
            Strategy::text("[data-testid='search-rank']"),
            Strategy::pattern(SEARCH_RANK_PATTERN),
        ],
    ),
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, HtmlDocument};
    use crate::extraction::strategy::extract;

    fn doc(body: &str) -> HtmlDocument {
        HtmlDocument::parse_with_url(
            &format!("<html><body>{body}</body></html>"),
            "https://www.example.com/find/margaux",
        )
        .expect("valid url")
    }

    #[test]
    fn all_layouts_build() {
        // Forces every hardcoded pattern to compile
        for set in [&*SEARCH_CARD_FIELDS, &*TABLE_ROW_FIELDS, &*DETAIL_FIELDS] {
            assert!(!set.name.strategies.is_empty());
            assert!(!set.url.strategies.is_empty());
        }
    }

    #[test]
    fn detail_rating_falls_back_to_body_text() {
        let d = doc("<h1>Chateau Margaux 2015</h1><p>Critic Score: 98 from 12 critics</p>");
        assert_eq!(extract(&d.root(), &DETAIL_FIELDS.rating).as_deref(), Some("98"));
    }

    #[test]
    fn detail_price_prefers_average_over_offer_prices() {
        let d = doc(
            r#"<span class="offer-price">$999</span><div class="average-price">$650</div>"#,
        );
        assert_eq!(extract(&d.root(), &DETAIL_FIELDS.price).as_deref(), Some("$650"));
    }

    #[test]
    fn detail_style_and_rank_from_text() {
        let d = doc("<p>Style: Red - Bold and Structured</p><p>Search Rank: #12</p>");
        assert_eq!(
            extract(&d.root(), &DETAIL_FIELDS.style).as_deref(),
            Some("Red - Bold and Structured")
        );
        assert_eq!(extract(&d.root(), &DETAIL_FIELDS.search_rank).as_deref(), Some("12"));
    }

    #[test]
    fn table_row_uses_positional_cells() {
        let d = doc(
            "<table><tr><td><a href='/find/x'>Opus One 2018</a></td><td>Napa</td><td>$420</td></tr></table>",
        );
        let row = d.select("tr").expect("valid")[0];
        assert_eq!(extract(&row, &TABLE_ROW_FIELDS.name).as_deref(), Some("Opus One 2018"));
        assert_eq!(extract(&row, &TABLE_ROW_FIELDS.price).as_deref(), Some("$420"));
        assert_eq!(extract(&row, &TABLE_ROW_FIELDS.url).as_deref(), Some("/find/x"));
    }
}
