//! Property tests for text normalization

use cellarscrape::normalize::{
    Currency, MAX_RATING, MAX_VINTAGE, MIN_RATING, MIN_VINTAGE, derive_vintage, normalize_price,
    normalize_rating,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_euro_symbol_always_wins(amount in 0u32..100_000, prefix in "[ $£A-Za-z]{0,4}") {
        let text = format!("{prefix}€{amount}");
        let quote = normalize_price(&text).expect("digits present");
        prop_assert_eq!(quote.currency, Currency::Eur);
    }

    #[test]
    fn test_pound_without_euro_is_gbp(amount in 0u32..100_000) {
        let quote = normalize_price(&format!("£{amount}")).expect("digits present");
        prop_assert_eq!(quote.currency, Currency::Gbp);
    }

    #[test]
    fn test_no_symbol_defaults_to_usd(whole in 0u32..10_000, cents in 0u32..100) {
        let quote = normalize_price(&format!("{whole}.{cents:02}")).expect("digits present");
        prop_assert_eq!(quote.currency, Currency::Usd);
        let expected = f64::from(whole) + f64::from(cents) / 100.0;
        prop_assert!((quote.amount - expected).abs() < 1e-6);
    }

    #[test]
    fn test_prices_are_finite_and_non_negative(text in "\\PC{0,24}") {
        if let Some(quote) = normalize_price(&text) {
            prop_assert!(quote.amount.is_finite());
            prop_assert!(quote.amount >= 0.0);
        }
    }

    #[test]
    fn test_rating_is_in_range_or_absent(text in "\\PC{0,16}") {
        if let Some(rating) = normalize_rating(&text) {
            prop_assert!((MIN_RATING..=MAX_RATING).contains(&rating));
        }
    }

    #[test]
    fn test_scores_in_range_are_kept(score in 50u8..=100) {
        prop_assert_eq!(normalize_rating(&format!("{score} pts")), Some(score));
    }

    #[test]
    fn test_derived_vintage_is_in_range(name in "[A-Za-z ]{0,12}[0-9]{0,6}[A-Za-z ]{0,12}") {
        if let Some(year) = derive_vintage(&name) {
            prop_assert!((MIN_VINTAGE..=MAX_VINTAGE).contains(&year));
        }
    }

    #[test]
    fn test_vintage_found_in_name(year in 1900u16..=2099, producer in "[A-Z][a-z]{2,10}") {
        prop_assert_eq!(derive_vintage(&format!("{producer} Reserve {year}")), Some(year));
    }
}
