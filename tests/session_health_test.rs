//! Classification, session health and per-search caps through `SessionRunner`

use cellarscrape::{
    BlockSignal, ExtractionOptions, HealthSignal, HealthState, InteractionScheduler,
    PacingProfile, PageType, ScrapeError, SessionHealth, SessionRunner, check_health, classify,
};

mod common;

use common::{
    SEARCH_URL, blocked_page_html, challenge_page_html, detail_page_html, parse, search_page_html,
};

fn runner() -> SessionRunner {
    SessionRunner::new(
        "identity-test",
        InteractionScheduler::from_seed(42, PacingProfile::default()),
        ExtractionOptions::default(),
    )
}

#[test]
fn test_block_phrase_classifies_as_blocked() {
    let doc = parse(&blocked_page_html(), SEARCH_URL);
    let classification = classify(&doc);
    assert_eq!(classification.page_type, PageType::Blocked);
    assert_eq!(
        classification.signal,
        Some(BlockSignal::Phrase("Access Denied".into()))
    );
}

#[test]
fn test_challenge_outranks_listing_content() {
    let doc = parse(&challenge_page_html(), SEARCH_URL);
    let classification = classify(&doc);
    assert_eq!(classification.page_type, PageType::Challenged);
    assert!(matches!(
        classification.signal,
        Some(BlockSignal::ChallengeElement(ref evidence)) if evidence.contains("captcha-frame")
    ));
}

#[test]
fn test_blocked_page_is_an_error_not_an_empty_result() {
    let mut session = runner();
    let doc = parse(&blocked_page_html(), SEARCH_URL);

    let err = session.process(&doc).expect_err("block page must fail");
    assert!(matches!(err, ScrapeError::BlockDetected { .. }));
    assert!(session.is_retired());
}

#[test]
fn test_challenge_retires_identity() {
    let mut session = runner();
    let doc = parse(&challenge_page_html(), SEARCH_URL);

    let err = session.process(&doc).expect_err("challenge must fail");
    assert!(matches!(err, ScrapeError::ChallengeDetected { .. }));
    assert_eq!(session.health().state(), HealthState::Retired);
}

#[test]
fn test_retired_identity_never_recovers() {
    let mut session = runner();
    let _ = session.process(&parse(&blocked_page_html(), SEARCH_URL));
    assert!(session.is_retired());

    // A clean page afterwards is refused, not extracted
    let clean = parse(&search_page_html(3, None), SEARCH_URL);
    let err = session.process(&clean).expect_err("retired identity");
    assert!(matches!(err, ScrapeError::IdentityRetired { ref identity } if identity == "identity-test"));
    assert_eq!(session.health().state(), HealthState::Retired);
}

#[test]
fn test_health_state_is_monotonic() {
    let mut health = SessionHealth::new("identity-a");
    let clean = classify(&parse(&search_page_html(1, None), SEARCH_URL));
    let blocked = classify(&parse(&blocked_page_html(), SEARCH_URL));

    let t = check_health(&mut health, &clean, SEARCH_URL);
    assert!(!t.is_change());
    assert_eq!(health.state(), HealthState::Active);

    let suspicious = health.check_signal(HealthSignal::Soft("slow response".into()), SEARCH_URL);
    health.apply(&suspicious);
    assert_eq!(health.state(), HealthState::Suspected);

    let t = check_health(&mut health, &blocked, SEARCH_URL);
    assert!(t.retire);
    assert_eq!(health.state(), HealthState::Retired);

    // A stale clean transition computed earlier cannot move state back
    let stale = SessionHealth::new("identity-a").check(&clean, SEARCH_URL);
    health.apply(&stale);
    assert_eq!(health.state(), HealthState::Retired);
}

#[test]
fn test_cap_applies_across_pages_of_one_search() {
    let mut session = runner().with_max_records(Some(5));

    let first = session
        .process(&parse(&search_page_html(3, Some("?page=2")), SEARCH_URL))
        .expect("clean page");
    assert_eq!(first.records.len(), 3);
    assert!(first.next_page.is_some());

    let second_url = "https://www.example.com/find/margaux?page=2";
    let second = session
        .process(&parse(&search_page_html(3, Some("?page=3")), second_url))
        .expect("clean page");
    assert_eq!(second.records.len(), 2);
    assert!(second.next_page.is_none(), "cap reached, no more pages");
    assert_eq!(session.remaining(), Some(0));

    // A new search starts from an empty charge
    session.begin_search();
    assert_eq!(session.remaining(), Some(5));
}

#[test]
fn test_detail_pages_are_not_charged() {
    let mut session = runner().with_max_records(Some(1));
    let outcome = session
        .process(&parse(&detail_page_html(3), common::DETAIL_URL))
        .expect("clean page");
    assert_eq!(outcome.page_type, PageType::Detail);
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(session.remaining(), Some(1));
}
