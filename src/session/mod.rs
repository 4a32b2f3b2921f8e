//! One identity's linear pass over documents
//!
//! [`SessionRunner`] owns the session's health monitor and interaction
//! scheduler. For each rendered document it classifies, gates on health,
//! extracts, applies the per-search record cap and decides the follow-up
//! requests. Nothing is shared across sessions.

use std::time::Duration;

use rand::Rng;
use rand::rngs::StdRng;
use tracing::{debug, info};
use url::Url;

use crate::classifier::{PageType, classify};
use crate::collaborators::FrontierRequest;
use crate::config::ScrapeConfig;
use crate::document::Document;
use crate::error::ScrapeResult;
use crate::extraction::{ExtractionOptions, ProductRecord, extract_records_with};
use crate::health::{HealthState, SessionHealth, check_health};
use crate::pacing::InteractionScheduler;
use crate::pagination::{harvest_product_links, resolve_pagination};

/// What one document produced
#[derive(Debug, Clone)]
pub struct PageOutcome {
    pub url: Url,
    pub page_type: PageType,
    /// Records ready for the sink
    pub records: Vec<ProductRecord>,
    /// Next listing page, when the listing should continue
    pub next_page: Option<FrontierRequest>,
    /// Detail pages to visit
    pub follow: Vec<FrontierRequest>,
}

impl PageOutcome {
    /// Every follow-up request, next page last
    pub fn requests(&self) -> impl Iterator<Item = &FrontierRequest> {
        self.follow.iter().chain(self.next_page.iter())
    }
}

/// Per-identity document processor
pub struct SessionRunner<R: Rng = StdRng> {
    health: SessionHealth,
    scheduler: InteractionScheduler<R>,
    options: ExtractionOptions,
    max_records: Option<usize>,
    charged: usize,
    follow_details: bool,
}

impl SessionRunner<StdRng> {
    /// Runner for `identity` configured from `config`
    #[must_use]
    pub fn from_config(identity: impl Into<String>, config: &ScrapeConfig) -> Self {
        let scheduler = match config.seed() {
            Some(seed) => InteractionScheduler::from_seed(seed, *config.pacing()),
            None => InteractionScheduler::from_entropy(*config.pacing()),
        };
        Self::new(identity, scheduler, config.extraction_options())
            .with_max_records(config.max_records_per_search())
            .with_follow_details(config.follow_details())
    }
}

impl<R: Rng> SessionRunner<R> {
    pub fn new(
        identity: impl Into<String>,
        scheduler: InteractionScheduler<R>,
        options: ExtractionOptions,
    ) -> Self {
        Self {
            health: SessionHealth::new(identity),
            scheduler,
            options,
            max_records: None,
            charged: 0,
            follow_details: false,
        }
    }

    /// Cap on records (or detail requests) per search
    #[must_use]
    pub fn with_max_records(mut self, max: Option<usize>) -> Self {
        self.max_records = max;
        self
    }

    /// Turn search result cards, or the product links of a listing page with
    /// no card layout, into detail-page requests
    #[must_use]
    pub fn with_follow_details(mut self, follow: bool) -> Self {
        self.follow_details = follow;
        self
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        self.health.identity()
    }

    #[must_use]
    pub fn health(&self) -> &SessionHealth {
        &self.health
    }

    #[must_use]
    pub fn is_retired(&self) -> bool {
        self.health.state() == HealthState::Retired
    }

    pub fn scheduler_mut(&mut self) -> &mut InteractionScheduler<R> {
        &mut self.scheduler
    }

    /// Pause to take before the next page load
    pub fn dwell(&mut self) -> Duration {
        self.scheduler.page_dwell()
    }

    /// Start a new search; resets the record cap
    pub fn begin_search(&mut self) {
        self.charged = 0;
    }

    /// Items charged against the cap in the current search
    #[must_use]
    pub fn search_progress(&self) -> usize {
        self.charged
    }

    /// Continue a search started by a retired identity
    pub fn resume_search(&mut self, charged: usize) {
        self.charged = charged;
    }

    /// Items still allowed under the cap
    #[must_use]
    pub fn remaining(&self) -> Option<usize> {
        self.max_records.map(|max| max.saturating_sub(self.charged))
    }

    /// Process one rendered document fetched as a listing page
    ///
    /// # Errors
    ///
    /// See [`process_request`](Self::process_request).
    pub fn process<D: Document>(&mut self, document: &D) -> ScrapeResult<PageOutcome> {
        self.process_request(document, PageType::SearchResults)
    }

    /// Process one rendered document fetched as `requested`
    ///
    /// A listing request that lands on a page without cards or table rows is
    /// treated as a hub: with detail following on, its product links become
    /// detail requests instead of records.
    ///
    /// # Errors
    ///
    /// Returns [`BlockDetected`](crate::ScrapeError::BlockDetected) or
    /// [`ChallengeDetected`](crate::ScrapeError::ChallengeDetected) for
    /// adversarial pages, and
    /// [`IdentityRetired`](crate::ScrapeError::IdentityRetired) for any
    /// document processed after the identity was retired.
    pub fn process_request<D: Document>(
        &mut self,
        document: &D,
        requested: PageType,
    ) -> ScrapeResult<PageOutcome> {
        let url = document.url().clone();
        let classification = classify(document);
        check_health(&mut self.health, &classification, url.as_str()).into_result()?;

        let page_type = classification.page_type;
        let mut records = extract_records_with(document, page_type, &self.options);
        let mut follow = Vec::new();

        let next_page = match page_type {
            PageType::SearchResults | PageType::TabularFallback => {
                let found = records.len();
                let allowed = self.charge(found);
                records.truncate(allowed);

                if self.follow_details {
                    let (linked, cards): (Vec<_>, Vec<_>) = records
                        .into_iter()
                        .partition(|r| r.url().is_some_and(|u| u != &url));
                    follow = linked
                        .iter()
                        .filter_map(ProductRecord::url)
                        .map(|u| {
                            FrontierRequest::new(
                                u.clone(),
                                PageType::Detail,
                                self.options.context.clone(),
                            )
                        })
                        .collect();
                    records = cards;
                }

                if self.remaining() == Some(0) {
                    info!(%url, charged = self.charged, "record cap reached, not paginating");
                    None
                } else {
                    resolve_pagination(document, found).map(|next| {
                        FrontierRequest::new(next, page_type, self.options.context.clone())
                    })
                }
            }
            PageType::Detail | PageType::Unknown
                if self.follow_details
                    && matches!(requested, PageType::SearchResults | PageType::TabularFallback) =>
            {
                let mut links = harvest_product_links(document);
                if !links.is_empty() {
                    let allowed = self.charge(links.len());
                    links.truncate(allowed);
                    debug!(%url, dropped = records.len(), "hub page, following product links");
                    records.clear();
                    follow = links
                        .into_iter()
                        .map(|u| {
                            FrontierRequest::new(u, PageType::Detail, self.options.context.clone())
                        })
                        .collect();
                }
                None
            }
            PageType::Detail | PageType::Unknown => None,
            // Rejected by the health gate above
            PageType::Blocked | PageType::Challenged => None,
        };

        debug!(
            %url,
            %page_type,
            records = records.len(),
            follow = follow.len(),
            next = next_page.is_some(),
            "processed document"
        );

        Ok(PageOutcome {
            url,
            page_type,
            records,
            next_page,
            follow,
        })
    }

    /// Charge up to `items` against the cap, returning how many fit
    fn charge(&mut self, items: usize) -> usize {
        let allowed = self.remaining().map_or(items, |left| items.min(left));
        self.charged += allowed;
        allowed
    }
}
