pub mod browser;
pub mod classifier;
pub mod collaborators;
pub mod config;
pub mod crawl;
pub mod document;
pub mod error;
pub mod extraction;
pub mod health;
pub mod normalize;
pub mod pacing;
pub mod pagination;
pub mod session;
pub mod utils;

pub use browser::{BrowserSession, PageSnapshot, find_browser_executable, launch_browser};
pub use classifier::{Classification, PageType, classify};
pub use collaborators::{
    CrawlFrontier, DatasetSink, FrontierRequest, IdentityPool, InMemoryIdentityPool,
    JsonLinesSink, MemoryFrontier, MemorySink, RetireReason, UsageDecision,
};
pub use config::ScrapeConfig;
pub use crawl::{ChromeTransportFactory, CrawlSummary, Crawler, PageTransport, TransportFactory};
pub use document::{Document, Element, HtmlDocument};
pub use error::{BlockSignal, FieldError, ScrapeError, ScrapeResult};
pub use extraction::{
    AggregatePricing, ExtractionOptions, MerchantOffer, ProductRecord, RecordContext,
    extract_records, extract_records_with,
};
pub use health::{HealthSignal, HealthState, SessionHealth, SessionHealthTransition, check_health};
pub use normalize::{Currency, PriceQuote};
pub use pacing::{DelayProfile, InteractionScheduler, PacingProfile, Viewport};
pub use pagination::resolve_pagination;
pub use session::{PageOutcome, SessionRunner};

/// Crawl every start URL in `config` with Chrome, appending records to the
/// configured JSON lines file
///
/// # Errors
///
/// Returns an error if the output file cannot be opened or the run stops on
/// an unrecoverable failure.
pub async fn crawl(config: ScrapeConfig) -> ScrapeResult<CrawlSummary> {
    let sink = JsonLinesSink::open(config.output_path()).await?;
    let pool = InMemoryIdentityPool::new(config.pool_max_size(), config.identity_max_uses());
    let factory = ChromeTransportFactory::new(config.clone());

    let mut crawler = Crawler::new(config, factory, pool, sink);
    crawler.run().await
}
