//! Crawl driver
//!
//! Walks each start URL's frontier with one identity at a time. Owns the
//! policies the extraction core leaves to its caller: the per-URL retry
//! budget, identity rotation on block or quota, dwell between page loads and
//! the challenge backoff.

pub mod transport;

use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::classifier::PageType;
use crate::collaborators::{
    CrawlFrontier, DatasetSink, FrontierRequest, IdentityPool, MemoryFrontier, RetireReason,
    UsageDecision,
};
use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::session::{PageOutcome, SessionRunner};

pub use transport::{ChromeTransport, ChromeTransportFactory, PageTransport, TransportFactory};

/// Totals for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub pages: usize,
    pub records: usize,
    pub blocked: usize,
    pub challenged: usize,
    pub rotations: usize,
    pub retries: usize,
    /// URLs given up on after exhausting the retry budget
    pub abandoned: Vec<String>,
}

/// What to do with a request after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { attempt: u32 },
    Abandon,
    /// Failure that costs nothing, such as a retired identity
    RetryFree,
}

/// Charge `err` to a request that has failed `attempts` times already
#[must_use]
pub fn retry_decision(err: &ScrapeError, attempts: u32, max_retries: u32) -> RetryDecision {
    if !err.counts_against_retry_budget() {
        return RetryDecision::RetryFree;
    }
    let attempt = attempts + 1;
    if attempt > max_retries {
        RetryDecision::Abandon
    } else {
        RetryDecision::Retry { attempt }
    }
}

/// Why the identity behind `err` must be retired, if it must
#[must_use]
pub fn retire_reason(err: &ScrapeError) -> Option<RetireReason> {
    match err {
        ScrapeError::BlockDetected { signal, .. } | ScrapeError::ChallengeDetected { signal, .. } => {
            Some(RetireReason::Detected(signal.to_string()))
        }
        ScrapeError::IdentityRetired { identity } => Some(RetireReason::SessionFailed(format!(
            "{identity} used after retirement"
        ))),
        // A browser that errors outside navigation is not trusted again
        ScrapeError::Browser(reason) => Some(RetireReason::SessionFailed(reason.clone())),
        _ => None,
    }
}

struct ActiveIdentity<T> {
    identity: String,
    transport: T,
    runner: SessionRunner,
}

/// Drives identities, transports and the session core over every start URL
pub struct Crawler<F: TransportFactory, P: IdentityPool, S: DatasetSink> {
    config: ScrapeConfig,
    factory: F,
    pool: P,
    sink: S,
    active: Option<ActiveIdentity<F::Transport>>,
    summary: CrawlSummary,
}

impl<F: TransportFactory, P: IdentityPool, S: DatasetSink> Crawler<F, P, S> {
    pub fn new(config: ScrapeConfig, factory: F, pool: P, sink: S) -> Self {
        Self {
            config,
            factory,
            pool,
            sink,
            active: None,
            summary: CrawlSummary::default(),
        }
    }

    #[must_use]
    pub fn pool(&self) -> &P {
        &self.pool
    }

    #[must_use]
    pub fn summary(&self) -> &CrawlSummary {
        &self.summary
    }

    /// Hand back the sink, closing any open transport first
    pub async fn into_sink(mut self) -> S {
        self.release().await;
        self.sink
    }

    /// Crawl every start URL in order
    ///
    /// # Errors
    ///
    /// Returns an error only for failures that stop the whole run: an
    /// exhausted identity pool, a transport that cannot be opened, or a sink
    /// that rejects records. Per-URL failures are retried or abandoned.
    pub async fn run(&mut self) -> ScrapeResult<CrawlSummary> {
        let start_urls = self.config.start_urls().to_vec();
        let result = self.run_searches(&start_urls).await;

        let flushed = self.sink.flush().await;
        self.release().await;
        result?;
        flushed?;

        info!(
            "Crawl finished: {} pages, {} records, {} rotations, {} abandoned",
            self.summary.pages,
            self.summary.records,
            self.summary.rotations,
            self.summary.abandoned.len()
        );
        Ok(self.summary.clone())
    }

    async fn run_searches(&mut self, start_urls: &[Url]) -> ScrapeResult<()> {
        let context = self.config.extraction_options().context;
        for start in start_urls {
            info!("Starting search at {start}");
            if let Some(active) = self.active.as_mut() {
                active.runner.begin_search();
            }

            let mut frontier = MemoryFrontier::new();
            frontier.enqueue(FrontierRequest::new(
                start.clone(),
                PageType::SearchResults,
                context.clone(),
            ));
            self.drain(&mut frontier).await?;
        }
        Ok(())
    }

    async fn drain(&mut self, frontier: &mut MemoryFrontier) -> ScrapeResult<()> {
        // Cap progress survives identity rotation within one search
        let mut progress = 0;

        while let Some(request) = frontier.next_request() {
            self.ensure_active(progress).await?;
            let Some(active) = self.active.as_mut() else {
                break;
            };

            let requested = request.page_type;
            let loaded = active
                .transport
                .load(&request.url, active.runner.scheduler_mut())
                .await;
            self.summary.pages += 1;

            // The parsed document is dropped before the next await
            let processed = loaded.and_then(|snapshot| {
                let document = snapshot.document();
                active.runner.process_request(&document, requested)
            });
            progress = active.runner.search_progress();

            match processed {
                Ok(outcome) => {
                    self.accept(outcome, frontier).await?;
                    self.record_use().await;
                }
                Err(err) => self.handle_failure(err, request, frontier).await,
            }

            if frontier.pending() > 0
                && let Some(active) = self.active.as_mut()
            {
                let dwell = active.runner.dwell();
                debug!("Dwelling {:?} before next page", dwell);
                tokio::time::sleep(dwell).await;
            }
        }
        Ok(())
    }

    /// Push records and queue follow-ups
    async fn accept(
        &mut self,
        outcome: PageOutcome,
        frontier: &mut MemoryFrontier,
    ) -> ScrapeResult<()> {
        for request in outcome.requests() {
            frontier.enqueue(request.clone());
        }

        let count = outcome.records.len();
        for record in outcome.records {
            self.sink.push(record).await?;
        }
        self.summary.records += count;

        info!(
            "{} ({}): {} records, {} queued",
            outcome.url,
            outcome.page_type,
            count,
            frontier.pending()
        );
        Ok(())
    }

    /// Count a successful document against the identity's quota
    async fn record_use(&mut self) {
        let Some(active) = self.active.as_ref() else {
            return;
        };
        match self.pool.record_use(&active.identity) {
            UsageDecision::Continue { uses } => {
                debug!("Identity {} has {} uses", active.identity, uses);
            }
            UsageDecision::Rotate { uses } => {
                info!("Rotating identity {} after {} uses", active.identity, uses);
                self.summary.rotations += 1;
                self.release().await;
            }
        }
    }

    async fn handle_failure(
        &mut self,
        err: ScrapeError,
        mut request: FrontierRequest,
        frontier: &mut MemoryFrontier,
    ) {
        warn!("{err}");
        match &err {
            ScrapeError::BlockDetected { .. } => self.summary.blocked += 1,
            ScrapeError::ChallengeDetected { .. } => self.summary.challenged += 1,
            _ => {}
        }

        if let Some(reason) = retire_reason(&err)
            && let Some(active) = self.active.as_ref()
        {
            self.pool.retire(&active.identity, &reason);
            self.summary.rotations += 1;
            self.release().await;
        }

        if matches!(err, ScrapeError::ChallengeDetected { .. }) {
            let backoff = self.config.challenge_backoff();
            info!("Backing off {:?} after challenge", backoff);
            tokio::time::sleep(backoff).await;
        }

        match retry_decision(&err, request.attempts, self.config.max_retries()) {
            RetryDecision::Retry { attempt } => {
                request.attempts = attempt;
                self.summary.retries += 1;
                frontier.requeue(request);
            }
            RetryDecision::RetryFree => frontier.requeue(request),
            RetryDecision::Abandon => {
                warn!(
                    "Giving up on {} after {} attempts",
                    request.url,
                    request.attempts + 1
                );
                self.summary.abandoned.push(request.url.to_string());
            }
        }
    }

    /// Make sure an identity with an open transport is ready
    async fn ensure_active(&mut self, progress: usize) -> ScrapeResult<()> {
        if self.active.is_some() {
            return Ok(());
        }

        let identity = self.pool.acquire()?;
        let transport = match self.factory.open(&identity).await {
            Ok(transport) => transport,
            Err(err) => {
                self.pool
                    .retire(&identity, &RetireReason::SessionFailed(err.to_string()));
                return Err(err);
            }
        };

        let mut runner = SessionRunner::from_config(identity.clone(), &self.config);
        runner.resume_search(progress);
        self.active = Some(ActiveIdentity {
            identity,
            transport,
            runner,
        });
        Ok(())
    }

    /// Close the active transport, if any
    async fn release(&mut self) {
        if let Some(active) = self.active.take() {
            debug!("Releasing identity {}", active.identity);
            active.transport.close().await;
        }
    }
}
