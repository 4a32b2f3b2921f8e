//! Page loading seam between the crawl driver and a browser

use std::future::Future;

use url::Url;

use crate::browser::{BrowserSession, PageSnapshot};
use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::pacing::InteractionScheduler;

/// Loads pages for one identity
pub trait PageTransport {
    /// Load `url` and return the rendered page
    ///
    /// Soft failures such as missing content are logged, not returned.
    fn load(
        &mut self,
        url: &Url,
        scheduler: &mut InteractionScheduler,
    ) -> impl Future<Output = ScrapeResult<PageSnapshot>>;

    /// Release the identity's browser resources
    fn close(self) -> impl Future<Output = ()>;
}

/// Opens a transport for a freshly acquired identity
pub trait TransportFactory {
    type Transport: PageTransport;

    fn open(&self, identity: &str) -> impl Future<Output = ScrapeResult<Self::Transport>>;
}

/// Opens one Chrome per identity
pub struct ChromeTransportFactory {
    config: ScrapeConfig,
}

impl ChromeTransportFactory {
    #[must_use]
    pub fn new(config: ScrapeConfig) -> Self {
        Self { config }
    }
}

impl TransportFactory for ChromeTransportFactory {
    type Transport = ChromeTransport;

    async fn open(&self, identity: &str) -> ScrapeResult<ChromeTransport> {
        let session = BrowserSession::open(identity, &self.config).await?;
        Ok(ChromeTransport {
            session,
            simulate_interaction: self.config.simulate_interaction(),
            reveal_analytics: self.config.include_analytics(),
        })
    }
}

/// [`BrowserSession`] driven as a [`PageTransport`]
pub struct ChromeTransport {
    session: BrowserSession,
    simulate_interaction: bool,
    reveal_analytics: bool,
}

impl PageTransport for ChromeTransport {
    async fn load(
        &mut self,
        url: &Url,
        scheduler: &mut InteractionScheduler,
    ) -> ScrapeResult<PageSnapshot> {
        self.session.navigate(url).await?;

        match self.session.wait_for_content(url).await {
            Ok(()) => {}
            Err(err @ ScrapeError::SelectorWaitTimeout { .. }) => {
                tracing::warn!("{err}; reading the page as rendered");
            }
            Err(err) => return Err(err),
        }

        if self.simulate_interaction
            && let Err(e) = self.session.simulate_reading(scheduler).await
        {
            tracing::warn!("Interaction replay failed on {url}: {e}");
        }

        if self.reveal_analytics {
            match self.session.reveal_analytics(url).await {
                Ok(_) => {}
                Err(err @ ScrapeError::SelectorWaitTimeout { .. }) => {
                    tracing::warn!("{err}; reading the page without analytics");
                }
                Err(e) => tracing::warn!("Analytics tab failed on {url}: {e}"),
            }
        }

        self.session.snapshot(url).await
    }

    async fn close(self) {
        self.session.close().await;
    }
}
