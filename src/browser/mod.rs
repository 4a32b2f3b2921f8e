//! Browser transport for one identity
//!
//! A [`BrowserSession`] is one Chrome process with its own throwaway
//! profile, one page with the stealth profile injected, and the timeouts
//! from [`ScrapeConfig`]. Rendered pages come back as [`PageSnapshot`]s
//! that parse into [`HtmlDocument`]s.

pub mod interact;
pub mod launch;
pub mod stealth;
pub mod timeout;

use std::time::{Duration, Instant};

use anyhow::Context;
use chromiumoxide::{Browser, Page, cdp};
use rand::Rng;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ScrapeConfig;
use crate::document::HtmlDocument;
use crate::error::{ScrapeError, ScrapeResult};
use crate::pacing::{InteractionScheduler, Viewport};

pub use launch::{download_managed_browser, find_browser_executable, launch_browser};
pub use stealth::StealthProfile;
pub use timeout::with_page_timeout;

const STEALTH_TIMEOUT_SECS: u64 = 10;
const SNAPSHOT_TIMEOUT_SECS: u64 = 15;
const CONTENT_POLL_INTERVAL: Duration = Duration::from_millis(200);
const ANALYTICS_WAIT: Duration = Duration::from_secs(2);

/// Tab that loads a product's analytics panel, where the search rank lives
pub const ANALYTICS_TAB_SELECTOR: &str = "a[href*='analytics'], [data-tab='analytics']";

const ANALYTICS_READY_JS: &str = "Boolean(document.querySelector(\"[data-testid='search-rank']\")) \
    || (document.body ? document.body.innerText : '').includes('Search Rank')";

/// Rendered HTML and the URL it ended up at
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub url: Url,
    pub html: String,
}

impl PageSnapshot {
    /// Parse into a queryable document
    #[must_use]
    pub fn document(&self) -> HtmlDocument {
        HtmlDocument::parse(&self.html, self.url.clone())
    }
}

/// One browser, one page, one identity
pub struct BrowserSession {
    identity: String,
    browser: Browser,
    handler: JoinHandle<()>,
    page: Page,
    viewport: Viewport,
    navigation_timeout_secs: u64,
    content_wait: Duration,
    content_selector: String,
    _profile_dir: TempDir,
}

impl BrowserSession {
    /// Launch a browser for `identity` and prepare its page
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Browser`] if Chrome cannot be found, launched
    /// or given a page.
    pub async fn open(identity: &str, config: &ScrapeConfig) -> ScrapeResult<Self> {
        let profile_dir = tempfile::Builder::new()
            .prefix("cellarscrape-profile-")
            .tempdir()
            .context("Failed to create browser profile directory")?;

        let (mut browser, handler) = launch_browser(config, profile_dir.path()).await?;

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler.abort();
                return Err(ScrapeError::Browser(format!("Failed to open page: {e}")));
            }
        };

        let viewport = config.viewport();
        let profile = StealthProfile::from_config(config);
        match with_page_timeout(
            stealth::inject(&page, &profile),
            STEALTH_TIMEOUT_SECS,
            "Stealth injection",
        )
        .await
        {
            Ok(()) => debug!("Stealth profile active for {identity}"),
            Err(e) => warn!("Stealth injection failed for {identity}: {e}"),
        }

        if let Err(e) = set_viewport(&page, viewport).await {
            warn!("Failed to set viewport for {identity}: {e}");
        }

        info!("Browser session ready for {identity}");
        Ok(Self {
            identity: identity.to_string(),
            browser,
            handler,
            page,
            viewport,
            navigation_timeout_secs: config.navigation_timeout_secs(),
            content_wait: config.content_wait(),
            content_selector: config.content_selector().to_string(),
            _profile_dir: profile_dir,
        })
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Navigate to `url` and wait for the load event
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::NavigationTimeout`] when the page does not load
    /// in time, [`ScrapeError::Browser`] when navigation itself fails.
    pub async fn navigate(&self, url: &Url) -> ScrapeResult<()> {
        let timeout_secs = self.navigation_timeout_secs;
        let load = async {
            self.page.goto(url.as_str()).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        };

        match tokio::time::timeout(Duration::from_secs(timeout_secs), load).await {
            Ok(Ok(())) => {
                debug!(%url, identity = %self.identity, "navigated");
                Ok(())
            }
            Ok(Err(e)) => Err(ScrapeError::Browser(format!("navigate to {url}: {e}"))),
            Err(_) => Err(ScrapeError::NavigationTimeout {
                url: url.to_string(),
                timeout_secs,
            }),
        }
    }

    /// Poll until the content selector matches or the wait runs out
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::SelectorWaitTimeout`]; callers log it and read
    /// the page anyway.
    pub async fn wait_for_content(&self, url: &Url) -> ScrapeResult<()> {
        let start = Instant::now();
        loop {
            if self.page.find_element(self.content_selector.as_str()).await.is_ok() {
                debug!("Content appeared after {:?}", start.elapsed());
                return Ok(());
            }
            if start.elapsed() >= self.content_wait {
                return Err(ScrapeError::SelectorWaitTimeout {
                    url: url.to_string(),
                    selector: self.content_selector.clone(),
                });
            }
            tokio::time::sleep(CONTENT_POLL_INTERVAL).await;
        }
    }

    /// Move the pointer and scroll the way a reader would
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Browser`] if an input event is rejected.
    pub async fn simulate_reading<R: Rng>(
        &self,
        scheduler: &mut InteractionScheduler<R>,
    ) -> ScrapeResult<()> {
        let pointer = scheduler.pointer_plan(self.viewport);
        let scroll = scheduler.scroll_plan();
        interact::replay_pointer(&self.page, &pointer).await?;
        interact::replay_scroll(&self.page, &scroll).await?;
        debug!(
            pointer = ?pointer.total_delay(),
            scroll = ?scroll.total_delay(),
            "simulated reading"
        );
        Ok(())
    }

    /// Open the analytics tab and wait for the search rank to render
    ///
    /// Returns `false` when the page has no analytics tab.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::SelectorWaitTimeout`] when the rank does not
    /// show up within two seconds; callers log it and read the page anyway.
    /// Returns [`ScrapeError::Browser`] if the tab cannot be clicked.
    pub async fn reveal_analytics(&self, url: &Url) -> ScrapeResult<bool> {
        let Ok(tab) = self.page.find_element(ANALYTICS_TAB_SELECTOR).await else {
            debug!(%url, "no analytics tab");
            return Ok(false);
        };
        tab.click().await.context("Failed to open analytics tab")?;

        let start = Instant::now();
        loop {
            let ready = match self.page.evaluate(ANALYTICS_READY_JS).await {
                Ok(result) => result.into_value::<bool>().unwrap_or(false),
                Err(_) => false,
            };
            if ready {
                debug!("Analytics rendered after {:?}", start.elapsed());
                return Ok(true);
            }
            if start.elapsed() >= ANALYTICS_WAIT {
                return Err(ScrapeError::SelectorWaitTimeout {
                    url: url.to_string(),
                    selector: ANALYTICS_TAB_SELECTOR.to_string(),
                });
            }
            tokio::time::sleep(CONTENT_POLL_INTERVAL).await;
        }
    }

    /// Click `selector` and type `text` into it with human keystroke timing
    ///
    /// Library API for callers that enter searches through a site's search
    /// box. The crawl driver navigates straight to listing URLs and never
    /// types.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Browser`] if the element is missing or a key
    /// event is rejected.
    pub async fn type_into<R: Rng>(
        &self,
        selector: &str,
        text: &str,
        scheduler: &mut InteractionScheduler<R>,
    ) -> ScrapeResult<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .with_context(|| format!("No element matches {selector}"))?;
        element.click().await.context("Failed to focus input")?;
        let plan = scheduler.typing_plan(text);
        interact::replay_typing(&self.page, &plan).await?;
        Ok(())
    }

    /// Current rendered HTML
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Browser`] if the DOM cannot be read in time.
    pub async fn snapshot(&self, requested: &Url) -> ScrapeResult<PageSnapshot> {
        let html = with_page_timeout(
            async { self.page.content().await.map_err(anyhow::Error::from) },
            SNAPSHOT_TIMEOUT_SECS,
            "Page content",
        )
        .await?;

        // Redirects land somewhere else; relative links resolve against that
        let url = match self.page.url().await {
            Ok(Some(current)) => Url::parse(&current).unwrap_or_else(|_| requested.clone()),
            _ => requested.clone(),
        };

        Ok(PageSnapshot { url, html })
    }

    /// Close the browser and remove its profile
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser for {}: {}", self.identity, e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Failed to wait for browser exit: {}", e);
        }
        self.handler.abort();
        info!("Closed browser session for {}", self.identity);
    }
}

async fn set_viewport(page: &Page, viewport: Viewport) -> anyhow::Result<()> {
    page.execute(
        cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(viewport.width))
            .height(i64::from(viewport.height))
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(anyhow::Error::msg)?,
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    #[test]
    fn analytics_tab_selector_matches_link_and_tab_variants() {
        let doc = HtmlDocument::parse_with_url(
            r#"<html><body>
                <a href="/find/opus+one/analytics">Analytics</a>
                <button data-tab="analytics">Analytics</button>
                <a href="/find/opus+one/reviews">Reviews</a>
            </body></html>"#,
            "https://www.example.com/find/opus+one",
        )
        .expect("valid url");
        let tabs = doc.select(ANALYTICS_TAB_SELECTOR).expect("valid selector");
        assert_eq!(tabs.len(), 2);
    }
}
