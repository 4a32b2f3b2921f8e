//! Type-safe builder for `ScrapeConfig` using the typestate pattern
//!
//! At least one start URL must be given before `build()` becomes available.

use anyhow::{Context, Result};
use std::marker::PhantomData;
use std::path::PathBuf;

use super::types::ScrapeConfig;
use crate::pacing::{PacingProfile, Viewport};
use crate::utils::{DEFAULT_BASE_URL, normalize_start_url};

// Type states for the builder
pub struct WithStartUrl;

pub struct ScrapeConfigBuilder<State = ()> {
    pub(crate) config: ScrapeConfig,
    pub(crate) start_urls: Vec<String>,
    pub(crate) base_url: String,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for ScrapeConfigBuilder<()> {
    fn default() -> Self {
        Self {
            config: ScrapeConfig::default(),
            start_urls: Vec::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            _phantom: PhantomData,
        }
    }
}

impl ScrapeConfig {
    /// Create a builder for configuring a `ScrapeConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> ScrapeConfigBuilder<()> {
        ScrapeConfigBuilder::default()
    }

    /// Builder seeded with every value of this config, start URLs included
    #[must_use]
    pub fn into_builder(self) -> ScrapeConfigBuilder<WithStartUrl> {
        let start_urls = self.start_urls.iter().map(ToString::to_string).collect();
        ScrapeConfigBuilder {
            config: self,
            start_urls,
            base_url: DEFAULT_BASE_URL.to_string(),
            _phantom: PhantomData,
        }
    }
}

impl ScrapeConfigBuilder<()> {
    /// First listing URL; site-relative paths are joined to the base URL
    pub fn start_url(self, url: impl Into<String>) -> ScrapeConfigBuilder<WithStartUrl> {
        let mut start_urls = self.start_urls;
        start_urls.push(url.into());
        ScrapeConfigBuilder {
            config: self.config,
            start_urls,
            base_url: self.base_url,
            _phantom: PhantomData,
        }
    }
}

impl ScrapeConfigBuilder<WithStartUrl> {
    /// Another listing URL, crawled after the earlier ones
    #[must_use]
    pub fn add_start_url(mut self, url: impl Into<String>) -> Self {
        self.start_urls.push(url.into());
        self
    }

    /// Build and validate the config
    ///
    /// # Errors
    ///
    /// Returns an error if a start URL does not parse or a value is out of
    /// range.
    pub fn build(self) -> Result<ScrapeConfig> {
        let mut config = self.config;
        config.start_urls = self
            .start_urls
            .iter()
            .map(|raw| normalize_start_url(raw, &self.base_url))
            .collect::<Result<Vec<_>>>()?;

        config.validate().context("invalid scrape config")?;
        Ok(config)
    }
}

// Builder methods available at any state
impl<State> ScrapeConfigBuilder<State> {
    /// Site root that relative start URLs are joined to
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn target_vintage(mut self, vintage: u16) -> Self {
        self.config.target_vintage = Some(vintage);
        self
    }

    #[must_use]
    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.config.country = Some(country.into());
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.config.currency = Some(currency.into());
        self
    }

    /// Cap records per start URL; 0 removes the cap
    #[must_use]
    pub fn max_records_per_search(mut self, max: usize) -> Self {
        self.config.max_records_per_search = (max > 0).then_some(max);
        self
    }

    #[must_use]
    pub fn navigation_timeout_secs(mut self, secs: u64) -> Self {
        self.config.navigation_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn content_wait_secs(mut self, secs: u64) -> Self {
        self.config.content_wait_secs = secs;
        self
    }

    #[must_use]
    pub fn content_selector(mut self, selector: impl Into<String>) -> Self {
        self.config.content_selector = selector.into();
        self
    }

    #[must_use]
    pub fn pacing(mut self, pacing: PacingProfile) -> Self {
        self.config.pacing = pacing;
        self
    }

    /// Seed the interaction scheduler for reproducible pacing
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn simulate_interaction(mut self, enabled: bool) -> Self {
        self.config.simulate_interaction = enabled;
        self
    }

    /// Set maximum failed attempts per URL
    ///
    /// Set to 0 to give up on a URL after its first failure.
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    #[must_use]
    pub fn challenge_backoff_secs(mut self, secs: u64) -> Self {
        self.config.challenge_backoff_secs = secs;
        self
    }

    /// Visit each search result's detail page instead of recording the card
    #[must_use]
    pub fn follow_details(mut self, follow: bool) -> Self {
        self.config.follow_details = follow;
        self
    }

    #[must_use]
    pub fn include_analytics(mut self, include: bool) -> Self {
        self.config.include_analytics = include;
        self
    }

    /// Set browser headless mode
    ///
    /// Headed mode needs a display server and is meant for watching a run
    /// locally.
    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    #[must_use]
    pub fn chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_executable = Some(path.into());
        self
    }

    #[must_use]
    pub fn viewport(mut self, viewport: Viewport) -> Self {
        self.config.viewport = viewport;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.config.locale = locale.into();
        self
    }

    #[must_use]
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = path.into();
        self
    }

    #[must_use]
    pub fn pool_max_size(mut self, size: usize) -> Self {
        self.config.pool_max_size = size;
        self
    }

    #[must_use]
    pub fn identity_max_uses(mut self, uses: u32) -> Self {
        self.config.identity_max_uses = uses;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_defaults() {
        let config = ScrapeConfig::builder()
            .start_url("/find/opus+one")
            .build()
            .expect("valid config");
        assert_eq!(
            config.start_urls()[0].as_str(),
            "https://www.wine-searcher.com/find/opus+one"
        );
        assert_eq!(config.navigation_timeout_secs(), 30);
        assert_eq!(config.max_records_per_search(), None);
        assert!(config.follow_details());
        assert!(config.headless());
    }

    #[test]
    fn zero_max_records_means_unlimited() {
        let config = ScrapeConfig::builder()
            .max_records_per_search(0)
            .start_url("https://www.example.com/find/margaux")
            .build()
            .expect("valid config");
        assert_eq!(config.max_records_per_search(), None);
    }

    #[test]
    fn rejects_out_of_range_vintage() {
        let result = ScrapeConfig::builder()
            .start_url("https://www.example.com/find/margaux")
            .target_vintage(1850)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn rejects_bad_start_url() {
        let result = ScrapeConfig::builder()
            .start_url("javascript:alert(1)")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn multiple_start_urls_keep_order() {
        let config = ScrapeConfig::builder()
            .start_url("/find/a")
            .add_start_url("/find/b")
            .country("USA")
            .currency("USD")
            .build()
            .expect("valid config");
        let urls: Vec<&str> = config.start_urls().iter().map(url::Url::as_str).collect();
        assert_eq!(
            urls,
            [
                "https://www.wine-searcher.com/find/a",
                "https://www.wine-searcher.com/find/b"
            ]
        );
        let options = config.extraction_options();
        assert_eq!(options.context.country.as_deref(), Some("USA"));
        assert_eq!(options.context.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn into_builder_keeps_values() {
        let config = ScrapeConfig::from_json_str(
            r#"{"start_urls": ["https://www.example.com/find/rioja"], "country": "Spain"}"#,
        )
        .expect("valid json config")
        .into_builder()
        .add_start_url("/find/ribera")
        .headless(false)
        .build()
        .expect("valid config");
        assert_eq!(config.start_urls().len(), 2);
        assert_eq!(config.country(), Some("Spain"));
        assert!(!config.headless());
    }

    #[test]
    fn loads_partial_json() {
        let config = ScrapeConfig::from_json_str(
            r#"{"start_urls": ["https://www.example.com/find/rioja"], "target_vintage": 2015}"#,
        )
        .expect("valid json config");
        assert_eq!(config.target_vintage(), Some(2015));
        assert_eq!(config.max_retries(), 3);

        assert!(ScrapeConfig::from_json_str(r#"{"start_urls": []}"#).is_err());
        assert!(ScrapeConfig::from_json_str("not json").is_err());
    }
}
