//! Core configuration types for a scrape run
//!
//! This module contains the `ScrapeConfig` struct, its defaults and the
//! validation shared by the builder and the JSON loader.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::classifier::content_ready_selector;
use crate::error::{ScrapeError, ScrapeResult};
use crate::extraction::{ExtractionOptions, RecordContext};
use crate::normalize::{MAX_VINTAGE, MIN_VINTAGE};
use crate::pacing::{PacingProfile, Viewport};
use crate::utils::{
    CHROME_USER_AGENT, DEFAULT_CHALLENGE_BACKOFF_SECS,
    DEFAULT_CONTENT_WAIT_SECS, DEFAULT_IDENTITY_MAX_USES, DEFAULT_LOCALE, DEFAULT_MAX_RETRIES,
    DEFAULT_NAVIGATION_TIMEOUT_SECS, DEFAULT_OUTPUT_PATH, DEFAULT_POOL_SIZE,
};

/// Main configuration struct for a scrape run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Listing URLs the crawl starts from
    pub(crate) start_urls: Vec<Url>,

    /// Keep only records of this vintage
    pub(crate) target_vintage: Option<u16>,

    /// Country tag attached to every record
    pub(crate) country: Option<String>,

    /// Currency tag attached to every record
    pub(crate) currency: Option<String>,

    /// Records (or detail requests) taken per start URL; `None` is unlimited
    pub(crate) max_records_per_search: Option<usize>,

    /// Hard limit on `page.goto()`
    ///
    /// Default: 30 seconds
    pub(crate) navigation_timeout_secs: u64,

    /// Soft limit on waiting for listing content to render
    ///
    /// Default: 10 seconds
    pub(crate) content_wait_secs: u64,

    /// Selector awaited after navigation
    pub(crate) content_selector: String,

    /// Delay profiles for pointer, scroll, typing and page dwell
    pub(crate) pacing: PacingProfile,

    /// Seed for the interaction scheduler; unseeded runs draw from the OS
    pub(crate) seed: Option<u64>,

    /// Move the pointer and scroll each page before reading it
    pub(crate) simulate_interaction: bool,

    /// Failed attempts allowed per URL
    pub(crate) max_retries: u32,

    /// Pause before retrying a URL that served a challenge
    pub(crate) challenge_backoff_secs: u64,

    /// Visit each search result's detail page instead of recording the card
    pub(crate) follow_details: bool,

    /// Keep analytics fields such as search rank
    pub(crate) include_analytics: bool,

    pub(crate) headless: bool,

    /// Chrome executable; discovered when unset
    pub(crate) chrome_executable: Option<PathBuf>,

    pub(crate) viewport: Viewport,
    pub(crate) user_agent: String,
    pub(crate) locale: String,

    /// JSON lines file records are appended to
    pub(crate) output_path: PathBuf,

    /// Identities live at once
    pub(crate) pool_max_size: usize,

    /// Documents per identity before forced rotation
    pub(crate) identity_max_uses: u32,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            start_urls: Vec::new(),
            target_vintage: None,
            country: None,
            currency: None,
            max_records_per_search: None,
            navigation_timeout_secs: DEFAULT_NAVIGATION_TIMEOUT_SECS,
            content_wait_secs: DEFAULT_CONTENT_WAIT_SECS,
            content_selector: content_ready_selector(),
            pacing: PacingProfile::default(),
            seed: None,
            simulate_interaction: true,
            max_retries: DEFAULT_MAX_RETRIES,
            challenge_backoff_secs: DEFAULT_CHALLENGE_BACKOFF_SECS,
            follow_details: true,
            include_analytics: true,
            headless: true,
            chrome_executable: None,
            viewport: Viewport::default(),
            user_agent: CHROME_USER_AGENT.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            pool_max_size: DEFAULT_POOL_SIZE,
            identity_max_uses: DEFAULT_IDENTITY_MAX_USES,
        }
    }
}

impl ScrapeConfig {
    /// Load a config from a JSON file; missing keys take their defaults
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Config`] if the file cannot be read, is not valid
    /// JSON, or fails validation.
    pub fn from_json_file(path: impl AsRef<Path>) -> ScrapeResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ScrapeError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    /// Parse a config from JSON text
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Config`] on malformed JSON or invalid values.
    pub fn from_json_str(raw: &str) -> ScrapeResult<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| ScrapeError::Config(format!("parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Config`] naming the first offending field.
    pub fn validate(&self) -> ScrapeResult<()> {
        if self.start_urls.is_empty() {
            return Err(ScrapeError::Config("at least one start URL is required".into()));
        }
        if let Some(vintage) = self.target_vintage
            && !(MIN_VINTAGE..=MAX_VINTAGE).contains(&vintage)
        {
            return Err(ScrapeError::Config(format!(
                "target_vintage {vintage} outside {MIN_VINTAGE}-{MAX_VINTAGE}"
            )));
        }
        if self.navigation_timeout_secs == 0 {
            return Err(ScrapeError::Config("navigation_timeout_secs must be positive".into()));
        }
        if self.max_records_per_search == Some(0) {
            return Err(ScrapeError::Config(
                "max_records_per_search must be positive; leave it unset for no limit".into(),
            ));
        }
        if self.pool_max_size == 0 {
            return Err(ScrapeError::Config("pool_max_size must be at least 1".into()));
        }
        if self.identity_max_uses == 0 {
            return Err(ScrapeError::Config("identity_max_uses must be at least 1".into()));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(ScrapeError::Config("viewport must have a non-zero size".into()));
        }
        Ok(())
    }

    /// Extraction options derived from this config
    #[must_use]
    pub fn extraction_options(&self) -> ExtractionOptions {
        ExtractionOptions {
            context: RecordContext {
                country: self.country.clone(),
                currency: self.currency.clone(),
            },
            target_vintage: self.target_vintage,
            include_analytics: self.include_analytics,
        }
    }
}
