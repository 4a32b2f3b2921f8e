//! Getter methods for `ScrapeConfig`

use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use super::types::ScrapeConfig;
use crate::pacing::{PacingProfile, Viewport};

impl ScrapeConfig {
    #[must_use]
    pub fn start_urls(&self) -> &[Url] {
        &self.start_urls
    }

    #[must_use]
    pub fn target_vintage(&self) -> Option<u16> {
        self.target_vintage
    }

    #[must_use]
    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    #[must_use]
    pub fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }

    #[must_use]
    pub fn max_records_per_search(&self) -> Option<usize> {
        self.max_records_per_search
    }

    #[must_use]
    pub fn navigation_timeout_secs(&self) -> u64 {
        self.navigation_timeout_secs
    }

    #[must_use]
    pub fn content_wait(&self) -> Duration {
        Duration::from_secs(self.content_wait_secs)
    }

    #[must_use]
    pub fn content_selector(&self) -> &str {
        &self.content_selector
    }

    #[must_use]
    pub fn pacing(&self) -> &PacingProfile {
        &self.pacing
    }

    #[must_use]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    #[must_use]
    pub fn simulate_interaction(&self) -> bool {
        self.simulate_interaction
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[must_use]
    pub fn challenge_backoff(&self) -> Duration {
        Duration::from_secs(self.challenge_backoff_secs)
    }

    #[must_use]
    pub fn follow_details(&self) -> bool {
        self.follow_details
    }

    #[must_use]
    pub fn include_analytics(&self) -> bool {
        self.include_analytics
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn chrome_executable(&self) -> Option<&PathBuf> {
        self.chrome_executable.as_ref()
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    #[must_use]
    pub fn pool_max_size(&self) -> usize {
        self.pool_max_size
    }

    #[must_use]
    pub fn identity_max_uses(&self) -> u32 {
        self.identity_max_uses
    }
}
