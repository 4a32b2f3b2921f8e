//! Shared configuration constants for cellarscrape
//!
//! Default values used by the config builder, the browser adapter and the
//! crawl driver.

/// Default navigation timeout: 30 seconds
///
/// Exceeding it is a hard failure charged against the retry budget.
pub const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 30;

/// Default wait for listing content to appear: 10 seconds
///
/// Exceeding it is logged and extraction proceeds on whatever rendered.
pub const DEFAULT_CONTENT_WAIT_SECS: u64 = 10;

/// Pause before retrying a URL that served a challenge
pub const DEFAULT_CHALLENGE_BACKOFF_SECS: u64 = 10;

/// Failed attempts allowed per URL before it is abandoned
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Identities live at once
pub const DEFAULT_POOL_SIZE: usize = 4;

/// Documents fetched with one identity before it is rotated out
pub const DEFAULT_IDENTITY_MAX_USES: u32 = 50;

/// Where records go when no output path is given
pub const DEFAULT_OUTPUT_PATH: &str = "cellarscrape-output/records.jsonl";

/// Site root that relative listing links are joined against
pub const DEFAULT_BASE_URL: &str = "https://www.wine-searcher.com";

/// Browser locale presented to the site
pub const DEFAULT_LOCALE: &str = "en-US";

/// Platform reported through `navigator.platform`
pub const DEFAULT_PLATFORM: &str = "Win32";

/// Chrome user agent string presented by every identity
///
/// Keep the major version in step with the stealth script's `userAgentData`.
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Major version in [`CHROME_USER_AGENT`]
pub const CHROME_MAJOR_VERSION: &str = "120";
