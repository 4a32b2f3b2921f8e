//! Chrome discovery and launch
//!
//! Resolution order for the executable: the configured path, `CHROMIUM_PATH`,
//! well-known install locations, `PATH`, and finally a managed Chromium
//! downloaded into the user cache.

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

use crate::config::ScrapeConfig;

const CHROMIUM_PATH_ENV: &str = "CHROMIUM_PATH";

#[cfg(target_os = "windows")]
const INSTALL_LOCATIONS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files\Chromium\Application\chrome.exe",
];

#[cfg(target_os = "macos")]
const INSTALL_LOCATIONS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "~/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "~/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/homebrew/bin/chromium",
];

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const INSTALL_LOCATIONS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/usr/local/bin/chromium",
    "/opt/google/chrome/chrome",
];

/// Binary names probed on `PATH`
const PATH_COMMANDS: &[&str] = &["chromium", "chromium-browser", "google-chrome", "chrome"];

/// Flags shared by every identity's browser
const LAUNCH_FLAGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-dev-shm-usage",
    "--disable-infobars",
    "--disable-notifications",
    "--no-first-run",
    "--no-default-browser-check",
    "--no-sandbox",
    "--disable-extensions",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-breakpad",
    "--disable-features=TranslateUI",
    "--password-store=basic",
    "--use-mock-keychain",
    "--mute-audio",
];

/// Expand a leading `~/` against the home directory
fn expand_home(raw: &str) -> Option<PathBuf> {
    match raw.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => Some(PathBuf::from(raw)),
    }
}

fn which(command: &str) -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        return None;
    }
    let output = Command::new("which").arg(command).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!found.is_empty()).then(|| PathBuf::from(found))
}

/// Find an installed Chrome or Chromium
///
/// # Errors
///
/// Returns an error when no executable is found by any probe.
pub fn find_browser_executable() -> Result<PathBuf> {
    if let Ok(raw) = std::env::var(CHROMIUM_PATH_ENV) {
        let path = PathBuf::from(&raw);
        if path.exists() {
            info!("Using browser from {CHROMIUM_PATH_ENV}: {}", path.display());
            return Ok(path);
        }
        warn!("{CHROMIUM_PATH_ENV} points to a missing file: {raw}");
    }

    if let Some(path) = INSTALL_LOCATIONS
        .iter()
        .filter_map(|raw| expand_home(raw))
        .find(|path| path.exists())
    {
        info!("Found browser at {}", path.display());
        return Ok(path);
    }

    if let Some(path) = PATH_COMMANDS.iter().find_map(|cmd| which(cmd)) {
        info!("Found browser on PATH: {}", path.display());
        return Ok(path);
    }

    Err(anyhow::anyhow!("Chrome/Chromium executable not found"))
}

/// Download a managed Chromium into the user cache directory
///
/// # Errors
///
/// Returns an error if the cache directory cannot be created or the
/// download fails.
pub async fn download_managed_browser() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("cellarscrape")
        .join("chromium");
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("Failed to create {}", cache_dir.display()))?;

    info!("Downloading managed Chromium into {}", cache_dir.display());
    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .context("Failed to build fetcher options")?,
    );
    let revision = fetcher.fetch().await.context("Failed to fetch Chromium")?;
    Ok(revision.executable_path)
}

async fn resolve_executable(config: &ScrapeConfig) -> Result<PathBuf> {
    if let Some(path) = config.chrome_executable() {
        debug!("Using configured browser {}", path.display());
        return Ok(path.clone());
    }
    match find_browser_executable() {
        Ok(path) => Ok(path),
        Err(e) => {
            warn!("{e}; falling back to a managed download");
            download_managed_browser().await
        }
    }
}

/// Launch one browser for one identity
///
/// # Arguments
/// * `config` - Supplies headless mode, window size, user agent and executable
/// * `user_data_dir` - Profile directory owned by this identity alone
///
/// Returns the browser and the task driving its CDP handler.
///
/// # Errors
///
/// Returns an error if no executable can be resolved or Chrome fails to
/// start.
pub async fn launch_browser(
    config: &ScrapeConfig,
    user_data_dir: &Path,
) -> Result<(Browser, JoinHandle<()>)> {
    let viewport = config.viewport();
    let mut builder = BrowserConfigBuilder::default()
        .request_timeout(Duration::from_secs(config.navigation_timeout_secs()))
        .window_size(viewport.width, viewport.height)
        .user_data_dir(user_data_dir.to_path_buf())
        .chrome_executable(resolve_executable(config).await?)
        .arg(format!("--user-agent={}", config.user_agent()))
        .arg(format!("--lang={}", config.locale()));

    builder = if config.headless() {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head()
    };
    for flag in LAUNCH_FLAGS {
        builder = builder.arg(*flag);
    }

    let browser_config = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build browser config: {e}"))?;

    info!("Launching browser with profile {}", user_data_dir.display());
    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .context("Failed to launch browser")?;

    let handler_task = task::spawn(async move {
        while let Some(event) = handler.next().await {
            let Err(e) = event else { continue };
            let message = e.to_string();
            // CDP events chromiumoxide cannot deserialize are not fatal
            if message.contains("data did not match any variant of untagged enum Message")
                || message.contains("Failed to deserialize WS response")
            {
                trace!("Suppressed CDP deserialization error: {message}");
            } else {
                error!("Browser handler error: {e:?}");
            }
        }
        debug!("Browser handler task completed");
    });

    Ok((browser, handler_task))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_home_prefix() {
        let expanded = expand_home("~/Applications/Chromium.app");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, Some(home.join("Applications/Chromium.app")));
        }
        assert_eq!(
            expand_home("/usr/bin/chromium"),
            Some(PathBuf::from("/usr/bin/chromium"))
        );
    }
}
