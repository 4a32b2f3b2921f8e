//! Automation-marker evasions injected before any page script runs

use anyhow::Result;
use chromiumoxide::{Page, cdp};
use futures::future::join_all;
use tracing::{debug, warn};

use crate::config::ScrapeConfig;
use crate::utils::{CHROME_MAJOR_VERSION, DEFAULT_PLATFORM};

/// Values the evasion scripts present to the page
#[derive(Debug, Clone)]
pub struct StealthProfile {
    pub user_agent: String,
    pub accept_language: String,
    pub language: String,
    pub platform: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub webgl_vendor: String,
    pub webgl_renderer: String,
    pub hardware_concurrency: u32,
}

impl StealthProfile {
    #[must_use]
    pub fn from_config(config: &ScrapeConfig) -> Self {
        let language = config.locale().to_string();
        let primary = language.split('-').next().unwrap_or("en").to_string();
        let viewport = config.viewport();
        Self {
            user_agent: config.user_agent().to_string(),
            accept_language: format!("{language},{primary};q=0.9"),
            language,
            platform: DEFAULT_PLATFORM.to_string(),
            screen_width: viewport.width,
            screen_height: viewport.height,
            webgl_vendor: "Intel Inc.".to_string(),
            webgl_renderer: "Intel(R) UHD Graphics".to_string(),
            hardware_concurrency: 8,
        }
    }

    /// `window.__cellarProfile`, read by the evasion scripts
    fn bootstrap_script(&self) -> String {
        let primary = self.language.split('-').next().unwrap_or("en");
        let languages = serde_json::to_string(&[self.language.as_str(), primary])
            .unwrap_or_else(|_| "[]".to_string());
        format!(
            r#"
            Object.defineProperty(window, '__cellarProfile', {{
                value: {{
                    platform: "{}",
                    languages: {},
                    screenWidth: {},
                    screenHeight: {},
                    webglVendor: "{}",
                    webglRenderer: "{}",
                    hardwareConcurrency: {},
                    chromeMajor: "{}"
                }},
                enumerable: false
            }});
            "#,
            self.platform,
            languages,
            self.screen_width,
            self.screen_height,
            self.webgl_vendor,
            self.webgl_renderer,
            self.hardware_concurrency,
            CHROME_MAJOR_VERSION,
        )
    }
}

// Order matters: every script reads window.__cellarProfile
const EVASION_SCRIPTS: &[(&str, &str)] = &[
    (
        "navigator_webdriver",
        r"
        Object.defineProperty(Navigator.prototype, 'webdriver', { get: () => undefined });
        ",
    ),
    (
        "navigator_plugins",
        r"
        Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
        ",
    ),
    (
        "navigator_languages",
        r"
        Object.defineProperty(navigator, 'languages', { get: () => window.__cellarProfile.languages });
        Object.defineProperty(navigator, 'platform', { get: () => window.__cellarProfile.platform });
        ",
    ),
    (
        "hardware_concurrency",
        r"
        Object.defineProperty(navigator, 'hardwareConcurrency', {
            get: () => window.__cellarProfile.hardwareConcurrency
        });
        ",
    ),
    (
        "screen_size",
        r"
        Object.defineProperty(screen, 'width', { get: () => window.__cellarProfile.screenWidth });
        Object.defineProperty(screen, 'height', { get: () => window.__cellarProfile.screenHeight });
        ",
    ),
    (
        "user_agent_data",
        r"
        if (navigator.userAgentData) {
            const brands = [
                { brand: 'Not_A Brand', version: '8' },
                { brand: 'Chromium', version: window.__cellarProfile.chromeMajor },
                { brand: 'Google Chrome', version: window.__cellarProfile.chromeMajor }
            ];
            Object.defineProperty(navigator.userAgentData, 'brands', { get: () => brands });
        }
        ",
    ),
    (
        "permissions",
        r"
        if (navigator.permissions && navigator.permissions.query) {
            const originalQuery = navigator.permissions.query.bind(navigator.permissions);
            navigator.permissions.query = (parameters) =>
                parameters && parameters.name === 'notifications'
                    ? Promise.resolve({ state: Notification.permission })
                    : originalQuery(parameters);
        }
        ",
    ),
    (
        "webgl_vendor",
        r"
        const patchGetParameter = (proto) => {
            if (!proto) { return; }
            const getParameter = proto.getParameter;
            proto.getParameter = new Proxy(getParameter, {
                apply(target, ctx, args) {
                    const param = args && args[0];
                    if (param === 37445) { return window.__cellarProfile.webglVendor; }
                    if (param === 37446) { return window.__cellarProfile.webglRenderer; }
                    return Reflect.apply(target, ctx, args);
                }
            });
        };
        patchGetParameter(window.WebGLRenderingContext && WebGLRenderingContext.prototype);
        patchGetParameter(window.WebGL2RenderingContext && WebGL2RenderingContext.prototype);
        ",
    ),
    (
        "chrome_runtime",
        r"
        if (!window.chrome) {
            window.chrome = {};
        }
        if (!window.chrome.runtime) {
            window.chrome.runtime = {
                connect: () => ({
                    onMessage: { addListener: () => {}, removeListener: () => {} },
                    postMessage: () => {}
                })
            };
        }
        ",
    ),
];

async fn add_init_script(page: &Page, source: String) -> Result<()> {
    page.execute(
        cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams {
            source,
            include_command_line_api: None,
            world_name: None,
            run_immediately: None,
        },
    )
    .await?;
    Ok(())
}

/// Register the evasion scripts and the user agent override on `page`
///
/// Scripts run on every document the page loads from now on. Individual
/// script failures are logged; injection fails only when none took.
pub async fn inject(page: &Page, profile: &StealthProfile) -> Result<()> {
    debug!("Injecting stealth profile");
    add_init_script(page, profile.bootstrap_script()).await?;

    let results = join_all(EVASION_SCRIPTS.iter().map(|(name, source)| async move {
        (*name, add_init_script(page, (*source).to_string()).await)
    }))
    .await;

    let mut injected = 0;
    for (name, result) in results {
        match result {
            Ok(()) => {
                debug!("✓ Injected: {}", name);
                injected += 1;
            }
            Err(e) => warn!("✗ Failed to inject {}: {}", name, e),
        }
    }

    if injected == 0 {
        return Err(anyhow::anyhow!(
            "Failed to inject any of {} stealth scripts",
            EVASION_SCRIPTS.len()
        ));
    }

    page.execute(cdp::browser_protocol::network::SetUserAgentOverrideParams {
        user_agent: profile.user_agent.replace("Headless", ""),
        accept_language: Some(profile.accept_language.clone()),
        platform: Some(profile.platform.clone()),
        user_agent_metadata: None,
    })
    .await?;

    debug!(
        "Stealth injection complete: {}/{} scripts active",
        injected,
        EVASION_SCRIPTS.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_follows_config() {
        let config = ScrapeConfig::builder()
            .start_url("/find/opus")
            .locale("fr-FR")
            .build()
            .expect("valid config");
        let profile = StealthProfile::from_config(&config);
        assert_eq!(profile.accept_language, "fr-FR,fr;q=0.9");
        assert_eq!(profile.screen_width, 1920);

        let script = profile.bootstrap_script();
        assert!(script.contains(r#"languages: ["fr-FR","fr"]"#));
        assert!(script.contains("chromeMajor: \"120\""));
    }
}
