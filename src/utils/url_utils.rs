//! URL helpers for start URLs and listing links

use anyhow::{Context, Result};
use url::Url;

/// Check if a URL is a crawlable http(s) URL
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    // Skip data URLs, javascript URLs, and other non-http schemes
    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Parse a start URL, resolving site-relative paths against `base`
///
/// Bare hosts get an `https://` scheme; paths such as `/find/margaux` are
/// joined to `base`.
///
/// # Errors
///
/// Returns an error if the result is not a valid http(s) URL.
pub fn normalize_start_url(raw: &str, base: &str) -> Result<Url> {
    let raw = raw.trim();
    let candidate = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else if raw.starts_with('/') {
        let base = Url::parse(base).with_context(|| format!("invalid base URL '{base}'"))?;
        base.join(raw)
            .with_context(|| format!("cannot join '{raw}' to {base}"))?
            .to_string()
    } else {
        format!("https://{raw}")
    };

    if !is_valid_url(&candidate) {
        anyhow::bail!("'{raw}' is not a valid http(s) URL");
    }
    Url::parse(&candidate).with_context(|| format!("invalid start URL '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http() {
        assert!(!is_valid_url("javascript:void(0)"));
        assert!(!is_valid_url("ftp://example.com/file"));
        assert!(is_valid_url("https://www.wine-searcher.com/find/opus"));
    }

    #[test]
    fn normalizes_start_urls() {
        let base = "https://www.wine-searcher.com";
        assert_eq!(
            normalize_start_url("/find/opus+one", base).map(String::from).ok(),
            Some("https://www.wine-searcher.com/find/opus+one".to_string())
        );
        assert_eq!(
            normalize_start_url("example.com/wines", base).map(String::from).ok(),
            Some("https://example.com/wines".to_string())
        );
        assert!(normalize_start_url("", base).is_err());
    }
}
