//! Deadline wrapper for CDP calls that carry no timeout of their own

use std::future::Future;
use std::time::Duration;

use crate::error::{ScrapeError, ScrapeResult};

/// Run `operation` with a deadline
///
/// # Arguments
/// * `operation` - CDP call to await
/// * `timeout_secs` - Deadline in seconds
/// * `operation_name` - Named in the timeout error
///
/// # Errors
///
/// Returns the operation's own error converted into [`ScrapeError`], or
/// [`ScrapeError::Browser`] naming the operation when the deadline passes.
pub async fn with_page_timeout<F, T, E>(
    operation: F,
    timeout_secs: u64,
    operation_name: &str,
) -> ScrapeResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<ScrapeError>,
{
    match tokio::time::timeout(Duration::from_secs(timeout_secs), operation).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(ScrapeError::Browser(format!(
            "{operation_name} timed out after {timeout_secs}s"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_fast_operations() {
        let value = with_page_timeout(async { Ok::<_, ScrapeError>(7) }, 1, "noop").await;
        assert_eq!(value.ok(), Some(7));
    }

    #[tokio::test]
    async fn converts_operation_errors() {
        let result: ScrapeResult<()> =
            with_page_timeout(async { Err(anyhow::anyhow!("socket closed")) }, 1, "Page content")
                .await;
        assert!(matches!(result, Err(ScrapeError::Browser(ref msg)) if msg == "socket closed"));
    }

    #[tokio::test(start_paused = true)]
    async fn names_the_timed_out_operation() {
        let result: ScrapeResult<()> = with_page_timeout(
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, ScrapeError>(())
            },
            1,
            "Stealth injection",
        )
        .await;
        let message = result.expect_err("must time out").to_string();
        assert_eq!(message, "Browser error: Stealth injection timed out after 1s");
    }
}
