//! Navigation control
//!
//! Drives a page to a target URL under a bounded retry policy with a
//! per-attempt timeout, waits for a configurable settle condition, and
//! installs the request-filtering rule that aborts image/stylesheet/font
//! fetches at the network layer. Aborting those is safe because the media
//! collector reads image URLs from declared `src` attributes and
//! intercepted API payloads, never from downloaded bytes.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};

/// Criterion deciding when a page has loaded enough to begin harvesting.
///
/// `DomContentLoaded` is fast but can miss late content; `NetworkIdle`
/// waits for the load event plus a quiet buffer and is slower but more
/// complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettleCondition {
    #[default]
    DomContentLoaded,
    NetworkIdle,
}

impl SettleCondition {
    /// Parse the configuration spelling (`domcontentloaded` / `networkidle`).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "domcontentloaded" => Some(Self::DomContentLoaded),
            "networkidle" => Some(Self::NetworkIdle),
            _ => None,
        }
    }
}

/// Bounded retry policy for page navigation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, first try included. Zero is treated as one.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
    /// Timeout applied to each individual attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(15),
        }
    }
}

/// Run `attempt` under the retry policy until it succeeds or the budget is
/// exhausted. Returns the 1-based attempt number that succeeded.
///
/// Each attempt races its own timeout; the inter-attempt delay races the
/// cancellation token. Exhaustion surfaces the last failure as
/// [`ScrapeError::Navigation`]. Generic over the attempt so tests can drive
/// it with doubles.
pub async fn retry_navigation<F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut attempt: F,
) -> ScrapeResult<u32>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = String::new();

    for n in 1..=max_attempts {
        if cancel.is_cancelled() {
            return Err(ScrapeError::Cancelled);
        }

        match tokio::time::timeout(policy.attempt_timeout, attempt(n)).await {
            Ok(Ok(())) => return Ok(n),
            Ok(Err(e)) => {
                last_error = format!("{e:#}");
                warn!(attempt = n, max_attempts, error = %last_error, "navigation attempt failed");
            }
            Err(_) => {
                last_error = format!("attempt timed out after {:?}", policy.attempt_timeout);
                warn!(attempt = n, max_attempts, "navigation attempt timed out");
            }
        }

        if n < max_attempts {
            tokio::select! {
                _ = tokio::time::sleep(policy.retry_delay) => {}
                _ = cancel.cancelled() => return Err(ScrapeError::Cancelled),
            }
        }
    }

    Err(ScrapeError::Navigation {
        attempts: max_attempts,
        message: last_error,
    })
}

/// Navigates pages and waits for the configured settle condition.
pub struct NavigationController {
    policy: RetryPolicy,
    settle: SettleCondition,
}

impl NavigationController {
    #[must_use]
    pub fn new(config: &ScrapeConfig) -> Self {
        Self {
            policy: RetryPolicy {
                max_attempts: config.max_nav_attempts,
                retry_delay: config.nav_retry_delay,
                attempt_timeout: config.navigation_timeout,
            },
            settle: config.settle,
        }
    }

    /// Navigate `page` to `url` and wait until the page settles, retrying
    /// transient failures within the policy budget. Returns the number of
    /// attempts spent.
    pub async fn goto(
        &self,
        page: &Page,
        url: &str,
        cancel: &CancellationToken,
    ) -> ScrapeResult<u32> {
        let settle = self.settle;
        retry_navigation(&self.policy, cancel, |attempt| {
            let page = page.clone();
            let url = url.to_string();
            async move {
                debug!(%url, attempt, "navigating");
                page.goto(url.as_str()).await.context("page.goto failed")?;
                wait_for_settle(&page, settle).await
            }
        })
        .await
    }
}

async fn wait_for_settle(page: &Page, settle: SettleCondition) -> Result<()> {
    match settle {
        SettleCondition::DomContentLoaded => {
            // Interactive means the DOM is parsed; late subresources are the
            // collector's problem.
            wait_for_ready_state(page, &["interactive", "complete"]).await
        }
        SettleCondition::NetworkIdle => {
            page.wait_for_navigation()
                .await
                .context("waiting for load event failed")?;
            wait_for_ready_state(page, &["complete"]).await?;
            // Quiet buffer for straggling fetches kicked off at load.
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        }
    }
}

/// Poll `document.readyState` until it reaches one of `accepted`. The
/// caller's attempt timeout bounds the loop.
async fn wait_for_ready_state(page: &Page, accepted: &[&str]) -> Result<()> {
    let poll_interval = Duration::from_millis(100);
    loop {
        let state: String = page
            .evaluate("document.readyState")
            .await
            .context("readyState check failed")?
            .into_value()
            .unwrap_or_default();
        if accepted.contains(&state.as_str()) {
            trace!(%state, "page settled");
            return Ok(());
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Install the request-filtering rule on `page` and spawn the task serving
/// interception verdicts: Image, Stylesheet and Font requests are aborted
/// before any bytes are fetched, everything else continues untouched.
///
/// The returned task runs until aborted or the page goes away; the caller
/// aborts it once harvesting is done.
pub async fn install_request_filter(page: &Page) -> ScrapeResult<JoinHandle<()>> {
    let pattern = RequestPattern {
        url_pattern: Some("*".to_string()),
        resource_type: None,
        request_stage: None,
    };
    page.execute(EnableParams {
        patterns: Some(vec![pattern]),
        handle_auth_requests: None,
    })
    .await
    .map_err(|e| ScrapeError::Scrape(format!("failed to enable request interception: {e}")))?;

    let mut paused = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(|e| ScrapeError::Scrape(format!("failed to install request listener: {e}")))?;

    let page = page.clone();
    Ok(tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let request_id = event.request_id.clone();
            let blocked = matches!(
                &event.resource_type,
                ResourceType::Image | ResourceType::Stylesheet | ResourceType::Font
            );
            let verdict = if blocked {
                trace!(url = %event.request.url, "aborting filtered resource");
                page.execute(FailRequestParams::new(request_id, ErrorReason::Aborted))
                    .await
                    .map(|_| ())
            } else {
                page.execute(ContinueRequestParams::new(request_id))
                    .await
                    .map(|_| ())
            };
            // Verdicts can race page teardown; a lost one only means the
            // request proceeds or dies with the page.
            if let Err(e) = verdict {
                trace!(error = %e, "interception verdict not delivered");
            }
        }
    }))
}
