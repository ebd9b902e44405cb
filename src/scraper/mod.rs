//! Scrape pipeline orchestration
//!
//! One pipeline, parameterized entirely by configuration: validate the
//! canonical host, acquire a browser session, open a page under a rotated
//! user agent, install the request filter, navigate with retry, harvest
//! media, and release everything. The session is closed on every path:
//! success, each error kind, timeout, cancellation.

use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::collector::{MediaBundle, MediaCollector};
use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::navigation::{self, NavigationController};
use crate::session::{BrowserSession, SessionManager};
use crate::utils::constants::PAGE_USER_AGENTS;
use crate::utils::url_utils;

pub struct MediaScraper {
    sessions: SessionManager,
    navigator: NavigationController,
    collector: MediaCollector,
}

impl MediaScraper {
    #[must_use]
    pub fn new(config: &ScrapeConfig) -> Self {
        Self {
            sessions: SessionManager::new(config),
            navigator: NavigationController::new(config),
            collector: MediaCollector::new(config),
        }
    }

    /// Scrape media from a canonical article URL.
    ///
    /// Rejects out-of-domain URLs before any session is acquired. Session
    /// acquisition races the cancellation token; after that, the session is
    /// closed no matter how the inner scrape ends.
    pub async fn scrape(
        &self,
        canonical_url: &str,
        cancel: &CancellationToken,
    ) -> ScrapeResult<MediaBundle> {
        if !url_utils::is_canonical_url(canonical_url) {
            return Err(ScrapeError::InvalidHost(canonical_url.to_string()));
        }

        let session = tokio::select! {
            session = self.sessions.acquire() => session?,
            _ = cancel.cancelled() => return Err(ScrapeError::Cancelled),
        };

        let outcome = self.scrape_in_session(&session, canonical_url, cancel).await;
        session.close().await;

        match &outcome {
            Ok(bundle) => info!(
                url = %canonical_url,
                images = bundle.images.len(),
                videos = bundle.videos.len(),
                "scrape complete"
            ),
            Err(e) => debug!(url = %canonical_url, error = %e, "scrape failed"),
        }
        outcome
    }

    async fn scrape_in_session(
        &self,
        session: &BrowserSession,
        url: &str,
        cancel: &CancellationToken,
    ) -> ScrapeResult<MediaBundle> {
        let page = session.new_page().await?;

        let user_agent = PAGE_USER_AGENTS[rand::rng().random_range(0..PAGE_USER_AGENTS.len())];
        page.execute(SetUserAgentOverrideParams::new(user_agent))
            .await
            .map_err(|e| ScrapeError::Scrape(format!("failed to set user agent: {e}")))?;

        let filter = navigation::install_request_filter(&page).await?;

        let outcome = async {
            let attempts = self.navigator.goto(&page, url, cancel).await?;
            debug!(attempts, %url, "navigation settled");
            self.collector.collect(&page, cancel).await
        }
        .await;

        filter.abort();
        if let Err(e) = page.close().await {
            debug!(error = %e, "page close failed");
        }
        outcome
    }
}
