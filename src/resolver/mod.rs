//! Short-link resolution
//!
//! Follows HTTP redirects for an opaque `xhslink.com` link and yields the
//! final canonical URL. Resolution success does not imply host validity:
//! the caller validates the resolved host before any browser work starts.

use reqwest::{Client, header, redirect};
use tracing::debug;

use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::utils::constants::{MAX_REDIRECT_HOPS, MOBILE_USER_AGENT, RESOLVER_REFERER};

/// A short link together with the canonical URL it resolved to.
///
/// Created per request and discarded after use; caching happens above this
/// layer on the original short URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub short_url: String,
    pub canonical_url: String,
}

/// Redirect-following resolver with a spoofed mobile client identity.
pub struct LinkResolver {
    client: Client,
}

impl LinkResolver {
    /// Build the resolver client: redirect cap, fixed request timeout,
    /// mobile user agent and platform referrer.
    pub fn new(config: &ScrapeConfig) -> ScrapeResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::REFERER,
            header::HeaderValue::from_static(RESOLVER_REFERER),
        );

        let client = Client::builder()
            .user_agent(MOBILE_USER_AGENT)
            .default_headers(headers)
            .redirect(redirect::Policy::limited(MAX_REDIRECT_HOPS))
            .timeout(config.resolve_timeout)
            .build()
            .map_err(|e| ScrapeError::Resolution(format!("failed to build resolver client: {e}")))?;

        Ok(Self { client })
    }

    /// Follow redirects for `short_url` and return the final URL exactly as
    /// observed. Fails with [`ScrapeError::Resolution`] on request errors,
    /// timeouts, or when the redirect cap is exceeded.
    pub async fn resolve(&self, short_url: &str) -> ScrapeResult<ResolvedLink> {
        debug!(%short_url, "resolving short link");

        let response = self
            .client
            .get(short_url)
            .send()
            .await
            .map_err(|e| ScrapeError::Resolution(format!("short link request failed: {e}")))?;

        let canonical_url = response.url().to_string();
        debug!(%short_url, %canonical_url, status = %response.status(), "short link resolved");

        Ok(ResolvedLink {
            short_url: short_url.to_string(),
            canonical_url,
        })
    }
}
