//! Service configuration
//!
//! All timeouts, retry budgets and the browser acquisition strategy are
//! configured here and injected at construction time. Values observed to
//! drift across deployments (settle condition, grace window, navigation
//! timeout) are environment-tunable rather than hardcoded at call sites.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::warn;

use crate::navigation::SettleCondition;
use crate::utils::constants::NOTE_API_FRAGMENT;

/// How a browser automation session is obtained.
///
/// Exactly one strategy is active per deployment, selected from the
/// environment: a remote endpoint wins when configured, otherwise a local
/// Chromium is launched.
#[derive(Debug, Clone)]
pub enum BrowserStrategy {
    /// Launch a local headless Chromium process.
    Launch {
        /// Explicit executable path; discovered on the system when `None`.
        executable: Option<PathBuf>,
    },
    /// Connect to a remote DevTools WebSocket endpoint.
    Connect {
        /// WebSocket URL of the remote browser service.
        endpoint: String,
        /// Bearer token appended as a query parameter, if the service
        /// requires one.
        token: Option<String>,
    },
}

/// Main configuration for the scrape service
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Address the HTTP server binds to.
    pub listen_addr: SocketAddr,
    /// Browser acquisition strategy.
    pub browser: BrowserStrategy,
    /// Run the launched browser headless. Remote sessions ignore this.
    pub headless: bool,
    /// Timeout for establishing a browser session (launch or connect).
    pub connect_timeout: Duration,
    /// Timeout for the whole short-link resolution request.
    pub resolve_timeout: Duration,
    /// Per-attempt navigation timeout, covering goto plus the settle wait.
    pub navigation_timeout: Duration,
    /// Total navigation attempts per job (first try included).
    pub max_nav_attempts: u32,
    /// Fixed delay between navigation attempts.
    pub nav_retry_delay: Duration,
    /// Criterion deciding when a page has loaded enough to harvest.
    pub settle: SettleCondition,
    /// Grace window after the DOM harvest during which late asynchronous
    /// responses are still collected. Responses after it are lost.
    pub grace_window: Duration,
    /// Substring matched against response URLs to spot the note/detail API.
    pub note_api_fragment: String,
    /// Concurrent scrape jobs admitted by the scheduler.
    pub concurrency: usize,
    /// Time-to-live of cached results.
    pub cache_ttl: Duration,
    /// Maximum number of cached results held at once.
    pub cache_capacity: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            browser: BrowserStrategy::Launch { executable: None },
            headless: true,
            connect_timeout: Duration::from_secs(10),
            resolve_timeout: Duration::from_secs(5),
            navigation_timeout: Duration::from_secs(15),
            max_nav_attempts: 3,
            nav_retry_delay: Duration::from_secs(1),
            settle: SettleCondition::DomContentLoaded,
            grace_window: Duration::from_millis(3000),
            note_api_fragment: NOTE_API_FRAGMENT.to_string(),
            concurrency: 1,
            cache_ttl: Duration::from_secs(3600),
            cache_capacity: 256,
        }
    }
}

impl ScrapeConfig {
    /// Build configuration from the process environment.
    ///
    /// Unset variables keep their defaults; malformed values are errors
    /// rather than silent fallbacks.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = env_parse::<SocketAddr>("XHSCRAPE_LISTEN_ADDR")? {
            config.listen_addr = addr;
        }

        config.browser = browser_strategy_from_env();

        if let Some(headless) = env_parse::<bool>("XHSCRAPE_HEADLESS")? {
            config.headless = headless;
        }
        if let Some(secs) = env_parse::<u64>("XHSCRAPE_CONNECT_TIMEOUT_SECS")? {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("XHSCRAPE_RESOLVE_TIMEOUT_SECS")? {
            config.resolve_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("XHSCRAPE_NAV_TIMEOUT_SECS")? {
            config.navigation_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = env_parse::<u32>("XHSCRAPE_NAV_ATTEMPTS")? {
            config.max_nav_attempts = attempts.max(1);
        }
        if let Some(ms) = env_parse::<u64>("XHSCRAPE_NAV_RETRY_DELAY_MS")? {
            config.nav_retry_delay = Duration::from_millis(ms);
        }
        if let Ok(raw) = std::env::var("XHSCRAPE_SETTLE") {
            config.settle = SettleCondition::parse(&raw)
                .ok_or_else(|| anyhow!("invalid XHSCRAPE_SETTLE={raw}: expected 'domcontentloaded' or 'networkidle'"))?;
        }
        if let Some(ms) = env_parse::<u64>("XHSCRAPE_GRACE_WINDOW_MS")? {
            config.grace_window = Duration::from_millis(ms);
        }
        if let Some(n) = env_parse::<usize>("XHSCRAPE_CONCURRENCY")? {
            if n != 1 {
                // Above 1 each job still gets its own session; memory use
                // scales with it.
                warn!(concurrency = n, "running with non-default scrape concurrency");
            }
            config.concurrency = n.max(1);
        }
        if let Some(secs) = env_parse::<u64>("XHSCRAPE_CACHE_TTL_SECS")? {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(n) = env_parse::<usize>("XHSCRAPE_CACHE_CAPACITY")? {
            config.cache_capacity = n.max(1);
        }

        Ok(config)
    }
}

/// Pick the browser strategy from the environment.
///
/// `BROWSER_WS_ENDPOINT` (plus optional `BROWSER_WS_TOKEN`) selects the
/// remote connect strategy; otherwise a local launch using `CHROMIUM_PATH`
/// when set.
fn browser_strategy_from_env() -> BrowserStrategy {
    if let Ok(endpoint) = std::env::var("BROWSER_WS_ENDPOINT") {
        let endpoint = endpoint.trim().to_string();
        if !endpoint.is_empty() {
            let token = std::env::var("BROWSER_WS_TOKEN")
                .ok()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty());
            return BrowserStrategy::Connect { endpoint, token };
        }
    }
    let executable = std::env::var("CHROMIUM_PATH")
        .ok()
        .map(PathBuf::from)
        .filter(|p| {
            if p.exists() {
                true
            } else {
                warn!(path = %p.display(), "CHROMIUM_PATH points to a non-existent file, ignoring");
                false
            }
        });
    BrowserStrategy::Launch { executable }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("invalid {key}={raw}: {e}"))
            .context("environment configuration"),
        Err(_) => Ok(None),
    }
}
