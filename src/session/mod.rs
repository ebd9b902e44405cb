//! Browser session management
//!
//! Acquires a browser automation session via one of two strategies: launch
//! a local headless Chromium with sandboxing disabled (containers), or
//! connect to a remote DevTools service over WebSocket with a bearer token.
//! Guarantees the session, its pages and its event-handler task are torn
//! down on every exit path.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use chromiumoxide::Handler;
use chromiumoxide::browser::{Browser, BrowserConfig, HeadlessMode};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{BrowserStrategy, ScrapeConfig};
use crate::error::{ScrapeError, ScrapeResult};

/// Chrome flags for constrained/containerized environments. Sandboxing is
/// off for compatibility; memory-hungry subsystems are disabled.
const LAUNCH_ARGS: &[&str] = &[
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--no-zygote",
    "--single-process",
    "--disable-extensions",
    "--disable-background-networking",
    "--mute-audio",
    "--hide-scrollbars",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionKind {
    /// Locally launched child process; reaped on close.
    Local,
    /// Remote DevTools connection; closing drops the socket.
    Remote,
}

/// Exclusively-owned handle to one browser connection and the pages opened
/// within it.
///
/// `close()` must run on every exit path, success, failure or timeout
/// alike. `Drop` aborts the event-handler task so a skipped close cannot
/// leave it spinning.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    kind: SessionKind,
}

impl BrowserSession {
    fn new(browser: Browser, handler: JoinHandle<()>, kind: SessionKind) -> Self {
        Self {
            browser,
            handler,
            kind,
        }
    }

    /// Open a fresh blank page in this session.
    pub async fn new_page(&self) -> ScrapeResult<Page> {
        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::Session(format!("failed to open page: {e}")))
    }

    /// Tear the session down: close the browser (and with it every page and
    /// listener), reap the child process where one exists, stop the event
    /// handler.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "browser close failed");
        }
        if self.kind == SessionKind::Local {
            let _ = self.browser.wait().await;
        }
        self.handler.abort();
        debug!("browser session closed");
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Acquires browser sessions using the configured strategy.
pub struct SessionManager {
    strategy: BrowserStrategy,
    headless: bool,
    connect_timeout: Duration,
}

impl SessionManager {
    #[must_use]
    pub fn new(config: &ScrapeConfig) -> Self {
        Self {
            strategy: config.browser.clone(),
            headless: config.headless,
            connect_timeout: config.connect_timeout,
        }
    }

    /// Acquire a session, bounded by the configured establishment timeout.
    pub async fn acquire(&self) -> ScrapeResult<BrowserSession> {
        let acquisition = async {
            match &self.strategy {
                BrowserStrategy::Launch { executable } => {
                    launch_session(executable.as_deref(), self.headless).await
                }
                BrowserStrategy::Connect { endpoint, token } => {
                    connect_session(endpoint, token.as_deref()).await
                }
            }
        };
        tokio::time::timeout(self.connect_timeout, acquisition)
            .await
            .map_err(|_| {
                ScrapeError::Session(format!(
                    "session establishment timed out after {:?}",
                    self.connect_timeout
                ))
            })?
    }
}

async fn launch_session(
    executable: Option<&Path>,
    headless: bool,
) -> ScrapeResult<BrowserSession> {
    let chrome_path = match executable {
        Some(path) => path.to_path_buf(),
        None => find_browser_executable()?,
    };

    let mut builder = BrowserConfig::builder()
        .chrome_executable(chrome_path)
        .no_sandbox()
        .args(LAUNCH_ARGS.to_vec());
    if headless {
        builder = builder.headless_mode(HeadlessMode::default());
    } else {
        builder = builder.with_head();
    }
    let browser_config = builder
        .build()
        .map_err(|e| ScrapeError::Session(format!("failed to build browser config: {e}")))?;

    let (browser, handler) = Browser::launch(browser_config)
        .await
        .map_err(|e| ScrapeError::Session(format!("failed to launch browser: {e}")))?;

    info!("launched local browser session");
    Ok(BrowserSession::new(
        browser,
        spawn_handler(handler),
        SessionKind::Local,
    ))
}

async fn connect_session(endpoint: &str, token: Option<&str>) -> ScrapeResult<BrowserSession> {
    let ws_url = match token {
        Some(token) if !token.is_empty() => {
            if endpoint.contains('?') {
                format!("{endpoint}&token={token}")
            } else {
                format!("{endpoint}?token={token}")
            }
        }
        _ => endpoint.to_string(),
    };

    let (browser, handler) = Browser::connect(ws_url)
        .await
        .map_err(|e| ScrapeError::Session(format!("failed to connect to {endpoint}: {e}")))?;

    info!(%endpoint, "connected to remote browser session");
    Ok(BrowserSession::new(
        browser,
        spawn_handler(handler),
        SessionKind::Remote,
    ))
}

/// Drive the CDP event loop until the connection closes. The returned
/// handle is aborted on session close.
fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!(error = %e, "browser handler event error");
            }
        }
        debug!("browser event handler finished");
    })
}

/// Find a Chrome/Chromium executable: `CHROMIUM_PATH` overrides everything,
/// then well-known install locations, then `which`.
pub fn find_browser_executable() -> ScrapeResult<PathBuf> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!(path = %path.display(), "using browser from CHROMIUM_PATH");
            return Ok(path);
        }
        warn!(path = %path.display(), "CHROMIUM_PATH points to non-existent file");
    }

    let candidates = [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/opt/google/chrome/chrome",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];
    for candidate in candidates {
        let path = Path::new(candidate);
        if path.exists() {
            info!(path = %path.display(), "found browser executable");
            return Ok(path.to_path_buf());
        }
    }

    for cmd in ["chromium", "chromium-browser", "google-chrome", "chrome"] {
        if let Ok(output) = Command::new("which").arg(cmd).output()
            && output.status.success()
        {
            let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !found.is_empty() {
                info!(path = %found, "found browser via 'which'");
                return Ok(PathBuf::from(found));
            }
        }
    }

    Err(ScrapeError::Session(
        "no Chrome/Chromium executable found; set CHROMIUM_PATH".to_string(),
    ))
}
