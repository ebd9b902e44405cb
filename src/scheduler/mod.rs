//! Single-flight scrape scheduler
//!
//! A bounded-concurrency gate in front of the browser pipeline. The default
//! permit count of 1 serializes every scrape through one browser session at
//! a time; waiting jobs queue FIFO (tokio's semaphore is fair). The
//! scheduler holds no browser state, it only gates calls into the session
//! manager.
//!
//! Constructed once at process start and injected into the request handler.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::debug;

use crate::error::{ScrapeError, ScrapeResult};

pub struct ScrapeScheduler {
    permits: Arc<Semaphore>,
    concurrency: usize,
}

impl ScrapeScheduler {
    /// Create a scheduler admitting at most `concurrency` jobs at once.
    /// Zero is clamped to one.
    #[must_use]
    pub fn new(concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            permits: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        }
    }

    /// Configured concurrency ceiling.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Permits currently free (for monitoring and tests).
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Admit a job once a concurrency slot frees up, run it to completion
    /// and release the slot on every path.
    pub async fn run<F, Fut, T>(&self, job: F) -> ScrapeResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ScrapeResult<T>>,
    {
        let _permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ScrapeError::Scrape("scheduler shut down".to_string()))?;

        debug!(available = self.permits.available_permits(), "scrape job admitted");
        job().await
    }
}
