//! Error types for the scrape pipeline
//!
//! One boundary enum covering every failure the pipeline can surface to the
//! HTTP layer. Components use `anyhow` internally for context and convert at
//! their public seams.

use thiserror::Error;

/// Result type alias for scrape operations
pub type ScrapeResult<T> = Result<T, ScrapeError>;

/// Failure kinds surfaced by the scrape pipeline
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Short-link fetch failed: request error, timeout, or redirect cap hit
    #[error("short link resolution failed: {0}")]
    Resolution(String),

    /// Resolved URL landed outside the expected article host
    #[error("resolved URL outside expected host: {0}")]
    InvalidHost(String),

    /// Browser launch or remote connect failed
    #[error("browser session unavailable: {0}")]
    Session(String),

    /// Page load failed after exhausting the retry budget
    #[error("navigation failed after {attempts} attempts: {message}")]
    Navigation { attempts: u32, message: String },

    /// Any other failure while a browser session is held
    #[error("scrape failed: {0}")]
    Scrape(String),

    /// Job cancelled via its cancellation token
    #[error("scrape job cancelled")]
    Cancelled,
}

impl From<anyhow::Error> for ScrapeError {
    fn from(error: anyhow::Error) -> Self {
        ScrapeError::Scrape(format!("{error:#}"))
    }
}

impl ScrapeError {
    /// Check if the failure is transient and a fresh request may succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ScrapeError::Resolution(_) | ScrapeError::Navigation { .. } | ScrapeError::Session(_)
        )
    }

    /// HTTP status this failure maps to at the service boundary.
    ///
    /// An out-of-domain resolved URL is a caller problem (bad link), the
    /// rest are internal failures.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            ScrapeError::InvalidHost(_) => 400,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_host_maps_to_bad_request() {
        let err = ScrapeError::InvalidHost("https://example.com".into());
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn pipeline_failures_map_to_internal_error() {
        assert_eq!(ScrapeError::Resolution("timeout".into()).http_status(), 500);
        assert_eq!(ScrapeError::Session("no chrome".into()).http_status(), 500);
        assert_eq!(
            ScrapeError::Navigation {
                attempts: 3,
                message: "net::ERR_TIMED_OUT".into()
            }
            .http_status(),
            500
        );
        assert_eq!(ScrapeError::Cancelled.http_status(), 500);
    }

    #[test]
    fn navigation_and_resolution_are_transient() {
        assert!(ScrapeError::Resolution("blip".into()).is_transient());
        assert!(!ScrapeError::InvalidHost("x".into()).is_transient());
        assert!(!ScrapeError::Cancelled.is_transient());
    }
}
