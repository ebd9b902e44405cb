//! Fixed upstream constants
//!
//! The short-link host, canonical article host and note/detail API fragment
//! are hard upstream facts, not configuration: changing them means the
//! platform changed and the scraper needs re-validation anyway.

/// Host serving opaque short links (`https://xhslink.com/abc123`).
pub const SHORT_LINK_HOST: &str = "xhslink.com";

/// Canonical article host a resolved link must land on.
pub const CANONICAL_HOST: &str = "xiaohongshu.com";

/// Substring identifying the note/detail API on intercepted response URLs.
///
/// A loose substring match, not a schema contract. Brittle to upstream
/// renames by accepted trade-off.
pub const NOTE_API_FRAGMENT: &str = "/api/sns/web";

/// Redirect hop cap for short-link resolution.
pub const MAX_REDIRECT_HOPS: usize = 5;

/// Mobile user agent presented while resolving short links. The short-link
/// endpoint serves app-style redirects to mobile clients.
pub const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Mobile/15E148 Safari/604.1";

/// Referrer presented while resolving short links.
pub const RESOLVER_REFERER: &str = "https://www.xiaohongshu.com/";

/// Desktop user agents rotated per scrape page.
pub const PAGE_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0 Safari/605.1.15",
];

/// Prefix for result-cache keys.
pub const CACHE_KEY_PREFIX: &str = "xhs:";
