//! URL host checks for the short-link and canonical article domains.

use url::Url;

use super::constants::{CANONICAL_HOST, SHORT_LINK_HOST};

/// True when `raw` parses as a URL whose host is `expected` or a subdomain
/// of it (`www.xiaohongshu.com` counts for `xiaohongshu.com`).
pub fn host_matches(raw: &str, expected: &str) -> bool {
    let Ok(parsed) = Url::parse(raw) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    host == expected || host.ends_with(&format!(".{expected}"))
}

/// True when the input contains the short-link host fragment.
///
/// Inbound validation is a substring check, matching the upstream contract
/// for opaque short links that may arrive with tracking clutter around them.
pub fn contains_short_link_fragment(raw: &str) -> bool {
    raw.contains(SHORT_LINK_HOST)
}

/// True when `raw` is hosted on the short-link domain.
pub fn is_short_link_url(raw: &str) -> bool {
    host_matches(raw, SHORT_LINK_HOST)
}

/// True when `raw` is hosted on the canonical article domain.
pub fn is_canonical_url(raw: &str) -> bool {
    host_matches(raw, CANONICAL_HOST)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_host_accepts_subdomains() {
        assert!(is_canonical_url("https://www.xiaohongshu.com/explore/xyz"));
        assert!(is_canonical_url("https://xiaohongshu.com/explore/xyz"));
        assert!(is_canonical_url("HTTPS://WWW.XIAOHONGSHU.COM/explore/xyz"));
    }

    #[test]
    fn canonical_host_rejects_lookalikes() {
        assert!(!is_canonical_url("https://notxiaohongshu.com/explore/xyz"));
        assert!(!is_canonical_url("https://xiaohongshu.com.evil.net/explore"));
        assert!(!is_canonical_url("https://example.com/xiaohongshu.com"));
        assert!(!is_canonical_url("not a url"));
    }

    #[test]
    fn short_link_fragment_is_substring_match() {
        assert!(contains_short_link_fragment("https://xhslink.com/abc123"));
        assert!(contains_short_link_fragment("see https://xhslink.com/a"));
        assert!(!contains_short_link_fragment("https://example.com/not-short"));
    }

    #[test]
    fn short_link_host_check_is_strict() {
        assert!(is_short_link_url("https://xhslink.com/abc123"));
        assert!(!is_short_link_url("https://example.com/?u=xhslink.com"));
    }
}
