//! Configuration defaults and environment parsing.

use std::time::Duration;

use xhscrape::config::{BrowserStrategy, ScrapeConfig};
use xhscrape::navigation::SettleCondition;

#[test]
fn defaults_match_the_documented_budgets() {
    let config = ScrapeConfig::default();

    assert_eq!(config.resolve_timeout, Duration::from_secs(5));
    assert_eq!(config.connect_timeout, Duration::from_secs(10));
    assert_eq!(config.navigation_timeout, Duration::from_secs(15));
    assert_eq!(config.max_nav_attempts, 3);
    assert_eq!(config.nav_retry_delay, Duration::from_secs(1));
    assert_eq!(config.settle, SettleCondition::DomContentLoaded);
    assert_eq!(config.grace_window, Duration::from_millis(3000));
    assert_eq!(config.concurrency, 1);
    assert_eq!(config.cache_ttl, Duration::from_secs(3600));
    assert!(config.headless);
    assert!(config.note_api_fragment.contains("api"));
}

#[test]
fn default_strategy_launches_a_local_browser() {
    let config = ScrapeConfig::default();
    assert!(matches!(
        config.browser,
        BrowserStrategy::Launch { .. }
    ));
}

#[test]
fn from_env_without_overrides_yields_defaults() {
    // The test environment does not define XHSCRAPE_* variables, so this
    // exercises the default path of every parser.
    let config = ScrapeConfig::from_env().expect("clean env should parse");
    assert_eq!(config.concurrency, 1);
    assert_eq!(config.max_nav_attempts, 3);
    assert_eq!(config.cache_ttl, Duration::from_secs(3600));
}
