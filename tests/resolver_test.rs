//! Tests for short-link resolution against mock HTTP servers.

use mockito::Server;
use xhscrape::config::ScrapeConfig;
use xhscrape::error::ScrapeError;
use xhscrape::resolver::LinkResolver;

fn resolver() -> LinkResolver {
    LinkResolver::new(&ScrapeConfig::default()).expect("resolver should build")
}

#[tokio::test]
async fn follows_redirects_to_the_final_url() {
    let mut server = Server::new_async().await;
    let base = server.url();

    let target = server
        .mock("GET", "/explore/xyz")
        .with_status(200)
        .with_body("article")
        .create_async()
        .await;
    let hop2 = server
        .mock("GET", "/hop")
        .with_status(302)
        .with_header("Location", &format!("{base}/explore/xyz"))
        .create_async()
        .await;
    let hop1 = server
        .mock("GET", "/abc123")
        .with_status(302)
        .with_header("Location", &format!("{base}/hop"))
        .create_async()
        .await;

    let resolved = resolver()
        .resolve(&format!("{base}/abc123"))
        .await
        .expect("resolution should succeed");

    assert_eq!(resolved.short_url, format!("{base}/abc123"));
    assert_eq!(resolved.canonical_url, format!("{base}/explore/xyz"));

    hop1.assert_async().await;
    hop2.assert_async().await;
    target.assert_async().await;
}

#[tokio::test]
async fn resolution_is_idempotent() {
    let mut server = Server::new_async().await;
    let base = server.url();

    server
        .mock("GET", "/final")
        .with_status(200)
        .expect(2)
        .create_async()
        .await;
    server
        .mock("GET", "/short")
        .with_status(301)
        .with_header("Location", &format!("{base}/final"))
        .expect(2)
        .create_async()
        .await;

    let resolver = resolver();
    let first = resolver.resolve(&format!("{base}/short")).await.unwrap();
    let second = resolver.resolve(&format!("{base}/short")).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn exceeding_the_redirect_cap_fails_resolution() {
    let mut server = Server::new_async().await;
    let base = server.url();

    // Chain of 7 redirects; the cap of 5 hops is exceeded before /r6.
    for i in 0..7 {
        server
            .mock("GET", format!("/r{i}").as_str())
            .with_status(302)
            .with_header("Location", &format!("{base}/r{}", i + 1))
            .create_async()
            .await;
    }

    let err = resolver()
        .resolve(&format!("{base}/r0"))
        .await
        .expect_err("redirect cap should fail resolution");

    assert!(matches!(err, ScrapeError::Resolution(_)), "got {err:?}");
}

#[tokio::test]
async fn connection_errors_surface_as_resolution_failures() {
    // Discard port; nothing listens there.
    let err = resolver()
        .resolve("http://127.0.0.1:9/abc")
        .await
        .expect_err("dead endpoint should fail");

    assert!(matches!(err, ScrapeError::Resolution(_)), "got {err:?}");
}
