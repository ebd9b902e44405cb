//! HTTP endpoint tests for request validation, cache hits and the success
//! wire shape. Paths requiring a live browser are covered by unit tests on
//! the pipeline pieces instead.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::util::ServiceExt;

use xhscrape::cache::ResultCache;
use xhscrape::collector::MediaBundle;
use xhscrape::config::ScrapeConfig;
use xhscrape::server::{self, AppState};

fn test_state() -> AppState {
    AppState::new(ScrapeConfig::default()).expect("state should build")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

#[tokio::test]
async fn missing_url_parameter_is_rejected() {
    let app = server::router(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/parse_xiaohongshu")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body.get("error").is_some());
}

#[tokio::test]
async fn urls_without_the_short_link_fragment_are_rejected() {
    let app = server::router(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/parse_xiaohongshu?url=https://example.com/not-short")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body.get("error").is_some());
}

#[tokio::test]
async fn cached_results_are_served_without_scraping() {
    let state = test_state();

    let cached = json!({
        "status": "success",
        "data": {
            "resolvedUrl": "https://www.xiaohongshu.com/explore/xyz",
            "media": { "images": ["https://img.example/a.jpg"], "videos": [] }
        }
    });
    let key = ResultCache::cache_key("https://xhslink.com/abc123");
    state.cache.insert(key, cached.clone()).await;

    let app = server::router(state);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/parse_xiaohongshu?url=https://xhslink.com/abc123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, cached);
}

#[test]
fn success_body_matches_the_wire_shape() {
    let media = MediaBundle {
        images: vec!["https://img.example/a.jpg".to_string()],
        videos: Vec::new(),
    };
    let body = server::success_body("https://www.xiaohongshu.com/explore/xyz", &media);

    assert_eq!(
        body,
        json!({
            "status": "success",
            "data": {
                "resolvedUrl": "https://www.xiaohongshu.com/explore/xyz",
                "media": { "images": ["https://img.example/a.jpg"], "videos": [] }
            }
        })
    );
}
